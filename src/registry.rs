//! Metadata index, candidate queries, and transitive resolution (spec §4.D).
//!
//! Grounded on the teacher's `registry.rs` (an indexed, lock-guarded
//! `Registry` singleton) and `storage.rs`'s lock-guarded find/add shape,
//! generalized from a single `OnceLock<Package>` to the full
//! `metas`/`resolved`/`forward`/`reverse`/`settings` maps behind one resolve
//! mutex (spec §5). Modules live in an arena (`Vec<Arc<Module>>`); `forward`
//! and `reverse` hold arena indices rather than owned references, so a
//! cyclic dependency graph never needs a true reference cycle (spec §9).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::warn;

use crate::error::Error;
use crate::id::ModuleId;
use crate::lookup::{LookupContext, SystemContext};
use crate::metadata::ModuleMeta;
use crate::module::Module;
use crate::requirement::Requirement;

type Listener = Box<dyn Fn(&ModuleId) + Send + Sync>;

struct RegistryState {
    /// `metas[artifact][group]`, each list sorted newest-version-first
    /// (spec §3 "Registry state").
    metas: HashMap<String, HashMap<String, Vec<Arc<ModuleMeta>>>>,
    resolved: HashMap<ModuleId, usize>,
    arena: Vec<Arc<Module>>,
    forward: Vec<Vec<Option<usize>>>,
    reverse: Vec<Vec<usize>>,
    lookup_contexts: Vec<OnceLock<Arc<LookupContext>>>,
    /// Keyed by the canonical `Display` of the owning `Requirement`, since
    /// `Requirement` carries no identity of its own beyond its rendering.
    settings: HashMap<String, HashMap<String, String>>,
}

impl RegistryState {
    fn new() -> Self {
        RegistryState {
            metas: HashMap::new(),
            resolved: HashMap::new(),
            arena: Vec::new(),
            forward: Vec::new(),
            reverse: Vec::new(),
            lookup_contexts: Vec::new(),
            settings: HashMap::new(),
        }
    }
}

/// The registry lock serializes mutation of `metas`/`resolved`/`forward`/
/// `reverse` (spec §5); the listener set is guarded by a separate lock, per
/// the same section.
pub struct Registry {
    state: Mutex<RegistryState>,
    listeners: Mutex<Vec<Listener>>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Registry {
            state: Mutex::new(RegistryState::new()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Insert a freshly-parsed `ModuleMeta`, keeping `metas[artifact][group]`
    /// sorted newest-first. A duplicate version is dropped with a warning,
    /// keeping the first-seen entry (spec §4.D "Indexing", invariant 1).
    pub fn index(&self, meta: ModuleMeta) {
        let id = meta.id.clone();
        let mut state = self.state.lock().unwrap();
        let list = state
            .metas
            .entry(id.artifact.clone())
            .or_default()
            .entry(id.group.clone())
            .or_default();
        if list.iter().any(|m| m.id.version == id.version) {
            warn!(module = %id, "duplicate module version, keeping first-seen");
            return;
        }
        let pos = list.partition_point(|m| m.id.version > id.version);
        list.insert(pos, Arc::new(meta));
        drop(state);
        self.notify(&id);
    }

    /// Candidates for `req`, scored and ordered per spec §3/§4.D: exact hits
    /// (score 1) before in-range matches (score 2), newest-first within each
    /// class.
    pub fn candidates(&self, req: &Requirement) -> Vec<Arc<ModuleMeta>> {
        let state = self.state.lock().unwrap();
        score_candidates(&state.metas, req)
    }

    /// Fails with `NotUnique` unless exactly one candidate matches `req`.
    pub fn single_candidate(&self, req: &Requirement) -> Result<Arc<ModuleMeta>, Error> {
        let mut candidates = self.candidates(req);
        match candidates.len() {
            1 => Ok(candidates.pop().unwrap()),
            0 => Err(Error::NoCandidate {
                requirement: req.to_string(),
            }),
            count => Err(Error::NotUnique {
                requirement: req.to_string(),
                count,
            }),
        }
    }

    /// All known artifact identifiers, or those matching `pattern` as a
    /// regular expression (spec §4.D "Naming").
    pub fn name_set(&self, pattern: Option<&str>) -> Result<Vec<String>, Error> {
        let state = self.state.lock().unwrap();
        let names: Vec<&String> = state.metas.keys().collect();
        match pattern {
            None => Ok(names.into_iter().cloned().collect()),
            Some(p) => {
                let re = regex::Regex::new(p).map_err(|e| Error::BadRequirementSyntax {
                    input: p.to_string(),
                    pos: 0,
                    message: e.to_string(),
                })?;
                Ok(names.into_iter().filter(|n| re.is_match(n)).cloned().collect())
            }
        }
    }

    /// Resolve `meta` to a `Module`, memoized by `ModuleId` (spec §4.D
    /// "Resolution"). When `recursive`, each declared requirement is
    /// resolved transitively in declaration order before this call returns;
    /// the registry lock is held for the whole operation, so nested
    /// resolution within the same call tree never re-acquires it.
    pub fn resolve(&self, meta: Arc<ModuleMeta>, recursive: bool) -> Result<Arc<Module>, Error> {
        let mut state = self.state.lock().unwrap();
        let idx = self.resolve_locked(&mut state, meta, recursive)?;
        Ok(state.arena[idx].clone())
    }

    fn resolve_locked(
        &self,
        state: &mut RegistryState,
        meta: Arc<ModuleMeta>,
        recursive: bool,
    ) -> Result<usize, Error> {
        if let Some(&idx) = state.resolved.get(&meta.id) {
            return Ok(idx);
        }

        // Placeholder inserted before recursing: a cycle A -> B -> A closes
        // on this entry instead of looping (spec §9 Design Notes).
        let idx = state.arena.len();
        let slots = meta.requirements.len();
        state.arena.push(Arc::new(Module::new(meta.clone(), idx)));
        state.resolved.insert(meta.id.clone(), idx);
        state.forward.push(vec![None; slots]);
        state.reverse.push(Vec::new());
        state.lookup_contexts.push(OnceLock::new());

        if recursive {
            for (slot, req) in meta.requirements.iter().enumerate() {
                let mut resolved_dep = None;
                let mut last_err = None;
                for candidate in score_candidates(&state.metas, req) {
                    match self.resolve_locked(state, candidate, true) {
                        Ok(dep_idx) => {
                            resolved_dep = Some(dep_idx);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                match resolved_dep {
                    Some(dep_idx) => {
                        state.forward[idx][slot] = Some(dep_idx);
                        if !state.reverse[dep_idx].contains(&idx) {
                            state.reverse[dep_idx].push(idx);
                        }
                    }
                    None if req.optional => {}
                    None => {
                        return Err(Error::UnresolvableDependency {
                            module: meta.id.clone(),
                            requirement: req.to_string(),
                            cause: last_err.map(Box::new),
                        });
                    }
                }
            }
        }

        Ok(idx)
    }

    pub fn module_at(&self, idx: usize) -> Arc<Module> {
        self.state.lock().unwrap().arena[idx].clone()
    }

    pub fn forward_of(&self, idx: usize) -> Vec<Option<usize>> {
        self.state.lock().unwrap().forward[idx].clone()
    }

    pub fn reverse_of(&self, idx: usize) -> Vec<usize> {
        self.state.lock().unwrap().reverse[idx].clone()
    }

    /// Lazily allocate (or return) the lookup context for module `idx`
    /// (spec §3 "Module instance": "lookup context, allocated lazily on
    /// first code lookup").
    pub fn lookup_context_for(
        self: &Arc<Self>,
        idx: usize,
        system: &Arc<dyn SystemContext>,
        allow_list: &[String],
    ) -> Arc<LookupContext> {
        let meta = self.module_at(idx).meta.clone();
        let state = self.state.lock().unwrap();
        let cell = &state.lookup_contexts[idx];
        cell.get_or_init(|| {
            Arc::new(LookupContext::new(
                self.clone(),
                idx,
                meta,
                system.clone(),
                allow_list.to_vec(),
            ))
        })
        .clone()
    }

    /// User-supplied settings for the module(s) matching `req`'s canonical
    /// rendering (spec §3 "settings", §6 "REQ!NAME" config keys).
    pub fn set_setting(&self, req: &Requirement, key: impl Into<String>, value: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state
            .settings
            .entry(req.to_string())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn settings_for(&self, req: &Requirement) -> HashMap<String, String> {
        self.state
            .lock()
            .unwrap()
            .settings
            .get(&req.to_string())
            .cloned()
            .unwrap_or_default()
    }

    pub fn add_listener(&self, listener: Listener) {
        self.listeners.lock().unwrap().push(listener);
    }

    fn notify(&self, id: &ModuleId) {
        for listener in self.listeners.lock().unwrap().iter() {
            listener(id);
        }
    }
}

fn score_candidates(
    metas: &HashMap<String, HashMap<String, Vec<Arc<ModuleMeta>>>>,
    req: &Requirement,
) -> Vec<Arc<ModuleMeta>> {
    let Some(group_map) = metas.get(&req.artifact) else {
        return Vec::new();
    };
    let pool: Vec<&Arc<ModuleMeta>> = match &req.group {
        Some(g) => group_map.get(g).into_iter().flatten().collect(),
        None => group_map.values().flatten().collect(),
    };
    let mut scored: Vec<(u8, &Arc<ModuleMeta>)> = pool
        .into_iter()
        .filter_map(|m| {
            let score = req.matches(&m.id.group, &m.id.artifact, &m.id.version);
            (score != 0).then_some((score, m))
        })
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.id.version.cmp(&a.1.id.version)));
    scored.into_iter().map(|(_, m)| m.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;

    struct EmptyArtifact;
    impl Artifact for EmptyArtifact {
        fn file_name(&self) -> &str {
            "empty"
        }
        fn read_entry(&self, _entry: &str) -> std::io::Result<Option<Vec<u8>>> {
            Ok(None)
        }
        fn entries_under(&self, _prefix: &str) -> Vec<String> {
            vec![]
        }
    }

    fn meta(group: &str, artifact: &str, version: &str, reqs: Vec<Requirement>) -> ModuleMeta {
        ModuleMeta {
            id: ModuleId::new(group, artifact, version).unwrap(),
            artifact: Arc::new(EmptyArtifact),
            requirements: reqs,
            lifecycle_class: None,
            entry_point_class: None,
            resource_prefix: "",
        }
    }

    fn req(s: &str) -> Requirement {
        crate::requirement::parse_requirement(s).unwrap()
    }

    fn dep_req(artifact: &str, optional: bool) -> Requirement {
        Requirement {
            group: Some("g".into()),
            artifact: artifact.into(),
            range: None,
            optional,
        }
    }

    #[test]
    fn exact_version_candidate_scores_one() {
        let reg = Registry::new();
        reg.index(meta("g", "a", "1.0", vec![]));
        reg.index(meta("g", "a", "1.2", vec![]));
        reg.index(meta("g", "a", "2.0", vec![]));
        let found = reg.candidates(&req("g:a:1.2"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.version.as_str(), "1.2");
    }

    #[test]
    fn range_candidates_are_newest_first() {
        let reg = Registry::new();
        reg.index(meta("g", "a", "1.0", vec![]));
        reg.index(meta("g", "a", "1.2", vec![]));
        reg.index(meta("g", "a", "2.0", vec![]));
        let found = reg.candidates(&req("g:a:[1.0,2.0)"));
        let versions: Vec<&str> = found.iter().map(|m| m.id.version.as_str()).collect();
        assert_eq!(versions, vec!["1.2", "1.0"]);
    }

    #[test]
    fn duplicate_version_is_dropped() {
        let reg = Registry::new();
        reg.index(meta("g", "a", "1.0", vec![]));
        reg.index(meta("g", "a", "1.0", vec![]));
        assert_eq!(reg.candidates(&req("g:a")).len(), 1);
    }

    #[test]
    fn resolving_twice_returns_the_same_instance() {
        let reg = Registry::new();
        let first = reg.resolve(Arc::new(meta("g", "a", "1.0", vec![])), false).unwrap();
        let second = reg.resolve(Arc::new(meta("g", "a", "1.0", vec![])), false).unwrap();
        assert_eq!(first.idx, second.idx);
    }

    #[test]
    fn optional_missing_dependency_resolves_to_none_slot() {
        let reg = Registry::new();
        let root = Arc::new(meta("g", "root", "1.0", vec![dep_req("missing", true)]));
        let resolved = reg.resolve(root, true).unwrap();
        assert_eq!(reg.forward_of(resolved.idx), vec![None]);
    }

    #[test]
    fn non_optional_missing_dependency_is_fatal() {
        let reg = Registry::new();
        let root = Arc::new(meta("g", "root", "1.0", vec![dep_req("missing", false)]));
        assert!(reg.resolve(root, true).is_err());
    }

    #[test]
    fn cyclic_dependency_resolves_without_overflow() {
        let reg = Registry::new();
        reg.index(meta("g", "a", "1.0", vec![dep_req("b", false)]));
        reg.index(meta("g", "b", "1.0", vec![dep_req("a", false)]));
        let a = Arc::new(meta("g", "a", "1.0", vec![dep_req("b", false)]));
        let resolved_a = reg.resolve(a, true).unwrap();
        assert_eq!(reg.forward_of(resolved_a.idx).len(), 1);
        let b_idx = reg.forward_of(resolved_a.idx)[0].unwrap();
        assert_eq!(reg.forward_of(b_idx)[0], Some(resolved_a.idx));
        assert!(reg.reverse_of(resolved_a.idx).contains(&b_idx));
        assert!(reg.reverse_of(b_idx).contains(&resolved_a.idx));
    }
}
