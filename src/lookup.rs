//! Isolated per-module code/resource lookup (spec §4.E).
//!
//! No direct teacher analog — the teacher has no classloading concept.
//! Grounded on the general delegation-with-negative-cache pattern common to
//! the pack's resolver modules (a `Mutex`/`RwLock`-guarded cache in front of
//! a recursive lookup), adapted here to code/resource name lookup instead of
//! version-range queries.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::artifact::{Artifact, Locator};
use crate::metadata::ModuleMeta;
use crate::registry::Registry;

/// One resolved code unit: raw bytes keyed by the entry name they came from.
/// The core treats this opaquely; a host interprets the bytes.
#[derive(Clone)]
pub struct Code {
    pub entry: String,
    pub bytes: Arc<[u8]>,
}

/// The ambient platform/system context that allow-listed names always
/// resolve through, never via the module graph (spec §4.E "Allow-list
/// delegation").
pub trait SystemContext: Send + Sync {
    fn load_code(&self, name: &str) -> Option<Code>;
    fn find_resource(&self, name: &str) -> Option<Locator>;
}

fn name_to_entry(prefix: &str, name: &str) -> String {
    format!("{prefix}{}.class", name.replace('.', "/"))
}

/// A module's isolated lookup scope: local artifact first, then declared
/// dependencies in order, with allow-listed names always deferred to the
/// system context (spec §4.E).
pub struct LookupContext {
    registry: Arc<Registry>,
    idx: usize,
    meta: Arc<ModuleMeta>,
    system: Arc<dyn SystemContext>,
    allow_list: Vec<String>,
    /// Names confirmed unresolvable; short-circuits repeat queries.
    negative: Mutex<HashSet<String>>,
    /// Names currently being resolved on this context, used to stop a cycle
    /// `A -> B -> A` from recursing forever before `negative` is populated
    /// (spec §4.E "Cycle safety").
    in_progress: Mutex<HashSet<String>>,
    /// Ensures a code unit is defined at most once under a given name
    /// (spec §4.E "Concurrency").
    defined: Mutex<std::collections::HashMap<String, Code>>,
}

impl LookupContext {
    pub fn new(
        registry: Arc<Registry>,
        idx: usize,
        meta: Arc<ModuleMeta>,
        system: Arc<dyn SystemContext>,
        allow_list: Vec<String>,
    ) -> Self {
        LookupContext {
            registry,
            idx,
            meta,
            system,
            allow_list,
            negative: Mutex::new(HashSet::new()),
            in_progress: Mutex::new(HashSet::new()),
            defined: Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn allow_listed(&self, name: &str) -> bool {
        self.allow_list.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Load a code unit by name. `resolve` mirrors the host's usual
    /// eager/deferred-binding distinction; dependency delegation always
    /// recurses with `resolve = false` (spec §4.E "Dependency delegation").
    pub fn load_code(&self, name: &str, resolve: bool) -> Option<Code> {
        if self.allow_listed(name) {
            return self.system.load_code(name);
        }
        if self.negative.lock().unwrap().contains(name) {
            return None;
        }
        {
            let mut in_progress = self.in_progress.lock().unwrap();
            if !in_progress.insert(name.to_string()) {
                // already being resolved further up this context's call
                // stack: treat as a miss rather than recurse forever.
                return None;
            }
        }

        let found = self.load_local(name).or_else(|| self.load_from_dependencies(name, resolve));

        self.in_progress.lock().unwrap().remove(name);
        if found.is_none() {
            self.negative.lock().unwrap().insert(name.to_string());
        }
        found
    }

    fn load_local(&self, name: &str) -> Option<Code> {
        let entry = name_to_entry(self.meta.resource_prefix, name);
        {
            let defined = self.defined.lock().unwrap();
            if let Some(code) = defined.get(&entry) {
                return Some(code.clone());
            }
        }
        let bytes = self.meta.artifact.read_entry(&entry).ok().flatten()?;
        let code = Code {
            entry: entry.clone(),
            bytes: Arc::from(bytes),
        };
        self.defined.lock().unwrap().insert(entry, code.clone());
        Some(code)
    }

    fn load_from_dependencies(&self, name: &str, resolve: bool) -> Option<Code> {
        for dep_idx in self.registry.forward_of(self.idx).into_iter().flatten() {
            let dep_ctx = self.registry.lookup_context_for(dep_idx, &self.system, &self.allow_list);
            if let Some(code) = dep_ctx.load_code(name, false) {
                return Some(code);
            }
        }
        let _ = resolve;
        None
    }

    /// Resource lookup mirrors `load_code`'s delegation order but returns a
    /// locator rather than bytes (spec §4.E "Resource lookup").
    pub fn find_resource(&self, name: &str) -> Option<Locator> {
        if self.allow_listed(name) {
            return self.system.find_resource(name);
        }
        let entry = format!("{}{name}", self.meta.resource_prefix);
        if self.meta.artifact.read_entry(&entry).ok().flatten().is_some() {
            return Some(Locator::new(self.meta.artifact.file_name(), &entry));
        }
        for dep_idx in self.registry.forward_of(self.idx).into_iter().flatten() {
            let dep_ctx = self.registry.lookup_context_for(dep_idx, &self.system, &self.allow_list);
            if let Some(locator) = dep_ctx.find_resource(name) {
                return Some(locator);
            }
        }
        None
    }

    /// All matching resource locators: local hit first, then every
    /// dependency's own enumeration (spec §4.E "find_resources").
    pub fn find_resources(&self, name: &str) -> Vec<Locator> {
        let mut out = Vec::new();
        let entry = format!("{}{name}", self.meta.resource_prefix);
        if self.meta.artifact.read_entry(&entry).ok().flatten().is_some() {
            out.push(Locator::new(self.meta.artifact.file_name(), &entry));
        }
        for dep_idx in self.registry.forward_of(self.idx).into_iter().flatten() {
            let dep_ctx = self.registry.lookup_context_for(dep_idx, &self.system, &self.allow_list);
            out.extend(dep_ctx.find_resources(name));
        }
        out
    }

    /// The lookup contexts of this module's direct, resolved dependencies,
    /// in declaration order; `None` marks an unsatisfied optional dependency
    /// (spec §4.E "dependency_contexts").
    pub fn dependency_contexts(&self) -> Vec<Option<Arc<LookupContext>>> {
        self.registry
            .forward_of(self.idx)
            .into_iter()
            .map(|slot| slot.map(|dep_idx| self.registry.lookup_context_for(dep_idx, &self.system, &self.allow_list)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ModuleId;
    use std::collections::HashMap;

    struct MapArtifact {
        name: String,
        entries: HashMap<String, Vec<u8>>,
    }
    impl Artifact for MapArtifact {
        fn file_name(&self) -> &str {
            &self.name
        }
        fn read_entry(&self, entry: &str) -> std::io::Result<Option<Vec<u8>>> {
            Ok(self.entries.get(entry).cloned())
        }
        fn entries_under(&self, prefix: &str) -> Vec<String> {
            self.entries.keys().filter(|k| k.starts_with(prefix)).cloned().collect()
        }
    }

    struct NoSystem;
    impl SystemContext for NoSystem {
        fn load_code(&self, name: &str) -> Option<Code> {
            Some(Code {
                entry: name.to_string(),
                bytes: Arc::from(b"system-provided".to_vec()),
            })
        }
        fn find_resource(&self, _name: &str) -> Option<Locator> {
            None
        }
    }

    fn meta_with(name: &str, entries: HashMap<String, Vec<u8>>, reqs: Vec<crate::requirement::Requirement>) -> Arc<ModuleMeta> {
        Arc::new(ModuleMeta {
            id: ModuleId::new("g", name, "1.0").unwrap(),
            artifact: Arc::new(MapArtifact {
                name: format!("{name}-1.0.jar"),
                entries,
            }),
            requirements: reqs,
            lifecycle_class: None,
            entry_point_class: None,
            resource_prefix: "",
        })
    }

    #[test]
    fn allow_listed_name_always_goes_to_system() {
        let registry = Registry::new();
        let meta = meta_with("a", HashMap::new(), vec![]);
        let module = registry.resolve(meta, false).unwrap();
        let system: Arc<dyn SystemContext> = Arc::new(NoSystem);
        let ctx = registry.lookup_context_for(module.idx, &system, &["plat.".to_string()]);
        let code = ctx.load_code("plat.X", false).unwrap();
        assert_eq!(code.entry, "plat.X");
    }

    #[test]
    fn local_artifact_is_checked_before_dependencies() {
        let registry = Registry::new();
        let mut entries = HashMap::new();
        entries.insert("com/example/Foo.class".to_string(), b"local".to_vec());
        let meta = meta_with("a", entries, vec![]);
        let module = registry.resolve(meta, false).unwrap();
        let system: Arc<dyn SystemContext> = Arc::new(NoSystem);
        let ctx = registry.lookup_context_for(module.idx, &system, &[]);
        let code = ctx.load_code("com.example.Foo", false).unwrap();
        assert_eq!(code.bytes.as_ref(), b"local");
    }

    #[test]
    fn unresolvable_name_is_negative_cached() {
        let registry = Registry::new();
        let meta = meta_with("a", HashMap::new(), vec![]);
        let module = registry.resolve(meta, false).unwrap();
        let system: Arc<dyn SystemContext> = Arc::new(NoSystem);
        let ctx = registry.lookup_context_for(module.idx, &system, &[]);
        assert!(ctx.load_code("com.example.Missing", false).is_none());
        assert!(ctx.negative.lock().unwrap().contains("com.example.Missing"));
        assert!(ctx.load_code("com.example.Missing", false).is_none());
    }
}
