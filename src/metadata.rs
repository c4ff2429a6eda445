//! Metadata extraction and semantic processing (spec §4.B).
//!
//! Parsing the embedded XML descriptor itself is out of scope (spec §1); a
//! [`DescriptorExtractor`] is the seam a host plugs a real XML reader into
//! (e.g. `quick-xml`, `serde-xml-rs`). This module owns everything spec §4.B
//! calls "the hard part": `${name}` template substitution, parent-stanza
//! inheritance, dependency scope filtering, version fallback, and the
//! core-infrastructure / secondary-artifact exclusion filters.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use std::sync::OnceLock;

use crate::artifact::{
    Artifact, ArtifactKind, MANIFEST_ENTRY, MANIFEST_ENTRY_POINT_KEY, parse_manifest,
};
use crate::error::Error;
use crate::id::ModuleId;
use crate::requirement::{Requirement, parse_version_range};
use crate::version::Version;

/// Packages the runtime itself provides; artifacts identifying one of these
/// are excluded from indexing (spec §4.B "Filters").
pub const CORE_INFRASTRUCTURE: &[(&str, &str)] = &[("infra", "infra-runtime"), ("infra", "infra-core")];

/// One `<parent>` stanza inherited by a descriptor.
#[derive(Debug, Clone, Default)]
pub struct RawParent {
    pub group: Option<String>,
    pub artifact: Option<String>,
    pub version: Option<String>,
    pub properties: HashMap<String, String>,
}

/// One `<dependency>` entry as read from the descriptor, before scope
/// filtering or `Requirement` validation.
#[derive(Debug, Clone)]
pub struct RawDependency {
    pub group: Option<String>,
    pub artifact: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
}

/// The structured shape a descriptor parser hands to [`parse_metadata`].
#[derive(Debug, Clone, Default)]
pub struct RawDescriptor {
    pub group: Option<String>,
    pub artifact: Option<String>,
    pub version: Option<String>,
    pub parent: Option<RawParent>,
    pub inline_properties: HashMap<String, String>,
    pub properties_file: HashMap<String, String>,
    pub dependencies: Vec<RawDependency>,
    pub lifecycle_class: Option<String>,
}

/// Reads the embedded metadata document (and optional properties side-file)
/// out of an artifact and produces a [`RawDescriptor`]. The XML grammar
/// itself is out of scope; implementations delegate to a real parser.
pub trait DescriptorExtractor: Send + Sync {
    fn extract(&self, artifact: &dyn Artifact) -> Result<Option<RawDescriptor>, Error>;
}

/// Immutable descriptor extracted from one artifact (spec §3 ModuleMeta).
pub struct ModuleMeta {
    pub id: ModuleId,
    pub artifact: Arc<dyn Artifact>,
    pub requirements: Vec<Requirement>,
    pub lifecycle_class: Option<String>,
    pub entry_point_class: Option<String>,
    pub resource_prefix: &'static str,
}

impl std::fmt::Debug for ModuleMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleMeta")
            .field("id", &self.id)
            .field("requirements", &self.requirements.len())
            .field("lifecycle_class", &self.lifecycle_class)
            .field("entry_point_class", &self.entry_point_class)
            .finish()
    }
}

fn substitute(template: &str, properties: &HashMap<String, String>) -> String {
    fn placeholder_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap())
    }
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            properties.get(name).cloned().unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn is_resolved(s: &str) -> bool {
    !s.contains("${")
}

/// Single greedy match of `"<artifact>-" VERSION ".<ext>"` (spec §4.B
/// "Fallbacks", §9 Design Notes).
fn version_from_file_name(file_name: &str, artifact: &str) -> Option<String> {
    let stem = file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(file_name);
    let prefix = format!("{artifact}-");
    stem.strip_prefix(&prefix).map(str::to_string)
}

/// `true` if `file_name` matches `"<artifact>-<version>.<ext>"` where
/// `<version>` equals the module's resolved `version` — a primary artifact.
/// Anything else (a different suffix, e.g. `-sources`/`-javadoc`) is a
/// secondary artifact (spec §4.B "Filters").
fn is_primary_artifact(file_name: &str, artifact: &str, version: &str) -> bool {
    version_from_file_name(file_name, artifact).is_some_and(|v| v == version)
}

/// Extract, substitute, and validate a `ModuleMeta` from `artifact`.
/// Returns `Ok(None)` when the artifact carries no metadata document, is a
/// core-infrastructure package, or is a secondary artifact — all silent,
/// non-fatal exclusions. Returns `Err` for a malformed descriptor; the
/// caller (the scanner) is responsible for logging and skipping per spec
/// §4.B's failure mode.
pub fn parse_metadata(
    artifact: Arc<dyn Artifact>,
    extractor: &dyn DescriptorExtractor,
) -> Result<Option<ModuleMeta>, Error> {
    let Some(raw) = extractor.extract(artifact.as_ref())? else {
        return Ok(None);
    };

    let mut properties = raw.properties_file.clone();
    if let Some(parent) = &raw.parent {
        properties.extend(parent.properties.clone());
    }
    properties.extend(raw.inline_properties.clone());

    let group = raw.group.as_deref().map(|g| substitute(g, &properties));
    let artifact_name = raw.artifact.as_deref().map(|a| substitute(a, &properties));
    let mut version = raw.version.as_deref().map(|v| substitute(v, &properties));

    if version.as_deref().is_none_or(|v| !is_resolved(v)) {
        if let Some(parent) = &raw.parent {
            if let Some(pv) = &parent.version {
                version = Some(substitute(pv, &properties));
            }
        }
    }

    let group = group.ok_or_else(|| malformed("missing group"))?;
    let artifact_name = artifact_name.ok_or_else(|| malformed("missing artifact"))?;

    if !is_resolved(&group) || !is_resolved(&artifact_name) {
        return Err(malformed("unresolved ${} template in group/artifact"));
    }

    let version = match version {
        Some(v) if is_resolved(&v) => v,
        _ => version_from_file_name(artifact.file_name(), &artifact_name)
            .ok_or_else(|| malformed("version unresolved and not recoverable from filename"))?,
    };

    if CORE_INFRASTRUCTURE.contains(&(group.as_str(), artifact_name.as_str())) {
        return Ok(None);
    }
    if !is_primary_artifact(artifact.file_name(), &artifact_name, &version) {
        return Ok(None);
    }

    let id = ModuleId::new(group, artifact_name, version)?;

    let mut requirements = Vec::with_capacity(raw.dependencies.len());
    for dep in &raw.dependencies {
        if matches!(dep.scope.as_deref(), Some("test") | Some("provided")) {
            continue;
        }
        match build_requirement(dep) {
            Ok(req) => requirements.push(req),
            Err(e) if dep.optional => {
                tracing::warn!(dependency = %dep.artifact, error = %e, "dropping unresolvable optional dependency");
            }
            Err(e) => return Err(e),
        }
    }

    let kind = ArtifactKind::from_file_name(artifact.file_name());
    let resource_prefix = kind.map(ArtifactKind::resource_prefix).unwrap_or("");

    let entry_point_class = artifact
        .read_entry(MANIFEST_ENTRY)
        .map_err(|e| Error::ArtifactUnreadable {
            name: artifact.file_name().to_string(),
            cause: Box::new(e),
        })?
        .map(|bytes| parse_manifest(&bytes))
        .and_then(|map| map.get(MANIFEST_ENTRY_POINT_KEY).cloned());

    Ok(Some(ModuleMeta {
        id,
        artifact,
        requirements,
        lifecycle_class: raw.lifecycle_class.clone(),
        entry_point_class,
        resource_prefix,
    }))
}

fn build_requirement(dep: &RawDependency) -> Result<Requirement, Error> {
    let range = match &dep.version {
        None => None,
        Some(v) => Some(parse_version_range(v)?),
    };
    // validates the artifact/group grammar via the same rules as a
    // colon-joined requirement string would
    let probe = format!("{}:{}", dep.group.as_deref().unwrap_or(""), dep.artifact);
    crate::requirement::parse_requirement(&probe)?;
    Ok(Requirement {
        group: dep.group.clone(),
        artifact: dep.artifact.clone(),
        range,
        optional: dep.optional,
    })
}

fn malformed(msg: &str) -> Error {
    Error::ArtifactUnreadable {
        name: "<metadata>".into(),
        cause: Box::new(std::io::Error::other(msg.to_string())),
    }
}

/// Version-independent helper used by tests to compare/sort by version.
pub fn version_of(meta: &ModuleMeta) -> &Version {
    &meta.id.version
}
