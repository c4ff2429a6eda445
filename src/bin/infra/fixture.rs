//! A directory-of-entries demo `Artifact` + `DescriptorExtractor`.
//!
//! The real archive byte format and the real metadata XML grammar are both
//! out of scope for the core (spec §1); this is the host's own stand-in for
//! both, just structured enough to drive the resolver end to end. A
//! directory on disk plays the role of one artifact; its entries are plain
//! files underneath it, and the descriptor is `key=value` text rather than
//! XML.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use infra::artifact::{Artifact, METADATA_ENTRY};
use infra::error::Error;
use infra::metadata::{DescriptorExtractor, RawDependency, RawDescriptor};

pub struct DirArtifact {
    root: PathBuf,
    file_name: String,
}

impl DirArtifact {
    pub fn open(root: PathBuf) -> Arc<dyn Artifact> {
        let file_name = root
            .file_name()
            .map(|n| format!("{}.jar", n.to_string_lossy()))
            .unwrap_or_else(|| "unknown.jar".to_string());
        Arc::new(DirArtifact { root, file_name })
    }
}

impl Artifact for DirArtifact {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn read_entry(&self, entry: &str) -> std::io::Result<Option<Vec<u8>>> {
        match fs::read(self.root.join(entry)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn entries_under(&self, prefix: &str) -> Vec<String> {
        let Ok(read) = fs::read_dir(self.root.join(prefix)) else {
            return vec![];
        };
        read.filter_map(|e| e.ok())
            .filter_map(|e| e.path().file_name().map(|n| format!("{prefix}{}", n.to_string_lossy())))
            .collect()
    }
}

/// Parses the demo descriptor format: `key=value` lines, with
/// `dependency.N.<field>` keys building an ordered dependency list.
pub struct PropertiesExtractor;

impl DescriptorExtractor for PropertiesExtractor {
    fn extract(&self, artifact: &dyn Artifact) -> Result<Option<RawDescriptor>, Error> {
        let bytes = artifact
            .read_entry(METADATA_ENTRY)
            .map_err(|e| Error::ArtifactUnreadable {
                name: artifact.file_name().to_string(),
                cause: Box::new(e),
            })?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(&bytes);
        let mut descriptor = RawDescriptor::default();
        let mut deps: BTreeMap<u32, RawDependency> = BTreeMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim().to_string());
            match key {
                "group" => descriptor.group = Some(value),
                "artifact" => descriptor.artifact = Some(value),
                "version" => descriptor.version = Some(value),
                "lifecycle_class" => descriptor.lifecycle_class = Some(value),
                "property" => {
                    if let Some((k, v)) = value.split_once('=') {
                        descriptor.inline_properties.insert(k.to_string(), v.to_string());
                    }
                }
                _ if key.starts_with("dependency.") => {
                    let rest = &key["dependency.".len()..];
                    let Some((idx_s, field)) = rest.split_once('.') else {
                        continue;
                    };
                    let Ok(idx) = idx_s.parse::<u32>() else {
                        continue;
                    };
                    let dep = deps.entry(idx).or_insert_with(|| RawDependency {
                        group: None,
                        artifact: String::new(),
                        version: None,
                        scope: None,
                        optional: false,
                    });
                    match field {
                        "group" => dep.group = Some(value),
                        "artifact" => dep.artifact = value,
                        "version" => dep.version = Some(value),
                        "scope" => dep.scope = Some(value),
                        "optional" => dep.optional = value == "true",
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        descriptor.dependencies = deps.into_values().collect();
        Ok(Some(descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_group_artifact_version_and_dependency() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("META-INF")).unwrap();
        fs::write(
            dir.path().join(METADATA_ENTRY),
            "group=g\nartifact=widget\nversion=1.0\n\
             dependency.0.group=g\ndependency.0.artifact=base\ndependency.0.optional=false\n",
        )
        .unwrap();
        let artifact = DirArtifact::open(dir.path().to_path_buf());
        let raw = PropertiesExtractor.extract(artifact.as_ref()).unwrap().unwrap();
        assert_eq!(raw.group.as_deref(), Some("g"));
        assert_eq!(raw.dependencies.len(), 1);
        assert_eq!(raw.dependencies[0].artifact, "base");
    }

    #[test]
    fn missing_descriptor_entry_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = DirArtifact::open(dir.path().to_path_buf());
        assert!(PropertiesExtractor.extract(artifact.as_ref()).unwrap().is_none());
    }
}
