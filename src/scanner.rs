//! Artifact discovery (spec §4.C).
//!
//! Directory mode walks configured directories (no symlink traversal);
//! classpath mode enumerates a well-known meta-directory via a system
//! lookup handle. Either way, each opened artifact is handed to
//! [`crate::metadata::parse_metadata`]; per-artifact failures are logged and
//! skipped so scanning continues.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;
use walkdir::WalkDir;

use crate::artifact::{Artifact, ArtifactKind};
use crate::error::Error;
use crate::metadata::{DescriptorExtractor, ModuleMeta, parse_metadata};

/// Recognized archive extensions (spec §4.C "opening regular files with a
/// recognized archive extension").
fn has_archive_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| ArtifactKind::from_file_name(n).is_some())
}

/// Open `path` as an `Artifact`. A host provides the concrete opener (the
/// archive byte format is out of scope, spec §1); the scanner only needs to
/// know how to go from a path to a trait object.
pub trait ArtifactOpener: Send + Sync {
    fn open(&self, path: &Path) -> std::io::Result<Arc<dyn Artifact>>;
}

/// Directory-mode scan: non-existent directories are silently skipped
/// (spec §4.C); a path that exists and is not a directory is fatal.
pub fn scan_directories(
    dirs: &[PathBuf],
    opener: &dyn ArtifactOpener,
    extractor: &dyn DescriptorExtractor,
) -> Result<Vec<ModuleMeta>, Error> {
    let mut metas = Vec::new();
    for dir in dirs {
        match fs::metadata(dir) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(Error::ArtifactUnreadable {
                    name: dir.display().to_string(),
                    cause: Box::new(e),
                });
            }
            Ok(m) if !m.is_dir() => {
                return Err(Error::ArtifactUnreadable {
                    name: dir.display().to_string(),
                    cause: Box::new(std::io::Error::other("configured module path is not a directory")),
                });
            }
            Ok(_) => {}
        }

        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "error walking module directory, skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_archive_extension(entry.path()) {
                continue;
            }
            scan_one(entry.path(), opener, extractor, &mut metas);
        }
    }
    Ok(metas)
}

fn scan_one(
    path: &Path,
    opener: &dyn ArtifactOpener,
    extractor: &dyn DescriptorExtractor,
    out: &mut Vec<ModuleMeta>,
) {
    let artifact = match opener.open(path) {
        Ok(a) => a,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable artifact, skipping");
            return;
        }
    };
    match parse_metadata(artifact, extractor) {
        Ok(Some(meta)) => out.push(meta),
        Ok(None) => {}
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed metadata, skipping");
        }
    }
}

/// The well-known meta-directory enumerated in classpath mode (spec §4.C).
pub const CLASSPATH_META_DIR: &str = "META-INF/modules/";

/// A single classpath resource: either a jar-scheme entry (contributes its
/// enclosing archive) or a directory-scheme entry (contributes the
/// directory itself).
pub enum ClasspathResource {
    Jar(PathBuf),
    Directory(PathBuf),
}

/// A system lookup handle able to enumerate resources at a given name
/// (spec §4.C "Classpath mode").
pub trait SystemLookup: Send + Sync {
    fn resources(&self, name: &str) -> Vec<ClasspathResource>;
}

/// Classpath-mode scan: enumerate `CLASSPATH_META_DIR` via `system`, then
/// open each contributing archive/directory the same way directory mode
/// does.
pub fn scan_classpath(
    system: &dyn SystemLookup,
    opener: &dyn ArtifactOpener,
    extractor: &dyn DescriptorExtractor,
) -> Vec<ModuleMeta> {
    let mut metas = Vec::new();
    for resource in system.resources(CLASSPATH_META_DIR) {
        let path = match resource {
            ClasspathResource::Jar(p) => p,
            ClasspathResource::Directory(p) => p,
        };
        if has_archive_extension(&path) {
            scan_one(&path, opener, extractor, &mut metas);
        }
    }
    metas
}

/// Platform default search paths (spec §6): on non-Windows systems, a
/// system library directory plus the user's local artifact cache; on
/// Windows, the user's local artifact cache only.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    #[cfg(not(target_os = "windows"))]
    {
        paths.push(PathBuf::from("/usr/lib/infra/modules"));
    }
    if let Some(cache) = dirs::data_local_dir() {
        paths.push(cache.join("infra").join("modules"));
    }
    paths
}
