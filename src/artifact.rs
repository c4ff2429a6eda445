//! The archive abstraction the core depends on (spec §1, §6).
//!
//! The concrete archive format (zip/jar-like byte layout) is explicitly out
//! of scope; the core only needs random-access byte ranges keyed by entry
//! name, plus a filesystem-visible name used for version-fallback parsing
//! and diagnostics.

use std::collections::HashMap;
use std::fmt;

/// The embedded metadata document entry name (spec §4.B).
pub const METADATA_ENTRY: &str = "META-INF/module.xml";

/// The optional peer properties file used to resolve `${name}` templates.
pub const METADATA_PROPERTIES_ENTRY: &str = "META-INF/module.properties";

/// The optional top-level manifest entry, which may carry an entry-point
/// class name.
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// The manifest key naming the entry-point class, if present.
pub const MANIFEST_ENTRY_POINT_KEY: &str = "Entry-Point-Class";

/// An archive bundling code, metadata, and resources, identified on disk by
/// filename (spec GLOSSARY). Implementations provide random-access byte
/// ranges keyed by entry name; the core never parses the container format
/// itself.
pub trait Artifact: Send + Sync {
    /// The artifact's filename, e.g. `"foo-1.2.jar"`.
    fn file_name(&self) -> &str;

    /// Read one entry's raw bytes, or `None` if the entry does not exist.
    fn read_entry(&self, entry: &str) -> std::io::Result<Option<Vec<u8>>>;

    /// List all entry names under `prefix`, used for code/resource lookup.
    fn entries_under(&self, prefix: &str) -> Vec<String>;
}

/// Whether an artifact is a plain archive or a web archive (spec §3, §4.B):
/// determines the resource prefix used by [`crate::metadata::ModuleMeta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Plain,
    Web,
}

impl ArtifactKind {
    /// Recognized filename extensions distinguish plain vs. web artifacts.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".war") {
            Some(ArtifactKind::Web)
        } else if name.ends_with(".jar") || name.ends_with(".zip") {
            Some(ArtifactKind::Plain)
        } else {
            None
        }
    }

    /// The resource prefix inside the artifact (spec §3 ModuleMeta).
    pub fn resource_prefix(self) -> &'static str {
        match self {
            ArtifactKind::Plain => "",
            ArtifactKind::Web => "WEB-INF/classes/",
        }
    }
}

/// Parse a manifest entry's bytes into a flat key-value map (simple
/// `Key: Value` lines, one per line, blank lines ignored).
pub fn parse_manifest(bytes: &[u8]) -> HashMap<String, String> {
    let text = String::from_utf8_lossy(bytes);
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((k, v)) = line.split_once(':') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}

/// A resource locator of the form `archive-scheme:<path>!<entry>` (spec
/// §4.E "Resource lookup").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator(String);

impl Locator {
    pub fn new(archive_path: &str, entry: &str) -> Self {
        Locator(format!("archive-scheme:{archive_path}!{entry}"))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
