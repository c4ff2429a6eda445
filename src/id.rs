//! Module identity (spec §3 ModuleId).

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::Error;
use crate::requirement;
use crate::version::Version;

/// `(group, artifact, version)` triple identifying one concrete module.
///
/// `group` and `artifact` match `[-A-Za-z0-9._]+`; `version` is a free-form
/// string parsed lazily (spec §3).
#[derive(Debug, Clone)]
pub struct ModuleId {
    pub group: String,
    pub artifact: String,
    pub version: Version,
}

impl ModuleId {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, Error> {
        let group = group.into();
        let artifact = artifact.into();
        let req = format!("{group}:{artifact}");
        requirement::parse_requirement(&req)?;
        Ok(ModuleId {
            group,
            artifact,
            version: Version::parse(version.into()),
        })
    }
}

impl PartialEq for ModuleId {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.artifact == other.artifact
            && self.version == other.version
    }
}

impl Eq for ModuleId {}

impl Hash for ModuleId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.artifact.hash(state);
        self.version.as_str().hash(state);
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_component_wise() {
        let a = ModuleId::new("g", "a", "1.0").unwrap();
        let b = ModuleId::new("g", "a", "1.0").unwrap();
        let c = ModuleId::new("g", "a", "1.1").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_invalid_group() {
        assert!(ModuleId::new("g/", "a", "1.0").is_err());
    }
}
