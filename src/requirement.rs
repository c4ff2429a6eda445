//! Requirement strings and version ranges (spec §3, §4.A, §6).
//!
//! Grammar: `GROUP? ":" ARTIFACT (":" VERSION_SPEC)?` — one, two, or three
//! colon-separated fields. `VERSION_SPEC` is either a bare version (inclusive
//! minimum) or a bracketed range `[MIN,MAX]` / `(MIN,MAX)` / mixes thereof.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;
use crate::version::Version;

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-A-Za-z0-9._]+$").unwrap())
}

/// One endpoint of a [`VersionRange::Bounded`] requirement.
#[derive(Debug, Clone)]
pub enum Bound {
    Unbounded,
    Inclusive(Version),
    Exclusive(Version),
}

/// A parsed version-range requirement (spec §3 Requirement.range).
#[derive(Debug, Clone)]
pub enum VersionRange {
    /// Absent: matches all versions.
    Any,
    /// Bare `v`: `[v, ∞)`.
    AtLeast(Version),
    /// Bracketed `[a,b]` / `(a,b)` / mixes, either side optionally open.
    Bounded { min: Bound, max: Bound },
}

impl VersionRange {
    /// Score a candidate version against this range: `None` if out of
    /// range, `Some(1)` for an exact inclusive-minimum hit, `Some(2)` for
    /// any other in-range match (spec §3/§4.A).
    pub fn score(&self, candidate: &Version) -> Option<u8> {
        match self {
            VersionRange::Any => Some(2),
            VersionRange::AtLeast(min) => {
                if candidate < min {
                    None
                } else if candidate == min {
                    Some(1)
                } else {
                    Some(2)
                }
            }
            VersionRange::Bounded { min, max } => {
                let min_ok = match min {
                    Bound::Unbounded => true,
                    Bound::Inclusive(m) => candidate >= m,
                    Bound::Exclusive(m) => candidate > m,
                };
                let max_ok = match max {
                    Bound::Unbounded => true,
                    Bound::Inclusive(m) => candidate <= m,
                    Bound::Exclusive(m) => candidate < m,
                };
                if !min_ok || !max_ok {
                    return None;
                }
                if let Bound::Inclusive(m) = min {
                    if candidate == m {
                        return Some(1);
                    }
                }
                Some(2)
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Any => write!(f, "*"),
            VersionRange::AtLeast(v) => write!(f, "{v}"),
            VersionRange::Bounded { min, max } => {
                let (lo_ch, lo) = match min {
                    Bound::Unbounded => ('[', String::new()),
                    Bound::Inclusive(v) => ('[', v.to_string()),
                    Bound::Exclusive(v) => ('(', v.to_string()),
                };
                let (hi_ch, hi) = match max {
                    Bound::Unbounded => (']', String::new()),
                    Bound::Inclusive(v) => (']', v.to_string()),
                    Bound::Exclusive(v) => (')', v.to_string()),
                };
                write!(f, "{lo_ch}{lo},{hi}{hi_ch}")
            }
        }
    }
}

/// Parse a version-range spec: brackets denote an explicit range, anything
/// else is treated as an inclusive minimum with an unbounded maximum.
pub fn parse_version_range(s: &str) -> Result<VersionRange, Error> {
    let s = s.trim();
    let first = s.chars().next();
    if matches!(first, Some('[') | Some('(')) {
        let last = s.chars().last();
        if !matches!(last, Some(']') | Some(')')) {
            return Err(Error::BadRequirementSyntax {
                input: s.to_string(),
                pos: s.len().saturating_sub(1),
                message: "range missing closing bracket".into(),
            });
        }
        let inclusive_min = first == Some('[');
        let inclusive_max = last == Some(']');
        let inner = &s[1..s.len() - 1];
        let mut parts = inner.splitn(2, ',');
        let min_s = parts.next().unwrap_or("").trim();
        let max_s = match parts.next() {
            Some(m) => m.trim(),
            None => {
                return Err(Error::BadRequirementSyntax {
                    input: s.to_string(),
                    pos: 0,
                    message: "range requires a comma separating min and max".into(),
                });
            }
        };
        let min = if min_s.is_empty() {
            Bound::Unbounded
        } else if inclusive_min {
            Bound::Inclusive(Version::parse(min_s))
        } else {
            Bound::Exclusive(Version::parse(min_s))
        };
        let max = if max_s.is_empty() {
            Bound::Unbounded
        } else if inclusive_max {
            Bound::Inclusive(Version::parse(max_s))
        } else {
            Bound::Exclusive(Version::parse(max_s))
        };
        Ok(VersionRange::Bounded { min, max })
    } else {
        Ok(VersionRange::AtLeast(Version::parse(s)))
    }
}

/// A (possibly group-qualified, possibly version-ranged) predicate
/// identifying acceptable `ModuleMeta`s (spec §3 Requirement).
#[derive(Debug, Clone)]
pub struct Requirement {
    pub group: Option<String>,
    pub artifact: String,
    pub range: Option<VersionRange>,
    pub optional: bool,
}

impl Requirement {
    /// Score a candidate `(group, artifact, version)` triple: `0` if the
    /// group or artifact don't match, otherwise the range score.
    pub fn matches(&self, group: &str, artifact: &str, version: &Version) -> u8 {
        if let Some(want) = &self.group {
            if want != group {
                return 0;
            }
        }
        if self.artifact != artifact {
            return 0;
        }
        match &self.range {
            None => 2,
            Some(range) => range.score(version).unwrap_or(0),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group.as_deref().unwrap_or(""), self.artifact)?;
        if let Some(range) = &self.range {
            write!(f, ":{range}")?;
        }
        Ok(())
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), Error> {
    if !name_pattern().is_match(value) {
        return Err(Error::BadRequirementSyntax {
            input: value.to_string(),
            pos: 0,
            message: format!("{field} must match [-A-Za-z0-9._]+"),
        });
    }
    Ok(())
}

/// Parse a requirement string per the grammar in spec §6.
pub fn parse_requirement(s: &str) -> Result<Requirement, Error> {
    let parts: Vec<&str> = s.splitn(4, ':').collect();
    if parts.len() > 3 {
        return Err(Error::BadRequirementSyntax {
            input: s.to_string(),
            pos: 0,
            message: "too many colon-separated fields (max 3)".into(),
        });
    }

    let (group_s, artifact_s, version_s): (Option<&str>, &str, Option<&str>) = match parts[..] {
        [artifact] => (None, artifact, None),
        [group, artifact] => (Some(group), artifact, None),
        [group, artifact, version] => (Some(group), artifact, Some(version)),
        _ => unreachable!("length already bounded to <= 3"),
    };

    let group = match group_s {
        None | Some("") => None,
        Some(g) => {
            validate_name("group", g)?;
            Some(g.to_string())
        }
    };

    if artifact_s.is_empty() {
        return Err(Error::BadRequirementSyntax {
            input: s.to_string(),
            pos: 0,
            message: "artifact must not be empty".into(),
        });
    }
    validate_name("artifact", artifact_s)?;

    let range = match version_s {
        None => None,
        Some("") => {
            return Err(Error::BadRequirementSyntax {
                input: s.to_string(),
                pos: 0,
                message: "version field must not be explicitly empty".into(),
            });
        }
        Some(v) => Some(parse_version_range(v)?),
    };

    Ok(Requirement {
        group,
        artifact: artifact_s.to_string(),
        range,
        optional: false,
    })
}
