//! RPM-style segmented version parsing and comparison (spec §3, §4.A).
//!
//! A version is a dot-separated sequence of segments; each segment is a
//! sequence of alternating digit/letter runs. `"1.2rc3.4"` tokenizes to
//! `[[1], [2, "rc", 3], [4]]`. Comparison is segment-wise, then token-wise
//! within a segment, with a missing segment or token treated as `"0"`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Digits(String),
    Letters(String),
}

type Segment = Vec<Token>;

/// A lazily-tokenized, freely-formed version string.
///
/// Parsing never fails (spec §4.A: "comparison never fails"); malformed or
/// unusual inputs simply tokenize into whatever runs they contain.
pub struct Version {
    raw: String,
    segments: OnceLock<Vec<Segment>>,
}

impl Version {
    pub fn parse(s: impl Into<String>) -> Self {
        Version {
            raw: s.into(),
            segments: OnceLock::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn segments(&self) -> &Vec<Segment> {
        self.segments.get_or_init(|| tokenize(&self.raw))
    }
}

impl Clone for Version {
    fn clone(&self) -> Self {
        Version::parse(self.raw.clone())
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({:?})", self.raw)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_segment_lists(self.segments(), other.segments())
    }
}

fn zero_segment() -> Segment {
    vec![Token::Digits("0".into())]
}

fn compare_segment_lists(a: &[Segment], b: &[Segment]) -> Ordering {
    let len = a.len().max(b.len());
    let zero = zero_segment();
    for i in 0..len {
        let sa = a.get(i).unwrap_or(&zero);
        let sb = b.get(i).unwrap_or(&zero);
        match compare_segment(sa, sb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn compare_segment(a: &[Token], b: &[Token]) -> Ordering {
    let len = a.len().max(b.len());
    let zero = Token::Digits("0".into());
    for i in 0..len {
        let ta = a.get(i).unwrap_or(&zero);
        let tb = b.get(i).unwrap_or(&zero);
        match compare_token(ta, tb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn compare_token(a: &Token, b: &Token) -> Ordering {
    match (a, b) {
        (Token::Digits(x), Token::Digits(y)) => compare_digit_runs(x, y),
        (Token::Letters(x), Token::Letters(y)) => x.cmp(y),
        // digit runs always rank higher than letter runs (spec §3)
        (Token::Digits(_), Token::Letters(_)) => Ordering::Greater,
        (Token::Letters(_), Token::Digits(_)) => Ordering::Less,
    }
}

fn compare_digit_runs(x: &str, y: &str) -> Ordering {
    let xt = trim_leading_zeros(x);
    let yt = trim_leading_zeros(y);
    match xt.len().cmp(&yt.len()) {
        Ordering::Equal => xt.cmp(yt),
        other => other,
    }
}

fn trim_leading_zeros(s: &str) -> &str {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() { "0" } else { trimmed }
}

fn tokenize(raw: &str) -> Vec<Segment> {
    raw.split('.').map(tokenize_segment).collect()
}

fn tokenize_segment(part: &str) -> Segment {
    if part.is_empty() {
        return zero_segment();
    }
    let mut segment = Vec::new();
    let mut chars = part.chars().peekable();
    while let Some(&c) = chars.peek() {
        let is_digit = c.is_ascii_digit();
        let mut run = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() == is_digit {
                run.push(c);
                chars.next();
            } else {
                break;
            }
        }
        segment.push(if is_digit {
            Token::Digits(run)
        } else {
            Token::Letters(run)
        });
    }
    segment
}
