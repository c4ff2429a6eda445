//! The module manager's own CLI grammar (spec §6 "CLI surface").
//!
//! This is deliberately separate from the host's `clap`-parsed flags
//! (log level, config path): it is the bespoke long/short, flag/value,
//! pass-through grammar the core's external-interface section describes,
//! which `clap` does not model directly (repeatable flags with an
//! observable count, and unparsed trailing pass-through args).

use std::collections::HashMap;

/// Whether a named parameter is a no-value flag (count observable) or a
/// value parameter (list observable).
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Flag,
    Value,
}

pub struct ParamSpec {
    pub long: &'static str,
    pub short: Option<char>,
    pub kind: Kind,
    pub repeatable: bool,
}

impl ParamSpec {
    pub const fn flag(long: &'static str, short: Option<char>, repeatable: bool) -> Self {
        ParamSpec {
            long,
            short,
            kind: Kind::Flag,
            repeatable,
        }
    }

    pub const fn value(long: &'static str, short: Option<char>, repeatable: bool) -> Self {
        ParamSpec {
            long,
            short,
            kind: Kind::Value,
            repeatable,
        }
    }
}

#[derive(Default)]
pub struct ParsedArgs {
    pub flags: HashMap<&'static str, u32>,
    pub values: HashMap<&'static str, Vec<String>>,
    pub passthrough: Vec<String>,
}

impl ParsedArgs {
    pub fn flag_count(&self, long: &str) -> u32 {
        self.flags.get(long).copied().unwrap_or(0)
    }

    pub fn value(&self, long: &str) -> Option<&str> {
        self.values.get(long).and_then(|v| v.last()).map(String::as_str)
    }

    pub fn values(&self, long: &str) -> &[String] {
        self.values.get(long).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn find_spec<'a>(specs: &'a [ParamSpec], token: &str) -> Option<&'a ParamSpec> {
    if let Some(long) = token.strip_prefix("--") {
        specs.iter().find(|s| s.long == long)
    } else if let Some(short) = token.strip_prefix('-') {
        let mut chars = short.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        specs.iter().find(|s| s.short == Some(c))
    } else {
        None
    }
}

/// Parse `argv` against `specs`. Tokens are consumed left to right; the
/// first token that isn't a recognized `--name`/`-n` flag ends parameter
/// parsing, and it plus everything after it becomes `passthrough` verbatim
/// (spec §6: "arguments after the first non-dashed token are passed through
/// verbatim").
pub fn parse(specs: &[ParamSpec], argv: &[String]) -> Result<ParsedArgs, String> {
    let mut out = ParsedArgs::default();
    let mut iter = argv.iter().enumerate();

    while let Some((i, token)) = iter.next() {
        let Some(spec) = find_spec(specs, token) else {
            out.passthrough.extend(argv[i..].iter().cloned());
            break;
        };

        match spec.kind {
            Kind::Flag => {
                let count = out.flags.entry(spec.long).or_insert(0);
                if *count >= 1 && !spec.repeatable {
                    return Err(format!("parameter {token:?} does not repeat"));
                }
                *count += 1;
            }
            Kind::Value => {
                let Some((_, value)) = iter.next() else {
                    return Err(format!("parameter {token:?} requires a value"));
                };
                let slot = out.values.entry(spec.long).or_default();
                if !slot.is_empty() && !spec.repeatable {
                    return Err(format!("parameter {token:?} does not repeat"));
                }
                slot.push(value.clone());
            }
        }
    }

    Ok(out)
}
