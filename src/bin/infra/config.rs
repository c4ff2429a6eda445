//! Configuration-file reader (spec §6 "Configuration file format").
//!
//! Key-value text, one pair per line (`key=value` or `key: value`). Keys of
//! the form `infra!name` are consumed here; any other key of the form
//! `REQ!NAME` where `REQ` parses as a requirement becomes a per-module
//! setting delivered via `Registry::set_setting`.

use std::path::PathBuf;

use infra::requirement::{Requirement, parse_requirement};

#[derive(Debug, Default)]
pub struct Config {
    pub directories: Vec<PathBuf>,
    pub root_modules: Vec<String>,
    pub run_class: Option<String>,
    pub run_method: Option<String>,
    pub run_args: Vec<String>,
    pub settings: Vec<(Requirement, String, String)>,
}

fn split_kv(line: &str) -> Option<(&str, &str)> {
    let (k, v) = line.split_once('=').or_else(|| line.split_once(':'))?;
    Some((k.trim(), v.trim()))
}

fn split_comma_or_whitespace(value: &str) -> impl Iterator<Item = &str> {
    value.split(|c: char| c == ',' || c.is_whitespace()).filter(|s| !s.is_empty())
}

fn split_colon_or_semicolon(value: &str) -> impl Iterator<Item = &str> {
    value.split([':', ';']).filter(|s| !s.is_empty())
}

pub fn parse_config(text: &str) -> Config {
    let mut cfg = Config::default();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = split_kv(line) else {
            continue;
        };
        match key {
            "infra!directory" => cfg.directories.extend(split_comma_or_whitespace(value).map(PathBuf::from)),
            "infra!directories" => cfg.directories.extend(split_colon_or_semicolon(value).map(PathBuf::from)),
            "infra!module" => cfg.root_modules.extend(split_comma_or_whitespace(value).map(String::from)),
            "infra!runclass" => cfg.run_class = Some(value.to_string()),
            "infra!runmethod" => cfg.run_method = Some(value.to_string()),
            "infra!runarg" => cfg.run_args.extend(split_comma_or_whitespace(value).map(String::from)),
            other => {
                if let Some((req_s, name)) = other.split_once('!') {
                    if let Ok(req) = parse_requirement(req_s) {
                        cfg.settings.push((req, name.to_string(), value.to_string()));
                    }
                }
            }
        }
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_core_keys() {
        let cfg = parse_config(
            "infra!directory = /lib/modules, /opt/modules\n\
             infra!module=g:root:1.0\n\
             infra!runclass = com.example.Main\n",
        );
        assert_eq!(cfg.directories.len(), 2);
        assert_eq!(cfg.root_modules, vec!["g:root:1.0".to_string()]);
        assert_eq!(cfg.run_class.as_deref(), Some("com.example.Main"));
    }

    #[test]
    fn directories_key_splits_on_colon_or_semicolon() {
        let cfg = parse_config("infra!directories=/a:/b;/c\n");
        assert_eq!(cfg.directories.len(), 3);
    }

    #[test]
    fn module_setting_key_is_delivered() {
        let cfg = parse_config("g:a!timeout=30\n");
        assert_eq!(cfg.settings.len(), 1);
        let (req, name, value) = &cfg.settings[0];
        assert_eq!(req.artifact, "a");
        assert_eq!(name, "timeout");
        assert_eq!(value, "30");
    }

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        let cfg = parse_config("# comment\n\n  \ninfra!runmethod=start\n");
        assert_eq!(cfg.run_method.as_deref(), Some("start"));
    }
}
