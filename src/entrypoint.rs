//! Entry-point invocation (spec §4.G).
//!
//! Grounded on the Design Notes' prescribed substitution (a name-indexed
//! table instead of reflective lookup) and the teacher's `cmd::Execute`
//! trait dispatch (matching on a closed set and delegating), adapted to
//! dispatch by `(class, procedure)` string pair within a module's lookup
//! scope rather than a closed Rust enum.

use std::collections::HashMap;

use crate::error::{BoxError, Error};
use crate::metadata::ModuleMeta;

const DEFAULT_PROCEDURE: &str = "main";

type EntryFn = Box<dyn Fn(&[String]) -> Result<Option<i32>, BoxError> + Send + Sync>;

/// A host-populated table standing in for reflective `(class, static method)`
/// dispatch (spec §9 Design Notes "Reflective invocation of the entry
/// point").
#[derive(Default)]
pub struct EntryPointTable {
    procedures: HashMap<(String, String), EntryFn>,
}

impl EntryPointTable {
    pub fn new() -> Self {
        EntryPointTable::default()
    }

    pub fn register(
        &mut self,
        class: impl Into<String>,
        procedure: impl Into<String>,
        f: impl Fn(&[String]) -> Result<Option<i32>, BoxError> + Send + Sync + 'static,
    ) {
        self.procedures.insert((class.into(), procedure.into()), Box::new(f));
    }

    /// Locate and invoke the entry point for `meta`: `class` defaults to
    /// `meta.entry_point_class`, `procedure` defaults to `"main"`. Returns
    /// the procedure's reported exit code, or `0` if it returned none
    /// (spec §4.G).
    pub fn invoke(
        &self,
        meta: &ModuleMeta,
        class: Option<&str>,
        procedure: Option<&str>,
        args: &[String],
    ) -> Result<i32, Error> {
        let procedure = procedure.unwrap_or(DEFAULT_PROCEDURE);
        let class = class
            .or(meta.entry_point_class.as_deref())
            .ok_or_else(|| Error::NoEntryPoint {
                class: None,
                procedure: procedure.to_string(),
            })?;

        let f = self
            .procedures
            .get(&(class.to_string(), procedure.to_string()))
            .ok_or_else(|| Error::NoEntryPoint {
                class: Some(class.to_string()),
                procedure: procedure.to_string(),
            })?;

        match f(args) {
            Ok(code) => Ok(code.unwrap_or(0)),
            Err(cause) => Err(Error::invocation_failed(cause)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ModuleId;
    use std::sync::Arc;

    struct EmptyArtifact;
    impl crate::artifact::Artifact for EmptyArtifact {
        fn file_name(&self) -> &str {
            "empty"
        }
        fn read_entry(&self, _entry: &str) -> std::io::Result<Option<Vec<u8>>> {
            Ok(None)
        }
        fn entries_under(&self, _prefix: &str) -> Vec<String> {
            vec![]
        }
    }

    fn meta(entry_point_class: Option<&str>) -> ModuleMeta {
        ModuleMeta {
            id: ModuleId::new("g", "a", "1.0").unwrap(),
            artifact: Arc::new(EmptyArtifact),
            requirements: vec![],
            lifecycle_class: None,
            entry_point_class: entry_point_class.map(String::from),
            resource_prefix: "",
        }
    }

    #[test]
    fn missing_entry_point_class_is_an_error() {
        let table = EntryPointTable::new();
        let m = meta(None);
        let err = table.invoke(&m, None, None, &[]).unwrap_err();
        assert!(matches!(err, Error::NoEntryPoint { class: None, .. }));
    }

    #[test]
    fn unregistered_procedure_is_an_error() {
        let table = EntryPointTable::new();
        let m = meta(Some("com.example.Main"));
        let err = table.invoke(&m, None, None, &[]).unwrap_err();
        assert!(matches!(err, Error::NoEntryPoint { .. }));
    }

    #[test]
    fn successful_invocation_defaults_to_zero_exit_code() {
        let mut table = EntryPointTable::new();
        table.register("com.example.Main", "main", |_args| Ok(None));
        let m = meta(Some("com.example.Main"));
        assert_eq!(table.invoke(&m, None, None, &[]).unwrap(), 0);
    }

    #[test]
    fn procedure_failure_wraps_cause() {
        let mut table = EntryPointTable::new();
        table.register("com.example.Main", "main", |_args| {
            Err(Box::<dyn std::error::Error + Send + Sync>::from("boom"))
        });
        let m = meta(Some("com.example.Main"));
        let err = table.invoke(&m, None, None, &[]).unwrap_err();
        match err {
            Error::InvocationFailed { cause } => assert_eq!(cause.to_string(), "boom"),
            other => panic!("expected InvocationFailed, got {other:?}"),
        }
    }

    #[test]
    fn nested_invocation_failure_unwraps_one_level() {
        let mut table = EntryPointTable::new();
        table.register("com.example.Main", "main", |_args| {
            let inner = Error::invocation_failed(Box::<dyn std::error::Error + Send + Sync>::from("root cause"));
            Err(Box::new(inner) as BoxError)
        });
        let m = meta(Some("com.example.Main"));
        let err = table.invoke(&m, None, None, &[]).unwrap_err();
        match err {
            Error::InvocationFailed { cause } => assert_eq!(cause.to_string(), "root cause"),
            other => panic!("expected InvocationFailed, got {other:?}"),
        }
    }
}
