//! Lifecycle hook dispatch (spec §4.F, §9 Design Notes).
//!
//! The source performs dynamic method lookup on a class name taken from
//! metadata; this substitutes a name-indexed table populated by the host at
//! build time, per the Design Notes' prescribed rewrite.

use std::collections::HashMap;

use crate::error::BoxError;
use crate::module::{ContextValue, Module};

type ActivateFn = Box<dyn Fn(&Module) -> Result<Option<ContextValue>, BoxError> + Send + Sync>;
type DeactivateFn = Box<dyn Fn(&Module) -> Result<(), BoxError> + Send + Sync>;

/// A host-populated table of `lifecycle_class -> hook`. Absence of an entry
/// for a class is not an error (spec §4.F: "Absence of the class or method
/// is not an error").
#[derive(Default)]
pub struct Hooks {
    activate: HashMap<String, ActivateFn>,
    deactivate: HashMap<String, DeactivateFn>,
}

impl Hooks {
    pub fn new() -> Self {
        Hooks::default()
    }

    pub fn register_activate(
        &mut self,
        class: impl Into<String>,
        hook: impl Fn(&Module) -> Result<Option<ContextValue>, BoxError> + Send + Sync + 'static,
    ) {
        self.activate.insert(class.into(), Box::new(hook));
    }

    pub fn register_deactivate(
        &mut self,
        class: impl Into<String>,
        hook: impl Fn(&Module) -> Result<(), BoxError> + Send + Sync + 'static,
    ) {
        self.deactivate.insert(class.into(), Box::new(hook));
    }

    pub fn activate(&self, class: &str, module: &Module) -> Option<Result<Option<ContextValue>, BoxError>> {
        self.activate.get(class).map(|hook| hook(module))
    }

    pub fn deactivate(&self, class: &str, module: &Module) -> Option<Result<(), BoxError>> {
        self.deactivate.get(class).map(|hook| hook(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ModuleId;
    use crate::metadata::ModuleMeta;
    use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

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

    fn module() -> Module {
        let meta = Arc::new(ModuleMeta {
            id: ModuleId::new("g", "a", "1.0").unwrap(),
            artifact: Arc::new(EmptyArtifact),
            requirements: vec![],
            lifecycle_class: Some("com.example.Hook".into()),
            entry_point_class: None,
            resource_prefix: "",
        });
        Module::new(meta, 0)
    }

    #[test]
    fn unregistered_class_yields_no_dispatch() {
        let hooks = Hooks::new();
        let m = module();
        assert!(hooks.activate("com.example.Hook", &m).is_none());
    }

    #[test]
    fn registered_activate_hook_runs() {
        let mut hooks = Hooks::new();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        hooks.register_activate("com.example.Hook", move |_m| {
            flag.store(true, Ordering::SeqCst);
            Ok(None)
        });
        let m = module();
        let result = hooks.activate("com.example.Hook", &m).unwrap();
        assert!(result.is_ok());
        assert!(ran.load(Ordering::SeqCst));
    }
}
