//! Runtime module instances (spec §3 "Module instance").
//!
//! A `Module` never owns its dependencies directly; it is addressed by
//! index into the registry's arena, and `forward`/`reverse` edges live in
//! the registry rather than in the struct itself. This is what lets a cyclic
//! dependency graph (`A -> B -> A`) exist without a true Rust reference
//! cycle (spec §9 Design Notes).

use std::sync::Mutex;
use std::sync::Arc;

use crate::id::ModuleId;
use crate::metadata::ModuleMeta;

/// Whatever a lifecycle hook's `activate` returns, held for the module's
/// Active lifetime (spec §3 "Lifecycles").
pub type ContextValue = Box<dyn std::any::Any + Send + Sync>;

pub struct Module {
    pub meta: Arc<ModuleMeta>,
    pub idx: usize,
    activation: Mutex<ActivationState>,
}

#[derive(Default)]
struct ActivationState {
    counter: u32,
    context_value: Option<ContextValue>,
}

impl Module {
    pub fn new(meta: Arc<ModuleMeta>, idx: usize) -> Self {
        Module {
            meta,
            idx,
            activation: Mutex::new(ActivationState::default()),
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.meta.id
    }

    pub fn activation_count(&self) -> u32 {
        self.activation.lock().unwrap().counter
    }

    /// `true` while `counter == 0` (spec §4.F "Idle" state).
    pub(crate) fn is_idle(&self) -> bool {
        self.activation.lock().unwrap().counter == 0
    }

    pub(crate) fn increment(&self) {
        self.activation.lock().unwrap().counter += 1;
    }

    /// Decrements the counter, returning whether it reached zero. Clears the
    /// held context value on that transition (spec §3 "activation counter:
    /// transitions 0 -> n -> 0; while >0, the lifecycle context value is
    /// held").
    pub(crate) fn decrement(&self) -> bool {
        let mut state = self.activation.lock().unwrap();
        state.counter = state.counter.saturating_sub(1);
        let idle = state.counter == 0;
        if idle {
            state.context_value = None;
        }
        idle
    }

    pub(crate) fn set_context_value(&self, value: Option<ContextValue>) {
        self.activation.lock().unwrap().context_value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ModuleId;
    use crate::metadata::ModuleMeta;

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

    fn meta() -> Arc<ModuleMeta> {
        Arc::new(ModuleMeta {
            id: ModuleId::new("g", "a", "1.0").unwrap(),
            artifact: Arc::new(EmptyArtifact),
            requirements: vec![],
            lifecycle_class: None,
            entry_point_class: None,
            resource_prefix: "",
        })
    }

    #[test]
    fn counter_transitions_idle_active_idle() {
        let m = Module::new(meta(), 0);
        assert!(m.is_idle());
        m.increment();
        assert!(!m.is_idle());
        m.increment();
        assert_eq!(m.activation_count(), 2);
        assert!(!m.decrement());
        assert!(m.decrement());
        assert!(m.is_idle());
    }

    #[test]
    fn context_value_cleared_on_return_to_idle() {
        let m = Module::new(meta(), 0);
        m.increment();
        m.set_context_value(Some(Box::new(42i32)));
        m.decrement();
        // no public accessor for context_value; absence of a panic here and
        // activation_count()==0 is the externally observable contract.
        assert_eq!(m.activation_count(), 0);
    }
}
