//! Reference-counted recursive activation/deactivation (spec §4.F).
//!
//! Grounded on the teacher's recursive dependency-walking shape in
//! `vanilla.rs`'s `download_mc_lib` (collect, then recurse), adapted to a
//! strictly-ordered recursive activate/deactivate instead of a `JoinSet`
//! fan-out — §5 requires dependency-then-parent ordering, not unordered
//! concurrency.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::error::Error;
use crate::hooks::Hooks;
use crate::module::Module;
use crate::registry::Registry;

/// Activate `module` and, on its first activation, every non-`None`
/// dependency before it (spec §4.F "Activation algorithm"). Partial failure
/// is the caller's responsibility to unwind: a dependency failure leaves
/// `module` itself un-incremented, but any dependency that *did* activate
/// successfully stays at its incremented count (spec §4.F "Partial-failure
/// policy").
pub fn activate_recursively(registry: &Registry, module: &Arc<Module>, hooks: &Hooks) -> Result<(), Error> {
    let mut visiting = HashSet::new();
    activate_step(registry, module, hooks, &mut visiting)
}

/// A module already on this activation stack (a resolvable cycle
/// `A -> B -> A`, spec §8 "Boundary behaviors") is skipped rather than
/// re-entered: the outer, still-running call for that module is the one
/// that runs its hook and increments its counter.
fn activate_step(
    registry: &Registry,
    module: &Arc<Module>,
    hooks: &Hooks,
    visiting: &mut HashSet<usize>,
) -> Result<(), Error> {
    if !visiting.insert(module.idx) {
        return Ok(());
    }
    let result = (|| {
        if module.is_idle() {
            for dep_idx in registry.forward_of(module.idx).into_iter().flatten() {
                let dep = registry.module_at(dep_idx);
                activate_step(registry, &dep, hooks, visiting).map_err(|cause| Error::ActivationFailed {
                    module: module.id().clone(),
                    cause: Box::new(cause),
                })?;
            }
            if let Some(class) = module.meta.lifecycle_class.as_deref() {
                if let Some(result) = hooks.activate(class, module) {
                    match result {
                        Ok(value) => module.set_context_value(value),
                        Err(cause) => {
                            return Err(Error::ActivationFailed {
                                module: module.id().clone(),
                                cause,
                            });
                        }
                    }
                }
            }
        }
        module.increment();
        Ok(())
    })();
    visiting.remove(&module.idx);
    result
}

/// Deactivate `module` and, once its counter reaches zero, every non-`None`
/// dependency after it (spec §4.F "Deactivation algorithm"). A failing
/// deactivate hook is logged and does not stop the traversal, so dependency
/// counters never leak above zero (spec §7 "Propagation").
pub fn deactivate_recursively(registry: &Registry, module: &Arc<Module>, hooks: &Hooks) {
    let became_idle = module.decrement();
    if became_idle {
        if let Some(class) = module.meta.lifecycle_class.as_deref() {
            if let Some(Err(cause)) = hooks.deactivate(class, module) {
                warn!(module = %module.id(), error = %cause, "deactivation hook failed, continuing traversal");
            }
        }
        for dep_idx in registry.forward_of(module.idx).into_iter().flatten() {
            let dep = registry.module_at(dep_idx);
            deactivate_recursively(registry, &dep, hooks);
        }
    }
}
