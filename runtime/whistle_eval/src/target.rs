//! Write targets.
//!
//! A [`Target`] receives the evaluated source value of a field mapping.
//! The two built-in merge-capable targets (variable and side) share one
//! write protocol: skip-check, fetch the current value, merge under the
//! resolved mode, write back. Custom sinks come from the target registry;
//! a name with no registered constructor falls back to an ordinary
//! function call carrying a trailing free write parameter.

use whistle_data::{Closure, Data, Path};
use whistle_ir::{MergeMode, OUTPUT_VAR};

use crate::context::RuntimeContext;
use crate::errors::{unsupported_operation, EvalError, EvalResult};
use crate::merge;
use crate::meta::SharedMeta;
use crate::options::MERGE_MODES_EXPERIMENT;

/// Receives one mapping's evaluated value (or one element per iteration).
pub trait Target {
    fn write(&mut self, ctx: &mut RuntimeContext, value: Data) -> EvalResult<()>;
}

/// Builds a [`Target`] from a mapping's evaluated constructor arguments.
/// Registered per package; at most one constructor may exist per name.
pub trait TargetConstructor: Send + Sync {
    fn name(&self) -> &str;
    fn construct(&self, ctx: &mut RuntimeContext, args: &[Data]) -> EvalResult<Box<dyn Target>>;
}

/// Resolve the effective merge mode. Explicitly naming a non-default mode
/// requires the merge-modes experiment to be enabled.
fn resolve_mode(
    ctx: &RuntimeContext,
    explicit: Option<MergeMode>,
    default_mode: MergeMode,
) -> EvalResult<MergeMode> {
    match explicit {
        None => Ok(default_mode),
        Some(mode) if mode == default_mode => Ok(mode),
        Some(mode) => {
            if ctx.options().is_enabled(MERGE_MODES_EXPERIMENT) {
                Ok(mode)
            } else {
                Err(unsupported_operation(
                    format!("explicit merge mode `{mode}`"),
                    format!("option {MERGE_MODES_EXPERIMENT}"),
                ))
            }
        }
    }
}

/// The built-in variable-set target: a named variable (the output variable
/// included) at a dotted/indexed path.
pub struct VariableTarget {
    name: String,
    path: Path,
    explicit_mode: Option<MergeMode>,
}

impl VariableTarget {
    pub fn new(name: impl Into<String>, path: Path, explicit_mode: Option<MergeMode>) -> Self {
        VariableTarget {
            name: name.into(),
            path,
            explicit_mode,
        }
    }

    /// Target the implicit output variable.
    pub fn output(path: Path, explicit_mode: Option<MergeMode>) -> Self {
        VariableTarget::new(OUTPUT_VAR, path, explicit_mode)
    }
}

impl Target for VariableTarget {
    fn write(&mut self, ctx: &mut RuntimeContext, incoming: Data) -> EvalResult<()> {
        let is_output = self.name == OUTPUT_VAR;

        // Skip-check: an absent value merging into the output or into a
        // sub-path is a no-op (it would erase accumulated state); writing
        // it to a whole plain variable stays observable.
        if incoming.is_empty_or_null() && (is_output || !self.path.is_empty()) {
            return Ok(());
        }

        let default_mode = if is_output || !self.path.is_empty() {
            MergeMode::Merge
        } else {
            MergeMode::Replace
        };
        let mode = resolve_mode(ctx, self.explicit_mode, default_mode)?;

        let existing = ctx.top_frame().lookup(&self.name).unwrap_or(Data::Null);
        let merged = merge::apply(mode, existing, &self.path, incoming)?;
        tracing::trace!(variable = %self.name, path = %self.path, mode = %mode, "variable write");
        ctx.top_frame().set_var(&self.name, merged);
        Ok(())
    }
}

/// Transient-metadata key of the side-output stack.
const SIDE_STACK_KEY: &str = "$sideOutputs";

/// Push a fresh side-output catcher (entering a `withSides`-style scope).
pub fn push_side_catcher(meta: &SharedMeta) {
    let _ = meta.transient_mut(SIDE_STACK_KEY, Vec::new, |stack: &mut Vec<Data>| {
        stack.push(Data::empty_container());
    });
}

/// Pop the innermost side-output catcher (leaving the scope), yielding
/// whatever the side writes accumulated.
pub fn pop_side_catcher(meta: &SharedMeta) -> Option<Data> {
    meta.transient_mut(SIDE_STACK_KEY, Vec::new, |stack: &mut Vec<Data>| stack.pop())
        .flatten()
}

/// Number of live side-output catchers.
pub fn side_stack_depth(meta: &SharedMeta) -> usize {
    meta.transient(SIDE_STACK_KEY, |stack: &Vec<Data>| stack.len())
        .unwrap_or(0)
}

fn side_stack_push(meta: &SharedMeta, value: Data) {
    let _ = meta.transient_mut(SIDE_STACK_KEY, Vec::new, |stack: &mut Vec<Data>| {
        stack.push(value);
    });
}

/// The built-in side-output target.
///
/// Writes pop the innermost catcher, merge, and push the result back, so
/// exactly one side container is live per nesting level. With no catcher
/// active, writes merge into the outermost output variable (legacy
/// compatibility mode).
pub struct SideTarget {
    path: Path,
    explicit_mode: Option<MergeMode>,
}

impl SideTarget {
    pub fn new(path: Path, explicit_mode: Option<MergeMode>) -> Self {
        SideTarget {
            path,
            explicit_mode,
        }
    }
}

impl Target for SideTarget {
    fn write(&mut self, ctx: &mut RuntimeContext, incoming: Data) -> EvalResult<()> {
        if incoming.is_empty_or_null() && !self.path.is_empty() {
            return Ok(());
        }
        let mode = resolve_mode(ctx, self.explicit_mode, MergeMode::Merge)?;

        match pop_side_catcher(ctx.meta()) {
            Some(existing) => {
                let merged = merge::apply(mode, existing, &self.path, incoming)?;
                side_stack_push(ctx.meta(), merged);
            }
            None => {
                let existing = ctx
                    .bottom_frame()
                    .lookup(OUTPUT_VAR)
                    .unwrap_or(Data::Null);
                let merged = merge::apply(mode, existing, &self.path, incoming)?;
                ctx.bottom_frame().set_var(OUTPUT_VAR, merged);
            }
        }
        Ok(())
    }
}

/// Fallback sink: an ordinary function acting as a write target through a
/// trailing free write parameter, bound once per write.
pub struct FunctionSinkTarget {
    closure: Closure,
}

impl FunctionSinkTarget {
    pub fn new(closure: Closure) -> Self {
        FunctionSinkTarget { closure }
    }
}

impl Target for FunctionSinkTarget {
    fn write(&mut self, ctx: &mut RuntimeContext, value: Data) -> EvalResult<()> {
        let bound = self.closure.bind_next_free(value).ok_or_else(|| {
            EvalError::new(format!(
                "sink function {} has no free write parameter",
                self.closure.name()
            ))
        })?;
        // The per-write result is discarded.
        ctx.call_closure(&bound)?;
        Ok(())
    }
}
