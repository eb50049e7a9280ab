//! The runtime execution context.
//!
//! A [`RuntimeContext`] threads together the current stack frame, package
//! context, registries, metadata, cancellation token, and enabled options.
//! Every component is a shared handle: cloning a context aliases its
//! state, and deriving a child for a call installs a fresh frame (and
//! possibly a replacement package context) while sharing the rest.
//!
//! # The current-context slot
//!
//! Native code nested inside a call may need the executing context without
//! it being threaded through explicitly. A thread-local stack holds the
//! context of each in-flight wrapped invocation; it is maintained strictly
//! by an RAII guard, so the caller's context is restored on every exit
//! path, errors and unwinds included. One thread-local slot per thread
//! keeps concurrent top-level invocations on separate threads from seeing
//! each other.

use std::cell::RefCell;
use std::sync::Arc;

use whistle_data::{Closure, ClosureArg, Data};
use whistle_ir::{FunctionCall, PackageRef, ValueSource};

use crate::cancel::CancellationToken;
use crate::errors::{
    ambiguous_overload, cancelled, cannot_evaluate_free_parameter, no_candidates,
    no_matching_overload, stack_overflow, unbound_closure, unknown_option, EvalBacktrace,
    EvalResult,
};
use crate::frame::SharedFrame;
use crate::function::{ArgModifier, Callable};
use crate::meta::SharedMeta;
use crate::options::EnabledOptions;
use crate::overload::{closest_symbols, select_overload, OverloadFailure, Signature};
use crate::package::PackageContext;
use crate::registry::Registries;
use crate::stack::ensure_sufficient_stack;

/// Name of the bottom (root) frame of an execution.
pub const ROOT_FRAME: &str = "<root>";

/// Default frame-count ceiling.
pub const DEFAULT_FRAME_LIMIT: usize = 500;

/// Maximum number of "did you mean" suggestions attached to an error.
const MAX_SUGGESTIONS: usize = 3;

thread_local! {
    static CURRENT_CONTEXT: RefCell<Vec<RuntimeContext>> = const { RefCell::new(Vec::new()) };
}

/// RAII guard that pops the thread-local current-context stack on drop.
pub struct CurrentContextGuard(());

impl Drop for CurrentContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// The central execution handle.
#[derive(Clone, Debug)]
pub struct RuntimeContext {
    top: SharedFrame,
    bottom: SharedFrame,
    package: PackageContext,
    registries: Registries,
    meta: SharedMeta,
    cancel: CancellationToken,
    options: EnabledOptions,
    frame_limit: usize,
}

impl RuntimeContext {
    /// Create a top-level context whose top frame is the root frame.
    pub fn new(
        package: PackageContext,
        registries: Registries,
        meta: SharedMeta,
        cancel: CancellationToken,
        options: EnabledOptions,
        frame_limit: usize,
    ) -> Self {
        let bottom = SharedFrame::root(ROOT_FRAME);
        RuntimeContext {
            top: bottom.clone(),
            bottom,
            package,
            registries,
            meta,
            cancel,
            options,
            frame_limit,
        }
    }

    /// Reassemble a context from externally-held state (snapshot restore).
    pub(crate) fn from_parts(
        top: SharedFrame,
        bottom: SharedFrame,
        package: PackageContext,
        registries: Registries,
        meta: SharedMeta,
        cancel: CancellationToken,
        options: EnabledOptions,
        frame_limit: usize,
    ) -> Self {
        RuntimeContext {
            top,
            bottom,
            package,
            registries,
            meta,
            cancel,
            options,
            frame_limit,
        }
    }

    /// The context of the innermost wrapped invocation on this thread.
    pub fn current() -> Option<RuntimeContext> {
        CURRENT_CONTEXT.with(|stack| stack.borrow().last().cloned())
    }

    fn push_current(&self) -> CurrentContextGuard {
        CURRENT_CONTEXT.with(|stack| stack.borrow_mut().push(self.clone()));
        CurrentContextGuard(())
    }

    // Accessors

    /// The current top stack frame.
    #[inline]
    pub fn top_frame(&self) -> &SharedFrame {
        &self.top
    }

    /// The bottom (root) frame holding the outermost output variable.
    #[inline]
    pub fn bottom_frame(&self) -> &SharedFrame {
        &self.bottom
    }

    #[inline]
    pub fn package_context(&self) -> &PackageContext {
        &self.package
    }

    #[inline]
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    #[inline]
    pub fn meta(&self) -> &SharedMeta {
        &self.meta
    }

    #[inline]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    #[inline]
    pub fn options(&self) -> &EnabledOptions {
        &self.options
    }

    #[inline]
    pub fn frame_limit(&self) -> usize {
        self.frame_limit
    }

    // Evaluation

    /// Evaluate one value-source expression in this context.
    #[expect(
        clippy::cast_precision_loss,
        reason = "integer constants become f64 numbers by design"
    )]
    pub fn evaluate(&mut self, source: &ValueSource) -> EvalResult {
        ensure_sufficient_stack(|| match source {
            ValueSource::ConstString(s) => Ok(Data::str(s.clone())),
            ValueSource::ConstInt(i) => Ok(Data::num(*i as f64)),
            ValueSource::ConstFloat(x) => Ok(Data::num(*x)),
            ValueSource::ConstBool(b) => Ok(Data::Bool(*b)),
            ValueSource::FromLocal { name } => {
                Ok(self.top.lookup(name).unwrap_or(Data::Null))
            }
            ValueSource::FreeParameter { name } => Err(cannot_evaluate_free_parameter(name)),
            ValueSource::Call(call) if call.build_closure => self.build_closure(call),
            ValueSource::Call(call) => self.dispatch_call(call),
        })
    }

    /// Construct a closure from a deferred call: bound slots are evaluated
    /// eagerly, free-parameter expressions stay unbound.
    fn build_closure(&mut self, call: &FunctionCall) -> EvalResult {
        let mut slots = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            match arg {
                ValueSource::FreeParameter { name } => {
                    slots.push(ClosureArg::Free(name.clone()));
                }
                other => slots.push(ClosureArg::Bound(self.evaluate(other)?)),
            }
        }
        Ok(Data::closure(Closure::new(
            call.package.clone(),
            call.name.clone(),
            slots,
        )))
    }

    /// Evaluate a call's arguments in this (the caller's) context, then
    /// resolve and invoke.
    fn dispatch_call(&mut self, call: &FunctionCall) -> EvalResult {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.evaluate(arg)?);
        }
        self.call_function(&call.package, &call.name, &args)
    }

    /// Resolve `name` in `package` scope against the evaluated arguments
    /// and invoke the winning overload.
    pub fn call_function(
        &mut self,
        package: &PackageRef,
        name: &str,
        args: &[Data],
    ) -> EvalResult {
        self.check_cancelled()?;

        let candidates = self.registries.functions.lookup(package, name);
        if candidates.is_empty() {
            return Err(no_candidates(
                name,
                package.to_string(),
                self.function_suggestions(name),
            ));
        }

        let signatures: Vec<Signature> = candidates
            .iter()
            .map(|candidate| candidate.signature().clone())
            .collect();
        let index = match select_overload(&signatures, args) {
            Ok(index) => index,
            Err(OverloadFailure::NoMatch) => {
                let arg_kinds = args
                    .iter()
                    .map(|arg| arg.kind().name().to_string())
                    .collect();
                return Err(no_matching_overload(
                    name,
                    arg_kinds,
                    self.function_suggestions(name),
                ));
            }
            Err(OverloadFailure::Ambiguous { tied }) => {
                let mut listed: Vec<String> = tied
                    .iter()
                    .map(|&index| signatures[index].to_string())
                    .collect();
                listed.sort_unstable();
                return Err(ambiguous_overload(name, listed));
            }
        };
        let callable = candidates[index].clone();
        self.invoke_wrapped(&*callable, args)
    }

    /// Execute a fully-bound closure.
    pub fn call_closure(&mut self, closure: &Closure) -> EvalResult {
        match closure.bound_args() {
            Some(args) => self.call_function(closure.package(), closure.name(), &args),
            None => Err(unbound_closure(
                closure.name(),
                closure
                    .free_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }

    /// Invoke a callable through the `wrap` protocol: frame-ceiling check,
    /// child-context derivation, current-context registration, and
    /// backtrace capture on failure.
    pub fn invoke_wrapped(&self, callable: &dyn Callable, args: &[Data]) -> EvalResult {
        let depth = self.top.depth();
        if depth + 1 > self.frame_limit {
            return Err(stack_overflow(self.frame_limit, self.top.frame_counts()));
        }

        let mut child = self.derive_for_call(callable);
        let _guard = child.push_current();
        tracing::trace!(
            function = %callable.signature(),
            depth = depth + 1,
            "dispatching function call"
        );
        ensure_sufficient_stack(|| callable.invoke(&mut child, args))
            .map_err(|err| err.with_backtrace(EvalBacktrace::new(child.top.chain_names())))
    }

    /// Derive the callee's context: fresh frame parented per the callee's
    /// inheritance declaration, the callee's local package context when it
    /// declares one, everything else shared.
    fn derive_for_call(&self, callable: &dyn Callable) -> RuntimeContext {
        let signature = callable.signature();
        let frame = SharedFrame::with_parent(
            signature.name.clone(),
            self.top.clone(),
            callable.inherit_parent_vars(),
        );
        RuntimeContext {
            top: frame,
            bottom: self.bottom.clone(),
            package: callable
                .local_package_context()
                .cloned()
                .unwrap_or_else(|| self.package.clone()),
            registries: self.registries.clone(),
            meta: self.meta.clone(),
            cancel: self.cancel.clone(),
            options: self.options.derive(),
            frame_limit: self.frame_limit,
        }
    }

    // Registry-backed helpers

    /// Look up an argument modifier by name across all packages.
    pub fn arg_modifier(&self, name: &str) -> EvalResult<Arc<dyn ArgModifier>> {
        self.registries
            .arg_modifiers
            .lookup(&PackageRef::Wildcard, name)
            .into_iter()
            .next()
            .ok_or_else(|| crate::errors::unknown_modifier(name))
    }

    /// Enable an option declared by a function definition; the option must
    /// be registered.
    pub fn enable_declared_option(&self, name: &str) -> EvalResult<()> {
        if !self.registries.options.contains_name(name) {
            return Err(unknown_option(name));
        }
        tracing::debug!(option = name, "enabling option");
        self.options.enable(name);
        Ok(())
    }

    /// Cancellation checkpoint: surfaces an error when the token is set.
    pub fn check_cancelled(&self) -> EvalResult<()> {
        if self.cancel.is_cancelled() {
            let reason = self
                .cancel
                .reason()
                .unwrap_or_else(|| "no reason given".to_string());
            return Err(cancelled(reason));
        }
        Ok(())
    }

    fn function_suggestions(&self, name: &str) -> Vec<String> {
        closest_symbols(
            name,
            &self.registries.functions.symbol_names(),
            MAX_SUGGESTIONS,
        )
    }
}
