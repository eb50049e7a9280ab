//! Callable functions.
//!
//! [`Callable`] is the seam between the dispatcher and function bodies:
//! native implementations carry a Rust closure, interpreted
//! [`WhistleFunction`]s carry a parsed definition plus the package context
//! captured at registration time. Both are invoked through the context's
//! `wrap` protocol, which has already derived a child context with a fresh
//! stack frame by the time `invoke` runs.

use std::fmt;

use whistle_data::Data;
use whistle_ir::{FunctionDefinition, OUTPUT_VAR};

use crate::context::RuntimeContext;
use crate::errors::{arity_mismatch, EvalResult};
use crate::mapping::execute_mappings;
use crate::overload::{ParamType, Signature};
use crate::package::PackageContext;

/// A function the dispatcher can invoke.
pub trait Callable: Send + Sync {
    /// Declared signature, used for overload selection.
    fn signature(&self) -> &Signature;

    /// Replacement package context for the duration of the body, when the
    /// callable's declaring file differs from its caller's.
    fn local_package_context(&self) -> Option<&PackageContext> {
        None
    }

    /// Whether the body's frame resolves variables from the caller's frame.
    fn inherit_parent_vars(&self) -> bool {
        false
    }

    /// Execute the body. `ctx` is the callee's own derived context; `args`
    /// are already evaluated and overload-selected.
    fn invoke(&self, ctx: &mut RuntimeContext, args: &[Data]) -> EvalResult;
}

/// Transforms (and may short-circuit on) a declared argument.
pub trait ArgModifier: Send + Sync {
    fn name(&self) -> &str;

    /// When `Some`, the function body is skipped entirely and the returned
    /// value becomes the call's result.
    fn short_circuit(&self, _arg: &Data) -> Option<Data> {
        None
    }

    /// Transform the argument value before binding. Identity by default.
    fn transform(&self, arg: Data) -> Data {
        arg
    }
}

/// The nil-propagating modifier: an absent argument skips the body and
/// propagates null.
#[derive(Debug, Default)]
pub struct RequiredModifier;

impl ArgModifier for RequiredModifier {
    fn name(&self) -> &str {
        "required"
    }

    fn short_circuit(&self, arg: &Data) -> Option<Data> {
        arg.is_empty_or_null().then_some(Data::Null)
    }
}

type NativeBody = Box<dyn Fn(&mut RuntimeContext, &[Data]) -> EvalResult + Send + Sync>;

/// A natively-implemented function with an explicit signature.
pub struct NativeFunction {
    signature: Signature,
    inherit_parent_vars: bool,
    body: NativeBody,
}

impl NativeFunction {
    pub fn new(
        package: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ParamType>,
        body: impl Fn(&mut RuntimeContext, &[Data]) -> EvalResult + Send + Sync + 'static,
    ) -> Self {
        NativeFunction {
            signature: Signature::new(package, name, params),
            inherit_parent_vars: false,
            body: Box::new(body),
        }
    }

    /// A variadic native function; `params` must end with the element type.
    pub fn new_variadic(
        package: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ParamType>,
        body: impl Fn(&mut RuntimeContext, &[Data]) -> EvalResult + Send + Sync + 'static,
    ) -> Self {
        NativeFunction {
            signature: Signature::new_variadic(package, name, params),
            inherit_parent_vars: false,
            body: Box::new(body),
        }
    }

    /// Let the body's frame see the caller's variables.
    #[must_use]
    pub fn inheriting_parent_vars(mut self) -> Self {
        self.inherit_parent_vars = true;
        self
    }
}

impl Callable for NativeFunction {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn inherit_parent_vars(&self) -> bool {
        self.inherit_parent_vars
    }

    fn invoke(&self, ctx: &mut RuntimeContext, args: &[Data]) -> EvalResult {
        (self.body)(ctx, args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.signature)
    }
}

/// An interpreted function body: the parsed definition plus the package
/// context captured when it was registered.
#[derive(Debug)]
pub struct WhistleFunction {
    def: FunctionDefinition,
    signature: Signature,
    package_context: PackageContext,
}

impl WhistleFunction {
    pub fn new(def: FunctionDefinition, package_context: PackageContext) -> Self {
        // Interpreted arguments are untyped: every position is root data.
        let signature = Signature::new(
            package_context.current_package(),
            def.name.clone(),
            vec![ParamType::Any; def.args.len()],
        );
        WhistleFunction {
            def,
            signature,
            package_context,
        }
    }

    pub fn definition(&self) -> &FunctionDefinition {
        &self.def
    }
}

impl Callable for WhistleFunction {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn local_package_context(&self) -> Option<&PackageContext> {
        Some(&self.package_context)
    }

    fn inherit_parent_vars(&self) -> bool {
        self.def.inherit_parent_vars
    }

    fn invoke(&self, ctx: &mut RuntimeContext, args: &[Data]) -> EvalResult {
        let declared = &self.def.args;
        if args.len() != declared.len() {
            let missing = declared
                .iter()
                .skip(args.len())
                .map(|arg| arg.name.clone())
                .collect();
            return Err(arity_mismatch(
                &self.def.name,
                declared.len(),
                args.len(),
                missing,
            ));
        }

        // Short-circuit scan, in argument order: the first modifier that
        // signals a skip supplies the whole call's result.
        let mut modifiers = Vec::with_capacity(declared.len());
        for (arg_def, value) in declared.iter().zip(args) {
            let modifier = match &arg_def.modifier {
                Some(name) => Some(ctx.arg_modifier(name)?),
                None => None,
            };
            if let Some(modifier) = &modifier {
                if let Some(result) = modifier.short_circuit(value) {
                    return Ok(result);
                }
            }
            modifiers.push(modifier);
        }

        // Bind modifier-transformed arguments into the fresh frame.
        for ((arg_def, value), modifier) in declared.iter().zip(args).zip(&modifiers) {
            let value = match modifier {
                Some(modifier) => modifier.transform(value.clone()),
                None => value.clone(),
            };
            ctx.top_frame().set_local(arg_def.name.clone(), value);
        }

        // Options the definition declares stay scoped to this child context.
        for option in &self.def.options {
            ctx.enable_declared_option(option)?;
        }

        execute_mappings(ctx, &self.def.mappings)?;
        Ok(ctx.top_frame().lookup(OUTPUT_VAR).unwrap_or(Data::Null))
    }
}
