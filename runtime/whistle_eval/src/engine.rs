//! Engine entry point.
//!
//! [`EngineBuilder`] is the registry-population surface consumed by the
//! (out-of-scope) import machinery and by embedders: functions, targets,
//! loaders, parsers, argument modifiers, and options register per
//! package, then [`EngineBuilder::build`] freezes everything into an
//! [`Engine`] whose registries are shared read-only across runs.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use whistle_data::Data;
use whistle_ir::{FunctionDefinition, PackageRef};

use crate::cancel::CancellationToken;
use crate::context::{RuntimeContext, DEFAULT_FRAME_LIMIT};
use crate::errors::{EvalError, EvalResult};
use crate::function::{ArgModifier, Callable, RequiredModifier, WhistleFunction};
use crate::meta::SharedMeta;
use crate::options::{EnabledOptions, OptionDef, MERGE_MODES_EXPERIMENT};
use crate::package::PackageContext;
use crate::registry::{Loader, Parser, Registries, RegistrySet};
use crate::target::TargetConstructor;

/// Package the engine's built-in registrations live in.
pub const BUILTIN_PACKAGE: &str = "builtins";

/// Output of one top-level run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunResult {
    /// The main function's output value.
    pub output: Data,
    /// Final serializable metadata (accumulated non-fatal diagnostics and
    /// whatever else the run recorded), as a container.
    pub meta: Data,
}

/// Builder collecting registrations before execution begins.
pub struct EngineBuilder {
    registries: RegistrySet,
    enabled_options: FxHashSet<String>,
    frame_limit: usize,
    main: Option<(String, String)>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        let mut registries = RegistrySet::default();
        registries.options.register(
            BUILTIN_PACKAGE,
            MERGE_MODES_EXPERIMENT,
            OptionDef::new(
                MERGE_MODES_EXPERIMENT,
                "allow explicitly named merge modes on field mappings",
            )
            .experimental(),
        );
        registries.arg_modifiers.register(
            BUILTIN_PACKAGE,
            "required",
            Arc::new(RequiredModifier),
        );
        EngineBuilder {
            registries,
            enabled_options: FxHashSet::default(),
            frame_limit: DEFAULT_FRAME_LIMIT,
            main: None,
        }
    }

    /// Register an interpreted function definition under `package`.
    #[must_use]
    pub fn register_function(self, package: &str, def: FunctionDefinition) -> Self {
        let context = PackageContext::new(package);
        self.register_function_with_context(package, context, def)
    }

    /// Register an interpreted function with an explicit package context
    /// (aliases, import provenance).
    #[must_use]
    pub fn register_function_with_context(
        mut self,
        package: &str,
        context: PackageContext,
        def: FunctionDefinition,
    ) -> Self {
        let name = def.name.clone();
        let function = WhistleFunction::new(def, context);
        self.registries
            .functions
            .register(package, &name, Arc::new(function));
        self
    }

    /// Register a native callable under `package`; the symbol name comes
    /// from its signature.
    #[must_use]
    pub fn register_callable(mut self, package: &str, callable: Arc<dyn Callable>) -> Self {
        let name = callable.signature().name.clone();
        self.registries.functions.register(package, &name, callable);
        self
    }

    /// Register a custom target constructor under `package`.
    #[must_use]
    pub fn register_target(
        mut self,
        package: &str,
        constructor: Arc<dyn TargetConstructor>,
    ) -> Self {
        let name = constructor.name().to_string();
        self.registries.targets.register(package, &name, constructor);
        self
    }

    /// Register an argument modifier under `package`.
    #[must_use]
    pub fn register_arg_modifier(mut self, package: &str, modifier: Arc<dyn ArgModifier>) -> Self {
        let name = modifier.name().to_string();
        self.registries
            .arg_modifiers
            .register(package, &name, modifier);
        self
    }

    /// Register a loader under `package`.
    #[must_use]
    pub fn register_loader(mut self, package: &str, loader: Arc<dyn Loader>) -> Self {
        let name = loader.name().to_string();
        self.registries.loaders.register(package, &name, loader);
        self
    }

    /// Register a parser under `package`.
    #[must_use]
    pub fn register_parser(mut self, package: &str, parser: Arc<dyn Parser>) -> Self {
        let name = parser.name().to_string();
        self.registries.parsers.register(package, &name, parser);
        self
    }

    /// Register an option descriptor under `package`.
    #[must_use]
    pub fn register_option(mut self, package: &str, option: OptionDef) -> Self {
        let name = option.name.clone();
        self.registries.options.register(package, &name, option);
        self
    }

    /// Enable an option for every run.
    #[must_use]
    pub fn enable_option(mut self, name: impl Into<String>) -> Self {
        self.enabled_options.insert(name.into());
        self
    }

    /// Override the frame-count ceiling.
    #[must_use]
    pub fn frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Designate the root function evaluated by [`Engine::run`].
    #[must_use]
    pub fn main_function(mut self, package: impl Into<String>, name: impl Into<String>) -> Self {
        self.main = Some((package.into(), name.into()));
        self
    }

    /// Freeze registrations into an engine.
    pub fn build(self) -> Engine {
        Engine {
            registries: Registries::new(self.registries),
            enabled_options: self.enabled_options,
            frame_limit: self.frame_limit,
            main: self.main,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        EngineBuilder::new()
    }
}

/// A frozen set of registrations plus run configuration.
pub struct Engine {
    registries: Registries,
    enabled_options: FxHashSet<String>,
    frame_limit: usize,
    main: Option<(String, String)>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// The frozen registries (shared by reference with every context).
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// A fresh top-level context over this engine's registries.
    pub fn root_context(&self, package: &str, token: CancellationToken) -> RuntimeContext {
        RuntimeContext::new(
            PackageContext::new(package),
            self.registries.clone(),
            SharedMeta::new(),
            token,
            EnabledOptions::from_names(self.enabled_options.iter().cloned()),
            self.frame_limit,
        )
    }

    /// Evaluate the designated main function against `args`.
    pub fn run(&self, args: &[Data]) -> EvalResult<RunResult> {
        self.run_with_token(args, CancellationToken::new())
    }

    /// Evaluate the main function with an externally-held cancellation
    /// token.
    pub fn run_with_token(&self, args: &[Data], token: CancellationToken) -> EvalResult<RunResult> {
        let Some((package, name)) = &self.main else {
            return Err(EvalError::new("no main function designated"));
        };
        let mut ctx = self.root_context(package, token);
        tracing::debug!(package = %package, function = %name, "starting run");
        let output = ctx.call_function(&PackageRef::named(package.clone()), name, args)?;
        let meta = ctx.meta().serializable_snapshot();
        tracing::debug!(function = %name, "run finished");
        Ok(RunResult { output, meta })
    }
}
