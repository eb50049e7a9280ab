//! Whistle Eval - runtime core for the Whistle data-mapping language.
//!
//! The runtime interprets an already-parsed call graph (`whistle_ir`)
//! over the polymorphic value model (`whistle_data`).
//!
//! # Architecture
//!
//! - `SharedFrame`: parent-linked variable scopes with inheritance,
//!   shadowing, and write-through to the defining ancestor
//! - `RuntimeContext`: the central execution handle (frames, package
//!   context, registries, metadata, cancellation, options) with a
//!   thread-local current-context slot maintained by an RAII guard
//! - `overload`: candidate selection by explicit kind-table distance,
//!   with wrapper peeling and variadic scoring
//! - `Callable`/`WhistleFunction`: the function-call protocol (arity,
//!   argument-modifier short-circuiting, binding, option toggling)
//! - `mapping`/`target`/`merge`: the field-mapping engine and the shared
//!   merge-capable write protocol
//! - `Engine`/`EngineBuilder`: registry population and the top-level
//!   entry point
//!
//! Parsing, plugin loading, and documentation tooling are external
//! collaborators; they populate the registries through the builder and
//! consume the result-value API.

mod cancel;
mod context;
mod engine;
pub mod errors;
mod frame;
mod function;
mod mapping;
pub mod merge;
mod meta;
mod options;
mod overload;
mod package;
mod registry;
mod snapshot;
mod stack;
mod target;

pub use cancel::{CancelCallback, CancellationToken};
pub use context::{CurrentContextGuard, RuntimeContext, DEFAULT_FRAME_LIMIT, ROOT_FRAME};
pub use engine::{Engine, EngineBuilder, RunResult, BUILTIN_PACKAGE};
pub use errors::{EvalBacktrace, EvalError, EvalErrorKind, EvalNote, EvalResult};
pub use frame::{SharedFrame, StackFrame};
pub use function::{ArgModifier, Callable, NativeFunction, RequiredModifier, WhistleFunction};
pub use mapping::{execute_mapping, execute_mappings};
pub use meta::{MetaData, SharedMeta};
pub use options::{EnabledOptions, OptionDef, MERGE_MODES_EXPERIMENT};
pub use overload::{
    closest_symbols, distance, edit_distance, select_overload, signature_distance,
    OverloadFailure, ParamType, Signature, ARRAY_UNPACK_PENALTY, WRAPPER_PENALTY,
};
pub use package::PackageContext;
pub use registry::{
    Loader, PackageRegistry, Parser, Registries, RegistrySet, SharedRegistry,
};
pub use snapshot::{ContextSnapshot, FrameSnapshot, RegistrySnapshotter};
pub use stack::ensure_sufficient_stack;
pub use target::{
    pop_side_catcher, push_side_catcher, side_stack_depth, FunctionSinkTarget, SideTarget,
    Target, TargetConstructor, VariableTarget,
};
