//! Whistle IR - parsed call-graph representation for the Whistle runtime.
//!
//! The runtime does not parse textual mapping programs; it consumes an
//! already-parsed call graph produced by an external transpiler. This crate
//! defines that representation: function definitions, field mappings, value
//! sources, and target descriptors. All types are plain serializable data
//! with no evaluation logic.

mod program;
mod source;

pub use program::{
    ArgumentDef, FieldMapping, FunctionDefinition, MappingTarget, MergeMode,
};
pub use source::{FunctionCall, PackageRef, ValueSource};

/// Name of the implicit output variable of every function body.
///
/// A field mapping without an explicit target writes here; a field target
/// whose path equals this sentinel addresses the output at the empty path.
pub const OUTPUT_VAR: &str = "$this";

/// Name of the trailing free parameter bound per write when an ordinary
/// function is used as a write target.
pub const WRITE_PARAM: &str = "$write";
