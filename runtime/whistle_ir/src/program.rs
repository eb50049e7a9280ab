//! Function definitions and field mappings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::source::ValueSource;

/// Policy governing how a newly written value combines with the value
/// already present at the target path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    /// Incoming unconditionally overwrites.
    Replace,
    /// Recursive container merge, array concatenation, empty-aware.
    Merge,
    /// Incoming becomes the last element of an (absent-or-) array.
    Append,
    /// Arrays concatenate; containers take only absent keys.
    Extend,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeMode::Replace => "replace",
            MergeMode::Merge => "merge",
            MergeMode::Append => "append",
            MergeMode::Extend => "extend",
        };
        write!(f, "{name}")
    }
}

/// Destination descriptor of one field mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MappingTarget {
    /// A named variable in the current frame, at a dotted/indexed path.
    Var { name: String, path: String },
    /// A path on the implicit output, or on the active side-output catcher
    /// when `side` is set.
    Field { path: String, side: bool },
    /// A custom sink resolved through the target registry. An unqualified
    /// sink (`package: None`) is resolved through the caller's visible
    /// package set.
    Custom {
        package: Option<String>,
        name: String,
        args: Vec<ValueSource>,
    },
}

/// One field mapping: evaluate `value`, route it to `target`.
///
/// Without a target the whole output variable is written at the empty path.
/// With `iterate` set the evaluated source must be a container, array, or
/// dataset, and the target is invoked once per element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub value: ValueSource,
    #[serde(default)]
    pub target: Option<MappingTarget>,
    #[serde(default)]
    pub iterate: bool,
    /// Explicitly named merge mode. Non-default modes are gated behind an
    /// experimental option at execution time.
    #[serde(default)]
    pub merge_mode: Option<MergeMode>,
}

impl FieldMapping {
    /// A mapping that writes the whole output variable.
    pub fn output(value: ValueSource) -> Self {
        FieldMapping {
            value,
            target: None,
            iterate: false,
            merge_mode: None,
        }
    }

    /// A mapping into a named variable at an optional path.
    pub fn var(name: impl Into<String>, path: impl Into<String>, value: ValueSource) -> Self {
        FieldMapping {
            value,
            target: Some(MappingTarget::Var {
                name: name.into(),
                path: path.into(),
            }),
            iterate: false,
            merge_mode: None,
        }
    }

    /// A mapping into the output at a path.
    pub fn field(path: impl Into<String>, value: ValueSource) -> Self {
        FieldMapping {
            value,
            target: Some(MappingTarget::Field {
                path: path.into(),
                side: false,
            }),
            iterate: false,
            merge_mode: None,
        }
    }

    /// Mark this mapping as iterating over its source.
    #[must_use]
    pub fn iterated(mut self) -> Self {
        self.iterate = true;
        self
    }

    /// Explicitly name a merge mode.
    #[must_use]
    pub fn with_merge_mode(mut self, mode: MergeMode) -> Self {
        self.merge_mode = Some(mode);
        self
    }
}

/// A declared argument of a function definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDef {
    pub name: String,
    /// Registered argument-modifier tag, e.g. a nil-propagating modifier
    /// that short-circuits the whole body on an absent argument.
    #[serde(default)]
    pub modifier: Option<String>,
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>) -> Self {
        ArgumentDef {
            name: name.into(),
            modifier: None,
        }
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }
}

/// An interpreted function: ordered arguments, ordered field mappings,
/// declared option toggles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default)]
    pub args: Vec<ArgumentDef>,
    /// Whether the body's frame resolves variables from the caller's frame.
    #[serde(default)]
    pub inherit_parent_vars: bool,
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
    /// Options enabled for the duration of the body.
    #[serde(default)]
    pub options: Vec<String>,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionDefinition {
            name: name.into(),
            args: Vec::new(),
            inherit_parent_vars: false,
            mappings: Vec::new(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<ArgumentDef>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_mappings(mut self, mappings: Vec<FieldMapping>) -> Self {
        self.mappings = mappings;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn inheriting_parent_vars(mut self) -> Self {
        self.inherit_parent_vars = true;
        self
    }
}
