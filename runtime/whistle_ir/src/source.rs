//! Value-source expressions.
//!
//! A [`ValueSource`] is the right-hand side of a field mapping or a function
//! argument: a constant, a variable read, a free-parameter placeholder, or a
//! nested function call (possibly deferred into a closure).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Package scope of a function-call or target lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageRef {
    /// Search every registered package.
    Wildcard,
    /// Search exactly the named packages (one package plus its aliases).
    Named(Vec<String>),
}

impl PackageRef {
    /// A reference to a single named package.
    pub fn named(package: impl Into<String>) -> Self {
        PackageRef::Named(vec![package.into()])
    }

    /// Returns `true` for the wildcard scope.
    #[inline]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, PackageRef::Wildcard)
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageRef::Wildcard => write!(f, "*"),
            PackageRef::Named(packages) => write!(f, "{}", packages.join("|")),
        }
    }
}

/// A function-call descriptor: package scope, symbol name, and argument
/// expressions.
///
/// With `build_closure` set, evaluation constructs a closure value instead
/// of invoking the function: non-free argument expressions are evaluated
/// eagerly, free-parameter expressions become unbound slots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub package: PackageRef,
    pub name: String,
    pub args: Vec<ValueSource>,
    #[serde(default)]
    pub build_closure: bool,
}

impl FunctionCall {
    /// Convenience constructor for an eager call.
    pub fn new(package: PackageRef, name: impl Into<String>, args: Vec<ValueSource>) -> Self {
        FunctionCall {
            package,
            name: name.into(),
            args,
            build_closure: false,
        }
    }

    /// Mark this call as closure construction instead of invocation.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.build_closure = true;
        self
    }
}

/// The value expression of a field mapping or call argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValueSource {
    ConstString(String),
    ConstInt(i64),
    ConstFloat(f64),
    ConstBool(bool),
    /// Read a variable from the current top stack frame.
    FromLocal { name: String },
    /// Unbound placeholder; only valid inside a deferred (closure-building)
    /// call. Direct evaluation is an error.
    FreeParameter { name: String },
    Call(FunctionCall),
}

impl ValueSource {
    /// Shorthand for a local-variable read.
    pub fn local(name: impl Into<String>) -> Self {
        ValueSource::FromLocal { name: name.into() }
    }

    /// Shorthand for a free-parameter placeholder.
    pub fn free(name: impl Into<String>) -> Self {
        ValueSource::FreeParameter { name: name.into() }
    }
}
