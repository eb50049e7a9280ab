//! Error types for the runtime core.
//!
//! # Structured Error Categories
//!
//! [`EvalErrorKind`] provides typed error categories so callers can match
//! on the failure mode instead of parsing strings: no-candidates,
//! no-matching-overload, and ambiguous-overload are deliberately distinct
//! kinds. Factory functions (e.g. [`not_iterable`]) are the public
//! construction API — they populate both `kind` and `message`.

use std::fmt;

use whistle_data::PathParseError;

/// Result of evaluation.
pub type EvalResult<T = whistle_data::Data> = Result<T, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalErrorKind {
    // Configuration/arity
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
        /// Declared names of the arguments the call did not supply.
        missing: Vec<String>,
    },

    // Overload resolution
    /// No callable of this name is registered in the searched packages.
    NoCandidates {
        name: String,
        packages: String,
        suggestions: Vec<String>,
    },
    /// Candidates existed but none matched the actual argument values.
    NoMatchingOverload {
        name: String,
        arg_kinds: Vec<String>,
        suggestions: Vec<String>,
    },
    /// Multiple candidates tied at the minimum distance.
    AmbiguousOverload {
        name: String,
        candidates: Vec<String>,
    },

    // Mapping/merge
    NotIterable {
        kind: String,
    },
    UnsupportedOperation {
        operation: String,
        required: String,
    },
    /// More than one target constructor is registered under one name.
    OverloadedTarget {
        name: String,
        count: usize,
    },

    // Frames
    StackOverflow {
        limit: usize,
        /// Per-frame-name occurrence counts, most frequent first.
        frames: Vec<(String, usize)>,
    },

    // Cancellation checkpoint
    Cancelled {
        reason: String,
    },

    // Closures and free parameters
    FreeParameterEval {
        name: String,
    },
    UnboundClosure {
        function: String,
        free: Vec<String>,
    },

    // Registry lookups
    UnknownModifier {
        name: String,
    },
    UnknownOption {
        name: String,
    },

    // Paths
    InvalidPath {
        text: String,
        reason: String,
    },

    /// Catch-all for errors without a structured kind.
    Custom {
        message: String,
    },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArityMismatch {
                function,
                expected,
                got,
                missing,
            } => {
                let arg_word = if *expected == 1 { "argument" } else { "arguments" };
                write!(f, "{function} expects {expected} {arg_word}, got {got}")?;
                if missing.is_empty() {
                    write!(f, " ({} excess)", got.saturating_sub(*expected))
                } else {
                    write!(f, " (missing: {})", missing.join(", "))
                }
            }
            Self::NoCandidates {
                name,
                packages,
                suggestions,
            } => {
                write!(f, "no function named {name} in package(s) {packages}")?;
                write_suggestions(f, suggestions)
            }
            Self::NoMatchingOverload {
                name,
                arg_kinds,
                suggestions,
            } => {
                write!(
                    f,
                    "no overload of {name} matches arguments ({})",
                    arg_kinds.join(", ")
                )?;
                write_suggestions(f, suggestions)
            }
            Self::AmbiguousOverload { name, candidates } => {
                write!(
                    f,
                    "ambiguous call to {name}; equally close overloads: {}",
                    candidates.join("; ")
                )
            }
            Self::NotIterable { kind } => {
                write!(f, "cannot iterate over {kind}; expected container, array, or dataset")
            }
            Self::UnsupportedOperation { operation, required } => {
                write!(f, "{operation} is unsupported; requires {required}")
            }
            Self::OverloadedTarget { name, count } => {
                write!(f, "target {name} has {count} registered constructors; overloaded targets are not supported")
            }
            Self::StackOverflow { limit, frames } => {
                write!(f, "stack frame limit exceeded (limit: {limit}); frames: ")?;
                for (i, (name, count)) in frames.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} ({count})")?;
                }
                Ok(())
            }
            Self::Cancelled { reason } => write!(f, "execution cancelled: {reason}"),
            Self::FreeParameterEval { name } => {
                write!(f, "cannot evaluate unbound free parameter {name}")
            }
            Self::UnboundClosure { function, free } => {
                write!(
                    f,
                    "cannot execute closure over {function} with unbound parameters: {}",
                    free.join(", ")
                )
            }
            Self::UnknownModifier { name } => write!(f, "unknown argument modifier: {name}"),
            Self::UnknownOption { name } => write!(f, "unknown option: {name}"),
            Self::InvalidPath { text, reason } => write!(f, "invalid path `{text}`: {reason}"),
            Self::Custom { message } => write!(f, "{message}"),
        }
    }
}

fn write_suggestions(f: &mut fmt::Formatter<'_>, suggestions: &[String]) -> fmt::Result {
    if suggestions.is_empty() {
        return Ok(());
    }
    write!(f, "; did you mean {}?", suggestions.join(" or "))
}

/// Additional context note attached to an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalNote {
    pub message: String,
}

impl EvalNote {
    pub fn new(message: impl Into<String>) -> Self {
        EvalNote {
            message: message.into(),
        }
    }
}

/// Immutable snapshot of the frame chain at an error site, innermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<String>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<String>) -> Self {
        EvalBacktrace { frames }
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "call backtrace:")?;
        for (i, name) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {name}")?;
        }
        Ok(())
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalError {
    /// Structured error category.
    pub kind: EvalErrorKind,
    /// Human-readable message (equals `kind.to_string()` for factory-made
    /// errors).
    pub message: String,
    /// Secondary context notes.
    pub notes: Vec<EvalNote>,
    /// Frame-chain backtrace captured at the error site.
    pub backtrace: Option<EvalBacktrace>,
}

impl EvalError {
    /// Create an error with just a message (`Custom` kind). Prefer a
    /// specific factory when a structured kind exists.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        EvalError {
            kind: EvalErrorKind::Custom {
                message: message.clone(),
            },
            message,
            notes: Vec::new(),
            backtrace: None,
        }
    }

    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        EvalError {
            kind,
            message,
            notes: Vec::new(),
            backtrace: None,
        }
    }

    /// Attach a context note.
    #[must_use]
    pub fn with_note(mut self, message: impl Into<String>) -> Self {
        self.notes.push(EvalNote::new(message));
        self
    }

    /// Attach a backtrace if none is present yet (the innermost site wins).
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        if self.backtrace.is_none() && !backtrace.is_empty() {
            self.backtrace = Some(backtrace);
        }
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for note in &self.notes {
            write!(f, "\nnote: {}", note.message)?;
        }
        if let Some(backtrace) = &self.backtrace {
            write!(f, "\n{backtrace}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

impl From<PathParseError> for EvalError {
    fn from(err: PathParseError) -> Self {
        invalid_path(err.text(), err.to_string())
    }
}

// Factory functions

pub fn arity_mismatch(
    function: impl Into<String>,
    expected: usize,
    got: usize,
    missing: Vec<String>,
) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        function: function.into(),
        expected,
        got,
        missing,
    })
}

pub fn no_candidates(
    name: impl Into<String>,
    packages: impl Into<String>,
    suggestions: Vec<String>,
) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoCandidates {
        name: name.into(),
        packages: packages.into(),
        suggestions,
    })
}

pub fn no_matching_overload(
    name: impl Into<String>,
    arg_kinds: Vec<String>,
    suggestions: Vec<String>,
) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NoMatchingOverload {
        name: name.into(),
        arg_kinds,
        suggestions,
    })
}

pub fn ambiguous_overload(name: impl Into<String>, candidates: Vec<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::AmbiguousOverload {
        name: name.into(),
        candidates,
    })
}

pub fn not_iterable(kind: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotIterable { kind: kind.into() })
}

pub fn unsupported_operation(
    operation: impl Into<String>,
    required: impl Into<String>,
) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnsupportedOperation {
        operation: operation.into(),
        required: required.into(),
    })
}

pub fn overloaded_target(name: impl Into<String>, count: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::OverloadedTarget {
        name: name.into(),
        count,
    })
}

pub fn stack_overflow(limit: usize, frames: Vec<(String, usize)>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { limit, frames })
}

pub fn cancelled(reason: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Cancelled {
        reason: reason.into(),
    })
}

pub fn cannot_evaluate_free_parameter(name: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::FreeParameterEval { name: name.into() })
}

pub fn unbound_closure(function: impl Into<String>, free: Vec<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnboundClosure {
        function: function.into(),
        free,
    })
}

pub fn unknown_modifier(name: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownModifier { name: name.into() })
}

pub fn unknown_option(name: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownOption { name: name.into() })
}

pub fn invalid_path(text: impl Into<String>, reason: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidPath {
        text: text.into(),
        reason: reason.into(),
    })
}
