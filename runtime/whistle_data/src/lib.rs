//! Whistle Data - polymorphic value model for the Whistle runtime.
//!
//! # Architecture
//!
//! - [`Data`]: the closed tagged union of runtime values (primitives,
//!   containers, arrays, datasets, null, closures, decorator wrappers)
//! - [`Heap`]: the crate-enforced shared-allocation wrapper
//! - [`Path`]: dotted/indexed navigation with copy-on-write writes
//! - [`Closure`]: deferred calls with free-parameter currying
//! - [`Dataset`]/[`DatasetSource`]: lazy/external sequences
//!
//! Evaluation lives in `whistle_eval`; this crate holds only the data
//! model and the operations it owes to itself (equality, emptiness,
//! navigation, serialization).

mod closure;
mod dataset;
mod heap;
mod path;
mod ser;
mod value;

pub use closure::{Closure, ClosureArg};
pub use dataset::{Dataset, DatasetSource, VecDataset};
pub use heap::Heap;
pub use path::{Path, PathParseError, PathSegment};
pub use value::{ContainerMap, Data, DataKind, Wrapped};
