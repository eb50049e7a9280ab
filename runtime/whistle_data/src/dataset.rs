//! Lazy/external sequence abstraction.
//!
//! A [`Dataset`] stands for a sequence whose elements may live outside the
//! value graph (a bulk source, a streamed result). The runtime only needs
//! ordered iteration and an optional size; everything else is up to the
//! source implementation. Two datasets are equal only when they are the
//! same source (identity equality).

use std::fmt;
use std::sync::Arc;

use crate::heap::Heap;
use crate::value::Data;

/// Backing source of a dataset.
pub trait DatasetSource: fmt::Debug + Send + Sync {
    /// Number of elements, when known without forcing the source.
    fn size_hint(&self) -> Option<usize> {
        None
    }

    /// Ordered iteration over the elements.
    fn items(&self) -> Box<dyn Iterator<Item = Data> + '_>;
}

/// Shared handle to a dataset source.
#[derive(Clone)]
pub struct Dataset(Heap<dyn DatasetSource>);

impl Dataset {
    pub fn new(source: impl DatasetSource + 'static) -> Self {
        Dataset(Heap::from_arc(Arc::new(source)))
    }

    /// Number of elements, when the source knows it.
    #[inline]
    pub fn size_hint(&self) -> Option<usize> {
        self.0.size_hint()
    }

    /// Whether the source reports zero elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size_hint() == Some(0)
    }

    /// Ordered iteration over the elements.
    pub fn items(&self) -> Box<dyn Iterator<Item = Data> + '_> {
        self.0.items()
    }

    /// Force the source into a concrete vector.
    pub fn materialize(&self) -> Vec<Data> {
        self.items().collect()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dataset({:?})", &*self.0)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size_hint() {
            Some(n) => write!(f, "<dataset of {n}>"),
            None => write!(f, "<dataset>"),
        }
    }
}

impl PartialEq for Dataset {
    /// Identity equality: the same source, not equal contents.
    fn eq(&self, other: &Self) -> bool {
        Heap::ptr_eq(&self.0, &other.0)
    }
}

/// A dataset over an in-memory vector, used where a materialized sequence
/// must flow through dataset-shaped interfaces (and by tests).
#[derive(Debug)]
pub struct VecDataset(Vec<Data>);

impl VecDataset {
    pub fn new(items: Vec<Data>) -> Self {
        VecDataset(items)
    }
}

impl DatasetSource for VecDataset {
    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }

    fn items(&self) -> Box<dyn Iterator<Item = Data> + '_> {
        Box::new(self.0.iter().cloned())
    }
}
