//! Runtime values for the Whistle runtime.
//!
//! # Heap Enforcement
//!
//! All heap allocations go through factory methods on `Data`. The
//! [`Heap<T>`] wrapper type has a crate-private constructor, so external
//! code cannot create heap values directly:
//!
//! ```text
//! let s = Data::str("hello");              // OK
//! let c = Data::container(ContainerMap::new()); // OK
//! ```
//!
//! # Absence
//!
//! `Null`, empty containers, empty arrays, and zero-length datasets are
//! uniformly "absent" for merge-skip decisions; [`Data::is_empty_or_null`]
//! is the single authority for that judgement.

use std::fmt;

use indexmap::IndexMap;

use crate::closure::Closure;
use crate::dataset::Dataset;
use crate::heap::Heap;

/// Ordered field mapping backing a container value.
///
/// Insertion order is observable: iteration, merge key order, and
/// serialization all follow it.
pub type ContainerMap = IndexMap<String, Data>;

/// Capability tag of a value variant, used by overload distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataKind {
    Primitive,
    Container,
    Array,
    Dataset,
    Null,
    Closure,
}

impl DataKind {
    /// Lowercase name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            DataKind::Primitive => "primitive",
            DataKind::Container => "container",
            DataKind::Array => "array",
            DataKind::Dataset => "dataset",
            DataKind::Null => "null",
            DataKind::Closure => "closure",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A decorator around an inner value.
///
/// Wrappers transparently forward equality and emptiness to the value they
/// wrap while remaining visible to overload distance, which peels them one
/// layer at a time.
#[derive(Clone, Debug, PartialEq)]
pub struct Wrapped {
    tag: String,
    inner: Data,
}

impl Wrapped {
    pub fn new(tag: impl Into<String>, inner: Data) -> Self {
        Wrapped {
            tag: tag.into(),
            inner,
        }
    }

    /// Wrapper type tag, matched by `ParamType::Wrapper` signatures.
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The wrapped value (one layer in; may itself be wrapped).
    #[inline]
    pub fn inner(&self) -> &Data {
        &self.inner
    }
}

/// Runtime value in the Whistle runtime.
#[derive(Clone, Debug)]
pub enum Data {
    /// Singleton absent marker.
    Null,
    // Primitives (inline, no heap allocation)
    Bool(bool),
    Num(f64),
    /// String primitive.
    Str(Heap<String>),
    // Heap types
    /// Ordered mapping from field name to value.
    Container(Heap<ContainerMap>),
    /// Ordered sequence of values.
    Array(Heap<Vec<Data>>),
    /// Lazy/external sequence abstraction.
    Dataset(Dataset),
    /// Deferred, partially-applied function call.
    Closure(Heap<Closure>),
    /// Decorator forwarding to an inner value.
    Wrapped(Heap<Wrapped>),
}

// Factory methods (the only way to construct heap values)

impl Data {
    /// Create a numeric primitive.
    #[inline]
    pub fn num(n: f64) -> Self {
        Data::Num(n)
    }

    /// Create a string primitive.
    #[inline]
    pub fn str(s: impl Into<String>) -> Self {
        Data::Str(Heap::new(s.into()))
    }

    /// Create a container value.
    #[inline]
    pub fn container(entries: ContainerMap) -> Self {
        Data::Container(Heap::new(entries))
    }

    /// Create an empty container value.
    #[inline]
    pub fn empty_container() -> Self {
        Data::Container(Heap::new(ContainerMap::new()))
    }

    /// Create a container from ordered `(name, value)` entries.
    pub fn container_of(entries: impl IntoIterator<Item = (String, Data)>) -> Self {
        Data::Container(Heap::new(entries.into_iter().collect()))
    }

    /// Create an array value.
    #[inline]
    pub fn array(items: Vec<Data>) -> Self {
        Data::Array(Heap::new(items))
    }

    /// Create a closure value.
    #[inline]
    pub fn closure(closure: Closure) -> Self {
        Data::Closure(Heap::new(closure))
    }

    /// Wrap a value in a tagged decorator layer.
    #[inline]
    pub fn wrapped(tag: impl Into<String>, inner: Data) -> Self {
        Data::Wrapped(Heap::new(Wrapped::new(tag, inner)))
    }
}

// Inspection

impl Data {
    /// Capability tag of this value, looking through decorator layers.
    pub fn kind(&self) -> DataKind {
        match self.unwrap_all() {
            Data::Null => DataKind::Null,
            Data::Bool(_) | Data::Num(_) | Data::Str(_) => DataKind::Primitive,
            Data::Container(_) => DataKind::Container,
            Data::Array(_) => DataKind::Array,
            Data::Dataset(_) => DataKind::Dataset,
            Data::Closure(_) => DataKind::Closure,
            // unreachable after unwrap_all, but the match must be total
            Data::Wrapped(w) => w.inner().kind(),
        }
    }

    /// Peel exactly one decorator layer, if this value is wrapped.
    #[inline]
    pub fn unwrap_layer(&self) -> Option<&Data> {
        match self {
            Data::Wrapped(w) => Some(w.inner()),
            _ => None,
        }
    }

    /// The innermost non-wrapper value.
    pub fn unwrap_all(&self) -> &Data {
        let mut current = self;
        while let Some(inner) = current.unwrap_layer() {
            current = inner;
        }
        current
    }

    /// Decorator tag of the outermost layer, if any.
    #[inline]
    pub fn wrapper_tag(&self) -> Option<&str> {
        match self {
            Data::Wrapped(w) => Some(w.tag()),
            _ => None,
        }
    }

    /// Whether this value counts as absent for merge-skip decisions:
    /// null, an empty container, an empty array, or a zero-length dataset.
    /// Wrappers delegate to the value they wrap.
    pub fn is_empty_or_null(&self) -> bool {
        match self.unwrap_all() {
            Data::Null => true,
            Data::Container(map) => map.is_empty(),
            Data::Array(items) => items.is_empty(),
            Data::Dataset(ds) => ds.is_empty(),
            _ => false,
        }
    }

    /// Container entries, looking through decorator layers.
    pub fn as_container(&self) -> Option<&ContainerMap> {
        match self.unwrap_all() {
            Data::Container(map) => Some(map),
            _ => None,
        }
    }

    /// Array elements, looking through decorator layers.
    pub fn as_array(&self) -> Option<&Vec<Data>> {
        match self.unwrap_all() {
            Data::Array(items) => Some(items),
            _ => None,
        }
    }

    /// String content, looking through decorator layers.
    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_all() {
            Data::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric content, looking through decorator layers.
    pub fn as_num(&self) -> Option<f64> {
        match self.unwrap_all() {
            Data::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean content, looking through decorator layers.
    pub fn as_bool(&self) -> Option<bool> {
        match self.unwrap_all() {
            Data::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Closure content, looking through decorator layers.
    pub fn as_closure(&self) -> Option<&Closure> {
        match self.unwrap_all() {
            Data::Closure(c) => Some(c),
            _ => None,
        }
    }
}

/// Equality delegates through decorator layers on both sides: a wrapped
/// value equals whatever its innermost value equals.
impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        match (self.unwrap_all(), other.unwrap_all()) {
            (Data::Null, Data::Null) => true,
            (Data::Bool(a), Data::Bool(b)) => a == b,
            (Data::Num(a), Data::Num(b)) => a == b,
            (Data::Str(a), Data::Str(b)) => a == b,
            (Data::Container(a), Data::Container(b)) => a == b,
            (Data::Array(a), Data::Array(b)) => a == b,
            (Data::Dataset(a), Data::Dataset(b)) => a == b,
            (Data::Closure(a), Data::Closure(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Null => write!(f, "null"),
            Data::Bool(b) => write!(f, "{b}"),
            Data::Num(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{n:.0}")
                } else {
                    write!(f, "{n}")
                }
            }
            Data::Str(s) => write!(f, "{s:?}"),
            Data::Container(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                write!(f, "}}")
            }
            Data::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Data::Dataset(ds) => write!(f, "{ds}"),
            Data::Closure(c) => write!(f, "{}", &**c),
            Data::Wrapped(w) => write!(f, "{}", w.inner()),
        }
    }
}
