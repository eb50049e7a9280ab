//! Execution metadata side-channels.
//!
//! Every top-level execution owns one [`MetaData`]: a serializable map of
//! plain data (survives context serialization) and a transient map of
//! arbitrary process-local state (e.g. the side-output stack). Derived
//! child contexts share the same underlying maps through [`SharedMeta`] —
//! the maps are aliased, not copied, so writes are visible in both
//! directions. The single-threaded execution contract makes the `Rc`
//! sharing safe; a context never crosses threads.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use whistle_data::Data;

/// The two metadata maps of one execution.
#[derive(Default)]
pub struct MetaData {
    serializable: FxHashMap<String, Data>,
    transient: FxHashMap<String, Box<dyn Any>>,
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut transient_keys: Vec<&String> = self.transient.keys().collect();
        transient_keys.sort_unstable();
        f.debug_struct("MetaData")
            .field("serializable", &self.serializable)
            .field("transient_keys", &transient_keys)
            .finish()
    }
}

/// Shared handle to a [`MetaData`], aliased across derived contexts.
#[derive(Clone, Debug, Default)]
pub struct SharedMeta(Rc<RefCell<MetaData>>);

impl SharedMeta {
    pub fn new() -> Self {
        SharedMeta::default()
    }

    /// Read a serializable metadata entry.
    pub fn get_meta(&self, key: &str) -> Option<Data> {
        self.0.borrow().serializable.get(key).cloned()
    }

    /// Write a serializable metadata entry.
    pub fn set_meta(&self, key: impl Into<String>, value: Data) {
        self.0.borrow_mut().serializable.insert(key.into(), value);
    }

    /// Snapshot the serializable map as a container, keys sorted.
    pub fn serializable_snapshot(&self) -> Data {
        let meta = self.0.borrow();
        let mut entries: Vec<(String, Data)> = meta
            .serializable
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        Data::container_of(entries)
    }

    /// Replace the serializable map wholesale (snapshot restore).
    pub fn restore_serializable(&self, entries: impl IntoIterator<Item = (String, Data)>) {
        let mut meta = self.0.borrow_mut();
        meta.serializable = entries.into_iter().collect();
    }

    /// Access a typed transient entry, creating it with `init` when absent.
    ///
    /// The closure form keeps the interior borrow scoped; transient entries
    /// never escape as references.
    pub fn transient_mut<T: 'static, R>(
        &self,
        key: &str,
        init: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut meta = self.0.borrow_mut();
        let slot = meta
            .transient
            .entry(key.to_string())
            .or_insert_with(|| Box::new(init()));
        slot.downcast_mut::<T>().map(f)
    }

    /// Read a typed transient entry without creating it.
    pub fn transient<T: 'static, R>(&self, key: &str, f: impl FnOnce(&T) -> R) -> Option<R> {
        let meta = self.0.borrow();
        meta.transient
            .get(key)
            .and_then(|slot| slot.downcast_ref::<T>())
            .map(f)
    }
}
