//! Runtime options.
//!
//! Options are registered like any other capability and toggled per
//! context. A function definition may declare options active for the
//! duration of its body; because every call derives a child context with
//! its own enabled-set copy, the caller's state is untouched on all exit
//! paths.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Option gating explicitly named merge modes on field mappings.
pub const MERGE_MODES_EXPERIMENT: &str = "experiment/merge_modes";

/// A registered option descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDef {
    pub name: String,
    /// Experimental options guard behavior that may change.
    pub experimental: bool,
    pub description: String,
}

impl OptionDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        OptionDef {
            name: name.into(),
            experimental: false,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }
}

/// The set of options enabled on one context.
///
/// A shared handle: clones alias the same set, while [`EnabledOptions::derive`]
/// copies the contents into a fresh handle for a child context.
#[derive(Clone, Debug, Default)]
pub struct EnabledOptions(Rc<RefCell<FxHashSet<String>>>);

impl EnabledOptions {
    pub fn new() -> Self {
        EnabledOptions::default()
    }

    /// Build from an initial set of enabled names.
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        EnabledOptions(Rc::new(RefCell::new(names.into_iter().collect())))
    }

    /// Enable an option on this context.
    pub fn enable(&self, name: impl Into<String>) {
        self.0.borrow_mut().insert(name.into());
    }

    /// Disable an option; returns whether it was enabled.
    pub fn disable(&self, name: &str) -> bool {
        self.0.borrow_mut().remove(name)
    }

    /// Whether an option is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.borrow().contains(name)
    }

    /// Fresh handle with copied contents, for a derived child context.
    #[must_use]
    pub fn derive(&self) -> Self {
        EnabledOptions(Rc::new(RefCell::new(self.0.borrow().clone())))
    }

    /// Enabled option names, sorted (snapshot order).
    pub fn snapshot(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().iter().cloned().collect();
        names.sort_unstable();
        names
    }
}
