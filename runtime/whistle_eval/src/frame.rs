//! Stack frames for variable scoping.
//!
//! Frames form a parent-linked chain, one per function invocation. A frame
//! either inherits its parent's variables or is opaque to them; writes to
//! an inherited, already-bound name go through to the defining ancestor,
//! except for the output variable and freshly-declared names, which always
//! bind locally.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use whistle_data::Data;
use whistle_ir::OUTPUT_VAR;

/// A single-threaded shared handle to a stack frame.
///
/// Wraps `Rc<RefCell<StackFrame>>` so a frame can be both a context's top
/// and another frame's parent. Frame chains are owned by one invocation at
/// a time; `Rc` (not `Arc`) is intentional.
#[derive(Clone)]
pub struct SharedFrame(Rc<RefCell<StackFrame>>);

/// One lexical variable scope.
#[derive(Debug)]
pub struct StackFrame {
    /// Frame name for diagnostics and overflow reports.
    name: String,
    parent: Option<SharedFrame>,
    inherit_parent_vars: bool,
    vars: FxHashMap<String, Data>,
}

impl StackFrame {
    fn lookup_local(&self, name: &str) -> Option<Data> {
        self.vars.get(name).cloned()
    }

    fn has_local(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }
}

impl SharedFrame {
    /// Create a root frame with no parent.
    pub fn root(name: impl Into<String>) -> Self {
        SharedFrame(Rc::new(RefCell::new(StackFrame {
            name: name.into(),
            parent: None,
            inherit_parent_vars: false,
            vars: FxHashMap::default(),
        })))
    }

    /// Create a frame parented to `parent`.
    pub fn with_parent(name: impl Into<String>, parent: SharedFrame, inherit: bool) -> Self {
        SharedFrame(Rc::new(RefCell::new(StackFrame {
            name: name.into(),
            parent: Some(parent),
            inherit_parent_vars: inherit,
            vars: FxHashMap::default(),
        })))
    }

    /// Frame name.
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Whether this handle and `other` are the same frame.
    pub fn same_frame(&self, other: &SharedFrame) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Look up a variable.
    ///
    /// A non-inheriting frame only consults its own bindings; an inheriting
    /// frame walks up to the nearest ancestor with a local binding.
    pub fn lookup(&self, name: &str) -> Option<Data> {
        let frame = self.0.borrow();
        if let Some(value) = frame.lookup_local(name) {
            return Some(value);
        }
        if frame.inherit_parent_vars {
            if let Some(parent) = &frame.parent {
                return parent.lookup(name);
            }
        }
        None
    }

    /// Bind a variable in this frame only, shadowing any inherited binding.
    pub fn set_local(&self, name: impl Into<String>, value: Data) {
        self.0.borrow_mut().vars.insert(name.into(), value);
    }

    /// Write a variable following the scope-resolution rule: the output
    /// variable and fresh names bind locally; an inherited, already-bound
    /// name mutates the defining ancestor.
    pub fn set_var(&self, name: &str, value: Data) {
        if name != OUTPUT_VAR && !self.0.borrow().has_local(name) {
            if let Some(owner) = self.defining_ancestor(name) {
                owner.0.borrow_mut().vars.insert(name.to_string(), value);
                return;
            }
        }
        self.set_local(name, value);
    }

    /// The nearest frame (following inheritance edges, excluding `self`)
    /// holding a local binding for `name`.
    fn defining_ancestor(&self, name: &str) -> Option<SharedFrame> {
        let frame = self.0.borrow();
        if !frame.inherit_parent_vars {
            return None;
        }
        let mut current = frame.parent.clone()?;
        drop(frame);
        loop {
            let next = {
                let candidate = current.0.borrow();
                if candidate.has_local(name) {
                    return Some(current.clone());
                }
                if !candidate.inherit_parent_vars {
                    return None;
                }
                candidate.parent.clone()?
            };
            current = next;
        }
    }

    /// Names bound locally in this frame, sorted for determinism.
    pub fn local_vars(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().vars.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Local bindings as sorted `(name, value)` pairs.
    pub fn local_bindings(&self) -> Vec<(String, Data)> {
        let frame = self.0.borrow();
        let mut entries: Vec<(String, Data)> = frame
            .vars
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Whether this frame resolves variables from its parent.
    pub fn inherits_parent_vars(&self) -> bool {
        self.0.borrow().inherit_parent_vars
    }

    /// Parent frame handle, if any.
    pub fn parent(&self) -> Option<SharedFrame> {
        self.0.borrow().parent.clone()
    }

    /// Number of frames in the chain, this frame included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.parent();
        while let Some(frame) = current {
            depth += 1;
            current = frame.parent();
        }
        depth
    }

    /// Per-frame-name occurrence counts along the chain, most frequent
    /// first (ties broken by name). Feeds the stack-overflow report.
    pub fn frame_counts(&self) -> Vec<(String, usize)> {
        let mut counts: FxHashMap<String, usize> = FxHashMap::default();
        let mut current = Some(self.clone());
        while let Some(frame) = current {
            *counts.entry(frame.name()).or_insert(0) += 1;
            current = frame.parent();
        }
        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Frame names from this frame outward, for backtraces.
    pub fn chain_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(self.clone());
        while let Some(frame) = current {
            names.push(frame.name());
            current = frame.parent();
        }
        names
    }
}

impl fmt::Debug for SharedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0.borrow();
        f.debug_struct("SharedFrame")
            .field("name", &frame.name)
            .field("inherit_parent_vars", &frame.inherit_parent_vars)
            .field("vars", &frame.vars)
            .field("depth", &self.depth())
            .finish()
    }
}
