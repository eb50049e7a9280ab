//! Package contexts for unqualified symbol lookup.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// The set of namespaces visible during one function's execution.
///
/// Immutable value object, created once per function definition at
/// registration time. A callable may install a replacement for the
/// duration of its own body when its declaring file's packages differ
/// from its caller's.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageContext {
    current: String,
    globally_aliased: FxHashSet<String>,
    /// Provenance of the defining import, for diagnostics.
    import_path: String,
}

impl PackageContext {
    /// A context whose only visible package is `current`.
    pub fn new(current: impl Into<String>) -> Self {
        let current = current.into();
        let mut globally_aliased = FxHashSet::default();
        globally_aliased.insert(current.clone());
        PackageContext {
            current,
            globally_aliased,
            import_path: String::new(),
        }
    }

    /// Add globally-aliased packages visible for unqualified lookups.
    #[must_use]
    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = String>) -> Self {
        self.globally_aliased.extend(aliases);
        self
    }

    /// Record the import path this context was created from.
    #[must_use]
    pub fn with_import_path(mut self, path: impl Into<String>) -> Self {
        self.import_path = path.into();
        self
    }

    /// The current package name.
    #[inline]
    pub fn current_package(&self) -> &str {
        &self.current
    }

    /// Import-path provenance (empty when unknown).
    #[inline]
    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    /// Whether `package` is visible for unqualified lookups.
    pub fn is_visible(&self, package: &str) -> bool {
        self.globally_aliased.contains(package)
    }

    /// All visible package names, sorted for deterministic lookups.
    pub fn visible_packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = self.globally_aliased.iter().cloned().collect();
        packages.sort_unstable();
        packages
    }
}
