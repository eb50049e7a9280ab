//! Per-capability lookup tables.
//!
//! One registry exists per capability (functions, targets, loaders,
//! parsers, argument modifiers, options), each mapping package name →
//! symbol name → overload set. Registries are populated at initialization
//! time (by the out-of-scope import machinery, or by the engine builder)
//! and read-only during execution: the [`Registries`] handle shares one
//! immutable [`RegistrySet`] by reference.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use whistle_data::Data;
use whistle_ir::PackageRef;

use crate::errors::EvalResult;
use crate::function::{ArgModifier, Callable};
use crate::options::OptionDef;
use crate::target::TargetConstructor;

/// Thread-safe shared registry wrapper (immutable after creation).
pub struct SharedRegistry<T>(Arc<T>);

impl<T> SharedRegistry<T> {
    /// Create a new shared registry from an owned registry.
    pub fn new(registry: T) -> Self {
        SharedRegistry(Arc::new(registry))
    }
}

impl<T> Clone for SharedRegistry<T> {
    fn clone(&self) -> Self {
        SharedRegistry(Arc::clone(&self.0))
    }
}

impl<T> Deref for SharedRegistry<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedRegistry({:?})", &*self.0)
    }
}

/// A lookup table keyed by package name and symbol name, holding a set of
/// overloads per symbol.
pub struct PackageRegistry<T> {
    entries: FxHashMap<String, FxHashMap<String, Vec<T>>>,
}

impl<T> Default for PackageRegistry<T> {
    fn default() -> Self {
        PackageRegistry {
            entries: FxHashMap::default(),
        }
    }
}

impl<T: Clone> PackageRegistry<T> {
    /// Register one overload of `name` under `package`.
    pub fn register(&mut self, package: &str, name: &str, item: T) {
        self.entries
            .entry(package.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
            .push(item);
    }

    /// Look up all overloads of `name` visible in `scope`.
    ///
    /// The wildcard scope searches every registered package in sorted
    /// package order, so candidate order is deterministic.
    pub fn lookup(&self, scope: &PackageRef, name: &str) -> Vec<T> {
        match scope {
            PackageRef::Wildcard => {
                let mut packages: Vec<&String> = self.entries.keys().collect();
                packages.sort_unstable();
                packages
                    .into_iter()
                    .flat_map(|package| self.overloads(package, name))
                    .cloned()
                    .collect()
            }
            PackageRef::Named(packages) => self.lookup_in(packages, name),
        }
    }

    /// Look up all overloads of `name` in exactly the given packages, in
    /// the order given.
    pub fn lookup_in(&self, packages: &[String], name: &str) -> Vec<T> {
        packages
            .iter()
            .flat_map(|package| self.overloads(package, name))
            .cloned()
            .collect()
    }

    fn overloads(&self, package: &str, name: &str) -> std::slice::Iter<'_, T> {
        self.entries
            .get(package)
            .and_then(|symbols| symbols.get(name))
            .map(|items| items.iter())
            .unwrap_or_default()
    }

    /// Whether any package registers `name`.
    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.values().any(|symbols| symbols.contains_key(name))
    }

    /// All `(package, symbol)` pairs, sorted. Feeds "did you mean"
    /// suggestion lists.
    pub fn symbol_names(&self) -> Vec<(String, String)> {
        let mut names: Vec<(String, String)> = self
            .entries
            .iter()
            .flat_map(|(package, symbols)| {
                symbols
                    .keys()
                    .map(|name| (package.clone(), name.clone()))
            })
            .collect();
        names.sort_unstable();
        names
    }
}

impl<T> fmt::Debug for PackageRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut packages: Vec<(&String, usize)> = self
            .entries
            .iter()
            .map(|(package, symbols)| (package, symbols.len()))
            .collect();
        packages.sort_unstable();
        f.debug_map().entries(packages).finish()
    }
}

/// Loads raw bytes for an import path. Implementations are registered by
/// the (out-of-scope) import machinery.
pub trait Loader: Send + Sync {
    fn name(&self) -> &str;
    fn load(&self, path: &str) -> EvalResult<Vec<u8>>;
}

/// Parses loaded bytes into data. Implementations are registered by the
/// (out-of-scope) import machinery.
pub trait Parser: Send + Sync {
    fn name(&self) -> &str;
    /// Whether this parser claims the given import path.
    fn can_parse(&self, path: &str) -> bool;
    fn parse(&self, bytes: &[u8]) -> EvalResult<Data>;
}

/// The full set of capability registries.
#[derive(Default)]
pub struct RegistrySet {
    pub functions: PackageRegistry<Arc<dyn Callable>>,
    pub targets: PackageRegistry<Arc<dyn TargetConstructor>>,
    pub arg_modifiers: PackageRegistry<Arc<dyn ArgModifier>>,
    pub loaders: PackageRegistry<Arc<dyn Loader>>,
    pub parsers: PackageRegistry<Arc<dyn Parser>>,
    pub options: PackageRegistry<OptionDef>,
}

impl fmt::Debug for RegistrySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySet")
            .field("functions", &self.functions)
            .field("targets", &self.targets)
            .field("arg_modifiers", &self.arg_modifiers)
            .field("loaders", &self.loaders)
            .field("parsers", &self.parsers)
            .field("options", &self.options)
            .finish()
    }
}

/// Shared, read-only handle to a [`RegistrySet`].
///
/// Cloning shares the same underlying set; contexts derived from one
/// another always see identical registries.
#[derive(Clone, Debug)]
pub struct Registries(SharedRegistry<RegistrySet>);

impl Registries {
    /// Freeze an owned registry set into a shared read-only handle.
    pub fn new(set: RegistrySet) -> Self {
        Registries(SharedRegistry::new(set))
    }
}

impl Deref for Registries {
    type Target = RegistrySet;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
