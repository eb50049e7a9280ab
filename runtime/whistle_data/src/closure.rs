//! Deferred function calls with free-parameter currying.
//!
//! A closure records the call target plus an ordered argument list in which
//! each slot is either a bound value or a named free-parameter placeholder.
//! Closures are persistent: binding fills the lowest free slot in a new
//! closure and never mutates the original, so multiple partially-applied
//! variants stay independently valid.

use std::fmt;

use serde::{Deserialize, Serialize};
use whistle_ir::PackageRef;

use crate::value::Data;

/// One argument slot of a closure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClosureArg {
    /// Already-evaluated argument value.
    Bound(Data),
    /// Named unbound placeholder, filled later by currying.
    Free(String),
}

/// A deferred, partially-applied function call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    package: PackageRef,
    name: String,
    args: Vec<ClosureArg>,
}

impl Closure {
    pub fn new(package: PackageRef, name: impl Into<String>, args: Vec<ClosureArg>) -> Self {
        Closure {
            package,
            name: name.into(),
            args,
        }
    }

    /// Package scope the call will be resolved in.
    #[inline]
    pub fn package(&self) -> &PackageRef {
        &self.package
    }

    /// Target function name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All argument slots in call order.
    #[inline]
    pub fn args(&self) -> &[ClosureArg] {
        &self.args
    }

    /// Names of the still-free slots, in slot order.
    pub fn free_names(&self) -> Vec<&str> {
        self.args
            .iter()
            .filter_map(|arg| match arg {
                ClosureArg::Free(name) => Some(name.as_str()),
                ClosureArg::Bound(_) => None,
            })
            .collect()
    }

    /// Number of still-free slots.
    pub fn num_free(&self) -> usize {
        self.args
            .iter()
            .filter(|arg| matches!(arg, ClosureArg::Free(_)))
            .count()
    }

    /// Fill the lowest-indexed free slot with `value`, returning a new
    /// closure. Returns `None` when no free slot remains.
    #[must_use]
    pub fn bind_next_free(&self, value: Data) -> Option<Closure> {
        let index = self
            .args
            .iter()
            .position(|arg| matches!(arg, ClosureArg::Free(_)))?;
        let mut args = self.args.clone();
        args[index] = ClosureArg::Bound(value);
        Some(Closure {
            package: self.package.clone(),
            name: self.name.clone(),
            args,
        })
    }

    /// The fully-bound argument values, or `None` while free slots remain.
    pub fn bound_args(&self) -> Option<Vec<Data>> {
        self.args
            .iter()
            .map(|arg| match arg {
                ClosureArg::Bound(value) => Some(value.clone()),
                ClosureArg::Free(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<closure {}::{}/{} free>",
            self.package,
            self.name,
            self.num_free()
        )
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Closure {
        Closure::new(
            PackageRef::named("core"),
            "concat",
            vec![
                ClosureArg::Free("a".to_string()),
                ClosureArg::Bound(Data::str("mid")),
                ClosureArg::Free("b".to_string()),
            ],
        )
    }

    #[test]
    fn bind_fills_lowest_free_slot() {
        let closure = sample();
        let bound = closure.bind_next_free(Data::num(1.0)).unwrap();
        assert_eq!(bound.num_free(), 1);
        assert_eq!(bound.free_names(), vec!["b"]);
        assert_eq!(
            bound.args()[0],
            ClosureArg::Bound(Data::num(1.0)),
            "lowest-indexed free slot is filled first"
        );
    }

    #[test]
    fn bind_does_not_mutate_original() {
        let closure = sample();
        let _bound = closure.bind_next_free(Data::num(1.0));
        assert_eq!(closure.num_free(), 2, "original closure is untouched");
    }

    #[test]
    fn bound_args_requires_all_slots_filled() {
        let closure = sample();
        assert_eq!(closure.bound_args(), None);

        let full = closure
            .bind_next_free(Data::num(1.0))
            .and_then(|c| c.bind_next_free(Data::num(2.0)));
        let args = full.and_then(|c| c.bound_args());
        assert_eq!(
            args,
            Some(vec![Data::num(1.0), Data::str("mid"), Data::num(2.0)])
        );
    }

    #[test]
    fn bind_on_saturated_closure_returns_none() {
        let closure = Closure::new(PackageRef::Wildcard, "f", vec![]);
        assert!(closure.bind_next_free(Data::Null).is_none());
    }
}
