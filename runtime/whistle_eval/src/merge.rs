//! Merge-mode semantics.
//!
//! [`apply`] combines an incoming value with the existing value at a
//! target path according to the mapping's merge mode. The value-level
//! rules live in [`merge_values`] / [`extend_values`] and treat null,
//! empty containers, and empty arrays uniformly as absent.

use whistle_data::{Data, DataKind, Path};
use whistle_ir::MergeMode;

use crate::errors::{unsupported_operation, EvalResult};

/// Merge `incoming` into `existing` at `path` under `mode`, returning the
/// new whole value.
pub fn apply(mode: MergeMode, existing: Data, path: &Path, incoming: Data) -> EvalResult<Data> {
    match mode {
        MergeMode::Replace => Ok(path.set(existing, incoming)),
        MergeMode::Merge => {
            let current = path.get(&existing);
            let merged = merge_values(current, incoming);
            Ok(path.set(existing, merged))
        }
        MergeMode::Append => {
            let current = path.get(&existing);
            let appended = append_value(current, incoming)?;
            Ok(path.set(existing, appended))
        }
        MergeMode::Extend => {
            let current = path.get(&existing);
            let extended = extend_values(current, incoming);
            Ok(path.set(existing, extended))
        }
    }
}

/// MERGE-mode combination of two values.
///
/// - an absent side yields the other (`merge(X, null) == X`,
///   `merge(null, Y) == Y`)
/// - two containers merge key-by-key: conflicting keys take the incoming
///   value, recursing only when both sides hold containers
/// - two arrays concatenate, existing elements first
/// - primitives and kind mismatches take the incoming value
pub fn merge_values(existing: Data, incoming: Data) -> Data {
    if existing.is_empty_or_null() {
        return incoming;
    }
    if incoming.is_empty_or_null() {
        return existing;
    }
    match (existing.unwrap_all(), incoming.unwrap_all()) {
        (Data::Container(old), Data::Container(new)) => {
            let mut merged = (**old).clone();
            for (key, new_value) in new.iter() {
                let combined = match merged.get(key) {
                    Some(old_value)
                        if old_value.kind() == DataKind::Container
                            && new_value.kind() == DataKind::Container =>
                    {
                        merge_values(old_value.clone(), new_value.clone())
                    }
                    _ => new_value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            Data::container(merged)
        }
        (Data::Array(old), Data::Array(new)) => {
            let mut items = (**old).clone();
            items.extend(new.iter().cloned());
            Data::array(items)
        }
        _ => incoming,
    }
}

/// APPEND-mode combination: the existing value must be absent or an array;
/// the incoming value becomes its last element.
fn append_value(existing: Data, incoming: Data) -> EvalResult<Data> {
    if existing.is_empty_or_null() {
        return Ok(Data::array(vec![incoming]));
    }
    match existing.unwrap_all() {
        Data::Array(items) => {
            let mut items = (**items).clone();
            items.push(incoming);
            Ok(Data::array(items))
        }
        other => Err(unsupported_operation(
            format!("appending onto {}", other.kind()),
            "an absent or array target value",
        )),
    }
}

/// EXTEND-mode combination: arrays concatenate; containers take only keys
/// absent from the existing side (existing keys are never overwritten).
pub fn extend_values(existing: Data, incoming: Data) -> Data {
    if existing.is_empty_or_null() {
        return incoming;
    }
    if incoming.is_empty_or_null() {
        return existing;
    }
    match (existing.unwrap_all(), incoming.unwrap_all()) {
        (Data::Container(old), Data::Container(new)) => {
            let mut extended = (**old).clone();
            for (key, value) in new.iter() {
                if !extended.contains_key(key) {
                    extended.insert(key.clone(), value.clone());
                }
            }
            Data::container(extended)
        }
        (Data::Array(old), Data::Array(new)) => {
            let mut items = (**old).clone();
            items.extend(new.iter().cloned());
            Data::array(items)
        }
        _ => existing,
    }
}
