//! Serde support for [`Data`].
//!
//! Values serialize into plain structured form: primitives as themselves
//! (whole numbers as integers), containers as maps in field order, arrays
//! as sequences. Decorator layers serialize as the value they wrap and
//! datasets as their materialized elements; closures have no data form and
//! serialize as null. Deserialization therefore reconstructs only the
//! plain-data subset.

use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Deserializer};

use crate::value::{ContainerMap, Data};

/// Largest magnitude below which every whole `f64` is an exact integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Serialize for Data {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Data::Null | Data::Closure(_) => serializer.serialize_unit(),
            Data::Bool(b) => serializer.serialize_bool(*b),
            Data::Num(n) => serialize_num(serializer, *n),
            Data::Str(s) => serializer.serialize_str(s),
            Data::Container(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    state.serialize_entry(key, value)?;
                }
                state.end()
            }
            Data::Array(items) => {
                let mut state = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    state.serialize_element(item)?;
                }
                state.end()
            }
            Data::Dataset(ds) => {
                let items = ds.materialize();
                let mut state = serializer.serialize_seq(Some(items.len()))?;
                for item in &items {
                    state.serialize_element(item)?;
                }
                state.end()
            }
            Data::Wrapped(w) => w.inner().serialize(serializer),
        }
    }
}

/// Whole numbers inside the exact-integer range serialize as integers.
#[expect(
    clippy::cast_possible_truncation,
    reason = "whole-number and range checks guard the cast"
)]
fn serialize_num<S: Serializer>(serializer: S, n: f64) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

struct DataVisitor;

impl<'de> Visitor<'de> for DataVisitor {
    type Value = Data;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a null, boolean, number, string, sequence, or map")
    }

    fn visit_unit<E>(self) -> Result<Data, E> {
        Ok(Data::Null)
    }

    fn visit_none<E>(self) -> Result<Data, E> {
        Ok(Data::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Data, D::Error> {
        Data::deserialize(deserializer)
    }

    fn visit_bool<E>(self, value: bool) -> Result<Data, E> {
        Ok(Data::Bool(value))
    }

    #[expect(clippy::cast_precision_loss, reason = "numbers are f64 by design")]
    fn visit_i64<E>(self, value: i64) -> Result<Data, E> {
        Ok(Data::num(value as f64))
    }

    #[expect(clippy::cast_precision_loss, reason = "numbers are f64 by design")]
    fn visit_u64<E>(self, value: u64) -> Result<Data, E> {
        Ok(Data::num(value as f64))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Data, E> {
        Ok(Data::num(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<Data, E> {
        Ok(Data::str(value))
    }

    fn visit_string<E>(self, value: String) -> Result<Data, E> {
        Ok(Data::str(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Data, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Data>()? {
            items.push(item);
        }
        Ok(Data::array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Data, A::Error> {
        let mut entries = ContainerMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Data>()? {
            entries.insert(key, value);
        }
        Ok(Data::container(entries))
    }
}

impl<'de> Deserialize<'de> for Data {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Data, D::Error> {
        deserializer.deserialize_any(DataVisitor)
    }
}
