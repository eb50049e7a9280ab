//! Property tests for the merge-mode algebraic laws.
//!
//! Equality here is absence-aware: null, `{}`, and `[]` are all "absent"
//! for merge purposes, so laws that produce one empty shape where another
//! went in still hold.

use proptest::prelude::*;
use whistle_data::Data;
use whistle_eval::merge::{extend_values, merge_values};

fn arb_data() -> impl Strategy<Value = Data> {
    let leaf = prop_oneof![
        Just(Data::Null),
        any::<bool>().prop_map(Data::Bool),
        (-1000i32..1000).prop_map(|n| Data::num(f64::from(n))),
        "[a-z]{0,6}".prop_map(Data::str),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Data::array),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..4)
                .prop_map(Data::container_of),
        ]
    })
}

/// A container whose keys all carry `prefix`, keeping keysets disjoint
/// across differently-prefixed instances.
fn arb_prefixed_container(prefix: &'static str) -> impl Strategy<Value = Data> {
    prop::collection::vec(("[a-z]{1,4}", arb_data()), 0..4).prop_map(move |entries| {
        Data::container_of(
            entries
                .into_iter()
                .map(|(key, value)| (format!("{prefix}{key}"), value)),
        )
    })
}

fn eq_absent_aware(a: &Data, b: &Data) -> bool {
    a == b || (a.is_empty_or_null() && b.is_empty_or_null())
}

proptest! {
    #[test]
    fn merge_null_identities(x in arb_data()) {
        prop_assert!(eq_absent_aware(&merge_values(x.clone(), Data::Null), &x));
        prop_assert!(eq_absent_aware(&merge_values(Data::Null, x.clone()), &x));
    }

    #[test]
    fn merge_empty_shapes_are_no_ops(x in arb_data()) {
        prop_assert!(eq_absent_aware(
            &merge_values(x.clone(), Data::empty_container()),
            &x
        ));
        prop_assert!(eq_absent_aware(&merge_values(x.clone(), Data::array(vec![])), &x));
    }

    #[test]
    fn merge_is_associative_on_disjoint_keysets(
        x in arb_prefixed_container("a_"),
        y in arb_prefixed_container("b_"),
        z in arb_prefixed_container("c_"),
    ) {
        let left = merge_values(merge_values(x.clone(), y.clone()), z.clone());
        let right = merge_values(x, merge_values(y, z));
        prop_assert!(eq_absent_aware(&left, &right));
    }

    #[test]
    fn merge_never_drops_existing_disjoint_keys(
        x in arb_prefixed_container("a_"),
        y in arb_prefixed_container("b_"),
    ) {
        let merged = merge_values(x.clone(), y.clone());
        if let (Some(merged_map), Some(x_map)) = (merged.as_container(), x.as_container()) {
            for key in x_map.keys() {
                prop_assert!(merged_map.contains_key(key));
            }
        }
        if let (Some(merged_map), Some(y_map)) = (merged.as_container(), y.as_container()) {
            for key in y_map.keys() {
                prop_assert!(merged_map.contains_key(key));
            }
        }
    }

    #[test]
    fn extend_never_overwrites(
        x in arb_prefixed_container("a_"),
        y in arb_prefixed_container("a_"),
    ) {
        // Same prefix: keysets overlap freely.
        let extended = extend_values(x.clone(), y);
        if let (Some(extended_map), Some(x_map)) = (extended.as_container(), x.as_container()) {
            for (key, value) in x_map.iter() {
                prop_assert_eq!(extended_map.get(key), Some(value));
            }
        }
    }

    #[test]
    fn array_merge_concatenates_lengths(
        x in prop::collection::vec(arb_data(), 0..6),
        y in prop::collection::vec(arb_data(), 1..6),
    ) {
        let merged = merge_values(Data::array(x.clone()), Data::array(y.clone()));
        if x.is_empty() {
            // The existing side was absent; the incoming array stands alone.
            prop_assert!(eq_absent_aware(&merged, &Data::array(y)));
        } else if let Some(items) = merged.as_array() {
            prop_assert_eq!(items.len(), x.len() + y.len());
        } else {
            prop_assert!(false, "array merge produced a non-array");
        }
    }
}
