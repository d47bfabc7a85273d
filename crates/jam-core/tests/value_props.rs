//! Property tests for the value universe: equality laws, clone isolation,
//! and the JSON round-trip for JSON-representable values.

use jam_core::Value;
use proptest::prelude::*;

/// Values containing only finite numbers, so every generated value has a
/// JSON representation.
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1.0e9..1.0e9f64).prop_map(Value::Number),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|pairs| {
                Value::Object(pairs.into_iter().collect())
            }),
        ]
    })
}

proptest! {
    #[test]
    fn equality_is_reflexive(v in json_value()) {
        prop_assert_eq!(&v, &v);
    }

    #[test]
    fn clone_equals_original(v in json_value()) {
        prop_assert_eq!(v.clone(), v);
    }

    #[test]
    fn mutating_a_clone_leaves_the_original(v in json_value()) {
        let original = v.clone();
        let mut copy = v.clone();
        match &mut copy {
            Value::Array(items) => items.push(Value::Bool(true)),
            Value::Object(map) => {
                map.insert("__mutated".to_string(), Value::Bool(true));
            }
            Value::String(s) => s.push('!'),
            Value::Number(n) => *n += 1.0,
            Value::Bool(b) => *b = !*b,
            Value::Null => {}
        }
        if copy.is_null() {
            copy = Value::Bool(true);
        }
        drop(copy);
        prop_assert_eq!(v, original);
    }

    #[test]
    fn json_round_trip(v in json_value()) {
        let json = v.to_json().expect("finite values serialize");
        prop_assert_eq!(Value::from_json(&json), v);
    }

    #[test]
    fn truthiness_is_total(v in json_value()) {
        // Must never panic, whatever the variant.
        let _ = v.is_truthy();
    }
}
