use connect_query_core::create_message_key;
use eliza_service::message;
use proptest::prelude::*;
use prost_reflect::{DynamicMessage, MapKey, Value};
use std::collections::HashMap;

fn kitchen_sink(labels: &[(String, i32)], numbers: &[i64], text: &str) -> DynamicMessage {
    let desc = message("test.v1.KitchenSink");
    let mut msg = DynamicMessage::new(desc);
    let labels: HashMap<MapKey, Value> = labels
        .iter()
        .map(|(k, v)| (MapKey::String(k.clone()), Value::I32(*v)))
        .collect();
    msg.set_field_by_name("labels", Value::Map(labels));
    msg.set_field_by_name(
        "numbers",
        Value::List(numbers.iter().copied().map(Value::I64).collect()),
    );
    msg.set_field_by_name("text", Value::String(text.to_string()));
    msg
}

proptest! {
    #[test]
    fn key_is_independent_of_map_insertion_order(
        entries in proptest::collection::hash_map("[a-z]{1,6}", any::<i32>(), 0..8),
        numbers in proptest::collection::vec(any::<i64>(), 0..8),
        text in "[ -~]{0,16}",
    ) {
        let desc = message("test.v1.KitchenSink");
        let forward: Vec<_> = entries.into_iter().collect();
        let mut backward = forward.clone();
        backward.reverse();

        let first = create_message_key(&desc, &kitchen_sink(&forward, &numbers, &text), None);
        let second = create_message_key(&desc, &kitchen_sink(&backward, &numbers, &text), None);

        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        if let Some(labels) = first.get("labels").and_then(|v| v.as_object()) {
            let keys: Vec<_> = labels.keys().cloned().collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(keys, sorted);
        }
    }

    #[test]
    fn sixty_four_bit_integers_are_exact_strings(numbers in proptest::collection::vec(any::<i64>(), 1..8)) {
        let desc = message("test.v1.KitchenSink");
        let key = create_message_key(&desc, &kitchen_sink(&[], &numbers, ""), None);

        let expected: Vec<_> = numbers
            .iter()
            .map(|n| serde_json::Value::String(n.to_string()))
            .collect();
        prop_assert_eq!(&key["numbers"], &serde_json::Value::Array(expected));
    }
}
