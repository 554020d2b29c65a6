use connect_query_core::{MessageInit, create_message_key, prost::bytes::Bytes};
use eliza_service::message;
use prost_reflect::{DynamicMessage, MessageDescriptor, Value};
use serde_json::json;

fn from_json(desc: &MessageDescriptor, json: serde_json::Value) -> DynamicMessage {
    MessageInit::Json(json)
        .into_message(desc)
        .expect("Invalid test message")
}

fn keys(key: &serde_json::Map<String, serde_json::Value>) -> Vec<&str> {
    key.keys().map(String::as_str).collect()
}

#[test]
fn test_default_message_has_empty_key() {
    let desc = message("test.v1.KitchenSink");
    let msg = DynamicMessage::new(desc.clone());

    assert!(create_message_key(&desc, &msg, None).is_empty());
}

#[test]
fn test_implicit_presence_omits_zero_values() {
    let desc = message("test.v1.KitchenSink");
    let msg = from_json(
        &desc,
        json!({ "ratio": 0.0, "big": "0", "text": "", "flag": false, "color": 0, "numbers": [] }),
    );

    assert!(create_message_key(&desc, &msg, None).is_empty());
}

#[test]
fn test_explicit_presence_keeps_zero_values() {
    // proto3 `optional` and oneof members
    let desc = message("test.v1.KitchenSink");
    let msg = from_json(&desc, json!({ "maybe": 0, "name": "" }));
    assert_eq!(
        serde_json::Value::Object(create_message_key(&desc, &msg, None)),
        json!({ "name": "", "maybe": 0 })
    );

    // proto2 `optional`
    let desc = message("test.v1.Legacy");
    let mut msg = DynamicMessage::new(desc.clone());
    msg.set_field_by_name("count", Value::I32(0));
    assert_eq!(
        serde_json::Value::Object(create_message_key(&desc, &msg, None)),
        json!({ "count": 0 })
    );
}

#[test]
fn test_field_order_follows_declaration() {
    let desc = message("test.v1.KitchenSink");

    let mut first = DynamicMessage::new(desc.clone());
    first.set_field_by_name("text", Value::String("hello".to_string()));
    first.set_field_by_name("big", Value::I64(7));
    first.set_field_by_name("ratio", Value::F64(0.5));

    let mut second = DynamicMessage::new(desc.clone());
    second.set_field_by_name("ratio", Value::F64(0.5));
    second.set_field_by_name("big", Value::I64(7));
    second.set_field_by_name("text", Value::String("hello".to_string()));

    let first = create_message_key(&desc, &first, None);
    let second = create_message_key(&desc, &second, None);

    assert_eq!(keys(&first), vec!["ratio", "big", "text"]);
    assert_eq!(keys(&second), vec!["ratio", "big", "text"]);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_field_order_is_not_field_number_order() {
    let desc = message("test.v1.Ordered");
    let msg = from_json(&desc, json!({ "alpha": "a", "mid": "m", "zeta": "z" }));

    let key = create_message_key(&desc, &msg, None);

    assert_eq!(keys(&key), vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_special_numbers() {
    let desc = message("test.v1.KitchenSink");
    let canonical = |field: &str, value: Value| {
        let mut msg = DynamicMessage::new(desc.clone());
        msg.set_field_by_name(field, value);
        create_message_key(&desc, &msg, None)[field].clone()
    };

    assert_eq!(canonical("ratio", Value::F64(f64::NAN)), json!("NaN"));
    assert_eq!(canonical("ratio", Value::F64(f64::INFINITY)), json!("Infinity"));
    assert_eq!(canonical("ratio", Value::F64(f64::NEG_INFINITY)), json!("-Infinity"));
    assert_eq!(canonical("weight", Value::F32(f32::INFINITY)), json!("Infinity"));
    assert_eq!(canonical("ratio", Value::F64(2.5)), json!(2.5));
    assert_eq!(canonical("big", Value::I64(123)), json!("123"));
    assert_eq!(canonical("big", Value::I64(-9_007_199_254_740_993)), json!("-9007199254740993"));
    assert_eq!(canonical("ubig", Value::U64(u64::MAX)), json!("18446744073709551615"));
    assert_eq!(canonical("small", Value::I32(-5)), json!(-5));
    assert_eq!(canonical("flag", Value::Bool(true)), json!(true));
}

#[test]
fn test_bytes_are_base64() {
    let desc = message("test.v1.KitchenSink");
    let mut msg = DynamicMessage::new(desc.clone());
    msg.set_field_by_name(
        "data",
        Value::Bytes(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef])),
    );

    let key = create_message_key(&desc, &msg, None);

    assert_eq!(key["data"], json!("3q2+7w"));
}

#[test]
fn test_enums_keep_their_number() {
    let desc = message("test.v1.KitchenSink");
    let msg = from_json(&desc, json!({ "color": "COLOR_GREEN", "colors": [1, 0, 2] }));

    let key = create_message_key(&desc, &msg, None);

    assert_eq!(key["color"], json!(2));
    assert_eq!(key["colors"], json!([1, 0, 2]));
}

#[test]
fn test_repeated_fields_keep_their_order() {
    let desc = message("test.v1.KitchenSink");
    let msg = from_json(
        &desc,
        json!({
            "numbers": ["3", "1", "2"],
            "children": [{ "value": "b" }, {}, { "big": "9" }]
        }),
    );

    let key = create_message_key(&desc, &msg, None);

    assert_eq!(key["numbers"], json!(["3", "1", "2"]));
    assert_eq!(key["children"], json!([{ "value": "b" }, {}, { "big": "9" }]));
}

#[test]
fn test_map_keys_are_sorted() {
    let desc = message("test.v1.KitchenSink");
    let msg = from_json(
        &desc,
        json!({
            "labels": { "b": 2, "a": 1 },
            "byId": { "9": "nine", "10": "ten" },
            "nestedByName": { "y": { "big": "1" }, "x": {} }
        }),
    );

    let key = create_message_key(&desc, &msg, None);

    let labels = key["labels"].as_object().unwrap();
    assert_eq!(keys(labels), vec!["a", "b"]);
    assert_eq!(key["labels"], json!({ "a": 1, "b": 2 }));

    // Lexicographic, not numeric.
    let by_id = key["byId"].as_object().unwrap();
    assert_eq!(keys(by_id), vec!["10", "9"]);

    let nested = key["nestedByName"].as_object().unwrap();
    assert_eq!(keys(nested), vec!["x", "y"]);
    assert_eq!(key["nestedByName"], json!({ "x": {}, "y": { "big": "1" } }));
}

#[test]
fn test_nested_messages_and_oneofs() {
    let desc = message("test.v1.KitchenSink");
    let msg = from_json(
        &desc,
        json!({
            "nested": { "value": "inner", "big": "42" },
            "detail": { "value": "chosen" }
        }),
    );

    let key = create_message_key(&desc, &msg, None);

    assert_eq!(
        serde_json::Value::Object(key),
        json!({
            "nested": { "value": "inner", "big": "42" },
            "detail": { "value": "chosen" }
        })
    );
}

#[test]
fn test_page_param_is_excluded() {
    let desc = message("pagination.v1.ListRequest");
    let msg = from_json(&desc, json!({ "page": 5, "query": "x" }));

    let key = create_message_key(&desc, &msg, Some("page"));

    assert_eq!(serde_json::Value::Object(key), json!({ "query": "x" }));
}

#[test]
fn test_page_param_exclusion_is_top_level_only() {
    let desc = message("test.v1.KitchenSink");
    let msg = from_json(&desc, json!({ "big": "1", "nested": { "big": "2" } }));

    let key = create_message_key(&desc, &msg, Some("big"));

    assert_eq!(serde_json::Value::Object(key), json!({ "nested": { "big": "2" } }));
}

#[test]
fn test_page_param_matches_proto_name() {
    let desc = message("pagination.v1.ListResponse");
    let msg = from_json(&desc, json!({ "page": "1", "nextPage": "2" }));

    let by_json_name = create_message_key(&desc, &msg, Some("nextPage"));
    let by_proto_name = create_message_key(&desc, &msg, Some("next_page"));

    assert_eq!(by_json_name, by_proto_name);
    assert_eq!(serde_json::Value::Object(by_json_name), json!({ "page": "1" }));
}

#[test]
fn test_key_is_deterministic_and_input_untouched() {
    let desc = message("test.v1.KitchenSink");
    let msg = from_json(
        &desc,
        json!({ "ratio": 1.25, "labels": { "z": 1, "m": 2 }, "children": [{ "value": "c" }] }),
    );
    let snapshot = msg.clone();

    let first = create_message_key(&desc, &msg, None);
    let second = create_message_key(&desc, &msg, None);

    assert_eq!(first, second);
    assert_eq!(msg, snapshot);
}

#[test]
#[should_panic(expected = "cannot create a key")]
fn test_mismatched_schema_panics() {
    let msg = DynamicMessage::new(message("connectrpc.eliza.v1.SayRequest"));

    create_message_key(&message("connectrpc.eliza.v1.SayResponse"), &msg, None);
}
