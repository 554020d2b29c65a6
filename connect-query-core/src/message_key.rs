//! # Message Keys
//!
//! Turns a Protobuf message into a plain, JSON-compatible structure suitable for use inside a
//! cache key.
//!
//! ## Rules
//!
//! * Fields are visited in the schema's declaration order, so two equal messages produce the
//!   same key no matter how their fields were populated.
//! * Fields that are not set (per the field's presence semantics) are omitted.
//! * 64-bit integers become base-10 strings, non-finite floats become `"NaN"`, `"Infinity"`
//!   and `"-Infinity"`, bytes become unpadded standard base64.
//! * Enums keep their numeric value.
//! * Repeated fields keep their order. Map keys are stringified and sorted.
//! * Oneof members are treated as regular fields.
use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use prost_reflect::{
    DynamicMessage, FieldDescriptor, MapKey, MessageDescriptor, ReflectMessage, Value,
};
use serde_json::{Map, Number};

/// The canonical form of a message: field JSON name to canonical value, in declaration order.
pub type MessageKey = Map<String, serde_json::Value>;

/// Builds the canonical key fragment for `message`.
///
/// `page_param_key` names a top-level field (JSON or proto name) to leave out. Paginated queries
/// use it so every page of the same query shares one key.
///
/// # Panics
///
/// If `message` is not an instance of `schema`. Keying a message against the wrong schema is a
/// programming error that would otherwise produce a silently wrong key.
pub fn create_message_key(
    schema: &MessageDescriptor,
    message: &DynamicMessage,
    page_param_key: Option<&str>,
) -> MessageKey {
    assert!(
        message.descriptor() == *schema,
        "cannot create a key for message '{}' with schema '{}'",
        message.descriptor().full_name(),
        schema.full_name()
    );

    declared_fields(schema)
        .filter(|field| !page_param_key.is_some_and(|key| is_named(field, key)))
        .filter(|field| message.has_field(field))
        .map(|field| {
            let value = message.get_field(&field);
            (field.json_name().to_string(), field_value(&value))
        })
        .collect()
}

/// Fields in the order they are written in the `.proto` source.
///
/// `MessageDescriptor::fields()` yields them by field number instead.
fn declared_fields(schema: &MessageDescriptor) -> impl Iterator<Item = FieldDescriptor> + '_ {
    schema
        .descriptor_proto()
        .field
        .iter()
        .filter_map(|field| u32::try_from(field.number()).ok())
        .filter_map(|number| schema.get_field(number))
}

fn is_named(field: &FieldDescriptor, name: &str) -> bool {
    field.json_name() == name || field.name() == name
}

fn field_value(value: &Value) -> serde_json::Value {
    match value {
        Value::List(items) => items.iter().map(single_value).collect(),
        Value::Map(entries) => {
            let mut entries: Vec<(String, &Value)> = entries
                .iter()
                .map(|(key, value)| (map_key(key), value))
                .collect();
            // UTF-16 code unit order, the default string order of JavaScript clients.
            entries.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, single_value(value)))
                    .collect(),
            )
        }
        value => single_value(value),
    }
}

/// Canonical form of a scalar, enum or message value.
fn single_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::I32(v) => serde_json::Value::from(*v),
        Value::U32(v) => serde_json::Value::from(*v),
        Value::I64(v) => serde_json::Value::String(v.to_string()),
        Value::U64(v) => serde_json::Value::String(v.to_string()),
        Value::F32(v) => float(f64::from(*v)),
        Value::F64(v) => float(*v),
        Value::String(v) => serde_json::Value::String(v.clone()),
        Value::Bytes(v) => serde_json::Value::String(STANDARD_NO_PAD.encode(v)),
        Value::EnumNumber(v) => serde_json::Value::from(*v),
        Value::Message(message) => {
            serde_json::Value::Object(create_message_key(&message.descriptor(), message, None))
        }
        Value::List(_) | Value::Map(_) => {
            unreachable!("repeated and map values cannot be nested inside a single value")
        }
    }
}

fn float(v: f64) -> serde_json::Value {
    match Number::from_f64(v) {
        Some(number) => serde_json::Value::Number(number),
        None if v.is_nan() => serde_json::Value::String("NaN".to_string()),
        None if v > 0.0 => serde_json::Value::String("Infinity".to_string()),
        None => serde_json::Value::String("-Infinity".to_string()),
    }
}

fn map_key(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(v) => v.clone(),
    }
}
