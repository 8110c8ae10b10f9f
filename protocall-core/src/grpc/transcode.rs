//! # JSON <-> DynamicMessage Transcoding
//!
//! Conversion between `serde_json::Value` and `prost_reflect::DynamicMessage`
//! under the proto3 JSON mapping, with fixed rendering rules: 64-bit integers
//! as strings, enums by symbolic name, bytes as base64, defaulted fields
//! included.
//!
//! ## `google.protobuf.Any`
//!
//! `Any` fields carry a type URL next to an opaque payload, and the two
//! directions treat resolution failures differently:
//!
//! * **Encode (JSON -> message)**: an object in an `Any` position must carry
//!   `"@type": "<authority>/<full.Name>"`. The name is resolved against the
//!   schema, the remaining fields are verified against the resolved type and
//!   serialized into the payload. An unresolvable or malformed `@type` fails
//!   the whole request; silently dropping data a caller asked to send is
//!   never acceptable.
//! * **Decode (message -> JSON)**: a resolvable payload is expanded in place
//!   with `"@type"` preserved. An unresolvable type URL (or a payload that
//!   does not decode) degrades that node to
//!   `{"@type": "<url>", "value": "<base64>"}` and the rest of the response
//!   converts normally. Decoding never fails a response.
use base64::{Engine as _, engine::general_purpose::STANDARD};
use prost_reflect::{
    DescriptorPool, DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor,
    ReflectMessage, SerializeOptions, Value as ProtoValue,
};
use serde_json::{Map, Value, json};

const ANY_FULL_NAME: &str = "google.protobuf.Any";
const TYPE_URL_KEY: &str = "@type";

/// How a decoded response is rendered as JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Proto3 JSON mapping with `Any` payloads expanded in place.
    #[default]
    Expand,
    /// Structural rendering: every field as declared, `Any` payloads left as
    /// `{"@type", "value"}` pairs, no well-known shorthand forms.
    Raw,
}

/// Builds a request message from a JSON body.
///
/// Verification is strict: unknown fields, mismatched types and unresolvable
/// `Any` payloads are all errors.
pub fn json_to_message(
    descriptor: MessageDescriptor,
    body: Value,
) -> Result<DynamicMessage, serde_json::Error> {
    // DynamicMessage::deserialize accepts any Serde Deserializer;
    // serde_json::Value implements IntoDeserializer, so it can be passed
    // directly.
    DynamicMessage::deserialize(descriptor, body)
}

/// Renders a decoded message as JSON. Infallible: nodes that cannot be
/// expanded degrade instead of erroring.
pub fn message_to_json(message: &DynamicMessage, mode: DecodeMode) -> Value {
    match mode {
        DecodeMode::Expand => expanded_message_to_json(message),
        DecodeMode::Raw => walk_message(message, DecodeMode::Raw),
    }
}

fn serialize_options() -> SerializeOptions {
    SerializeOptions::new()
        .skip_default_fields(false)
        .stringify_64_bit_integers(true)
        .use_enum_numbers(false)
}

/// Fast path: the prost-reflect serializer covers the whole mapping,
/// including well-known forms and resolvable `Any` expansion. It reports an
/// error exactly when some reachable `Any` cannot be expanded; the manual
/// walk then degrades those nodes instead.
fn expanded_message_to_json(message: &DynamicMessage) -> Value {
    match message.serialize_with_options(serde_json::value::Serializer, &serialize_options()) {
        Ok(value) => value,
        Err(_) => walk_message(message, DecodeMode::Expand),
    }
}

fn walk_message(message: &DynamicMessage, mode: DecodeMode) -> Value {
    let descriptor = message.descriptor();
    if descriptor.full_name() == ANY_FULL_NAME {
        return any_to_json(message, mode);
    }

    let mut object = Map::new();
    for field in descriptor.fields() {
        // Oneof members and singular message fields track presence; emit
        // them only when set (messages as explicit null, like the mapping).
        if field.containing_oneof().is_some() {
            if !message.has_field(&field) {
                continue;
            }
        } else if is_singular_message(&field) && !message.has_field(&field) {
            object.insert(field.json_name().to_string(), Value::Null);
            continue;
        }

        let value = message.get_field(&field);
        object.insert(
            field.json_name().to_string(),
            proto_value_to_json(value.as_ref(), &field, mode),
        );
    }
    Value::Object(object)
}

fn is_singular_message(field: &FieldDescriptor) -> bool {
    matches!(field.kind(), Kind::Message(_)) && !field.is_list() && !field.is_map()
}

fn proto_value_to_json(value: &ProtoValue, field: &FieldDescriptor, mode: DecodeMode) -> Value {
    match value {
        ProtoValue::Bool(b) => Value::Bool(*b),
        ProtoValue::I32(n) => (*n).into(),
        ProtoValue::U32(n) => (*n).into(),
        ProtoValue::I64(n) => Value::String(n.to_string()),
        ProtoValue::U64(n) => Value::String(n.to_string()),
        ProtoValue::F32(f) => float_to_json(f64::from(*f)),
        ProtoValue::F64(f) => float_to_json(*f),
        ProtoValue::String(s) => Value::String(s.clone()),
        ProtoValue::Bytes(b) => Value::String(STANDARD.encode(b)),
        ProtoValue::EnumNumber(n) => enum_to_json(field, *n),
        ProtoValue::Message(m) => match mode {
            DecodeMode::Expand => expanded_message_to_json(m),
            DecodeMode::Raw => walk_message(m, DecodeMode::Raw),
        },
        ProtoValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| proto_value_to_json(item, field, mode))
                .collect(),
        ),
        ProtoValue::Map(entries) => {
            let Kind::Message(entry) = field.kind() else {
                return Value::Null;
            };
            let value_field = entry.map_entry_value_field();
            let mut object = Map::new();
            for (key, value) in entries {
                object.insert(
                    map_key_to_string(key),
                    proto_value_to_json(value, &value_field, mode),
                );
            }
            Value::Object(object)
        }
    }
}

// Map keys are always strings in the JSON mapping.
fn map_key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(b) => b.to_string(),
        MapKey::I32(n) => n.to_string(),
        MapKey::I64(n) => n.to_string(),
        MapKey::U32(n) => n.to_string(),
        MapKey::U64(n) => n.to_string(),
        MapKey::String(s) => s.clone(),
    }
}

fn enum_to_json(field: &FieldDescriptor, number: i32) -> Value {
    match field.kind() {
        Kind::Enum(descriptor) => descriptor
            .get_value(number)
            .map(|v| Value::String(v.name().to_string()))
            .unwrap_or_else(|| number.into()),
        _ => number.into(),
    }
}

fn float_to_json(f: f64) -> Value {
    if f.is_nan() {
        Value::String("NaN".to_string())
    } else if f.is_infinite() {
        Value::String(if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
    } else {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn any_to_json(message: &DynamicMessage, mode: DecodeMode) -> Value {
    let type_url = message
        .get_field_by_name("type_url")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let payload = message
        .get_field_by_name("value")
        .and_then(|v| v.as_bytes().cloned())
        .unwrap_or_default();

    if mode == DecodeMode::Expand
        && let Some(inner) = decode_any_payload(message.descriptor().parent_pool(), &type_url, &payload)
    {
        return match expanded_message_to_json(&inner) {
            Value::Object(mut fields) => {
                fields.insert(TYPE_URL_KEY.to_string(), Value::String(type_url));
                Value::Object(fields)
            }
            // Well-known payloads render as a non-object shorthand form.
            other => json!({ TYPE_URL_KEY: type_url, "value": other }),
        };
    }

    json!({ TYPE_URL_KEY: type_url, "value": STANDARD.encode(&payload) })
}

/// Resolves the fragment after the last `/` of a type URL against the pool
/// and decodes the payload. `None` means the node has to degrade.
fn decode_any_payload(
    pool: &DescriptorPool,
    type_url: &str,
    payload: &[u8],
) -> Option<DynamicMessage> {
    let full_name = type_url.rsplit('/').next().filter(|name| !name.is_empty())?;
    let descriptor = pool.get_message_by_name(full_name)?;
    DynamicMessage::decode(descriptor, payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaGraph, VirtualProtoFile};
    use prost::Message;
    use prost::bytes::Bytes;

    fn graph() -> SchemaGraph {
        SchemaGraph::from_files(&[VirtualProtoFile::new(
            "demo.proto",
            r#"
            syntax = "proto3";
            package demo;
            enum Color {
                COLOR_UNSPECIFIED = 0;
                RED = 1;
            }
            message Payload { string note = 1; }
            message Carton {
                string id = 1;
                google.protobuf.Any payload = 2;
                int64 big = 3;
                bytes blob = 4;
                Color color = 5;
                map<string, int32> counts = 6;
                repeated string tags = 7;
            }
            "#,
        )])
        .unwrap()
    }

    fn any_message(graph: &SchemaGraph, type_url: &str, payload: &[u8]) -> DynamicMessage {
        let mut any = DynamicMessage::new(graph.message("google.protobuf.Any").unwrap());
        any.set_field_by_name("type_url", ProtoValue::String(type_url.to_string()));
        any.set_field_by_name(
            "value",
            ProtoValue::Bytes(Bytes::copy_from_slice(payload)),
        );
        any
    }

    #[test]
    fn round_trip_preserves_any_marker_and_defaults() {
        let graph = graph();
        let carton = graph.message("demo.Carton").unwrap();
        let body = json!({
            "id": "box-1",
            "payload": {
                "@type": "type.googleapis.com/demo.Payload",
                "note": "hello"
            }
        });

        let message = json_to_message(carton, body).unwrap();
        let round = message_to_json(&message, DecodeMode::Expand);

        assert_eq!(round["id"], "box-1");
        assert_eq!(round["payload"]["@type"], "type.googleapis.com/demo.Payload");
        assert_eq!(round["payload"]["note"], "hello");
        // Defaults are included; 64-bit integers render as strings.
        assert_eq!(round["big"], "0");
        assert_eq!(round["tags"], json!([]));
    }

    #[test]
    fn unresolvable_any_fails_encoding() {
        let graph = graph();
        let carton = graph.message("demo.Carton").unwrap();
        let body = json!({
            "payload": { "@type": "type.googleapis.com/demo.Missing", "note": "hi" }
        });
        assert!(json_to_message(carton, body).is_err());
    }

    #[test]
    fn mismatched_body_shape_fails_encoding() {
        let graph = graph();
        let carton = graph.message("demo.Carton").unwrap();
        assert!(json_to_message(carton.clone(), json!({ "id": 5 })).is_err());
        assert!(json_to_message(carton, json!({ "unknown": true })).is_err());
    }

    #[test]
    fn resolvable_any_expands_on_decode() {
        let graph = graph();
        let inner = json_to_message(
            graph.message("demo.Payload").unwrap(),
            json!({ "note": "hi" }),
        )
        .unwrap();
        let any = any_message(
            &graph,
            "type.googleapis.com/demo.Payload",
            &inner.encode_to_vec(),
        );

        let mut carton = DynamicMessage::new(graph.message("demo.Carton").unwrap());
        carton.set_field_by_name("payload", ProtoValue::Message(any));

        let value = message_to_json(&carton, DecodeMode::Expand);
        assert_eq!(value["payload"]["@type"], "type.googleapis.com/demo.Payload");
        assert_eq!(value["payload"]["note"], "hi");
    }

    #[test]
    fn unresolvable_any_degrades_without_failing_siblings() {
        let graph = graph();
        let any = any_message(&graph, "type.googleapis.com/demo.Missing", b"\x0a\x02hi");

        let mut carton = DynamicMessage::new(graph.message("demo.Carton").unwrap());
        carton.set_field_by_name("id", ProtoValue::String("box-2".to_string()));
        carton.set_field_by_name("payload", ProtoValue::Message(any));

        let value = message_to_json(&carton, DecodeMode::Expand);
        assert_eq!(value["payload"]["@type"], "type.googleapis.com/demo.Missing");
        assert_eq!(value["payload"]["value"], STANDARD.encode(b"\x0a\x02hi"));
        // The rest of the message still converts.
        assert_eq!(value["id"], "box-2");
        assert_eq!(value["big"], "0");
    }

    #[test]
    fn corrupt_any_payload_degrades_on_decode() {
        let graph = graph();
        // Truncated wire data for a resolvable type.
        let any = any_message(&graph, "type.googleapis.com/demo.Payload", b"\x0a\xff");

        let mut carton = DynamicMessage::new(graph.message("demo.Carton").unwrap());
        carton.set_field_by_name("payload", ProtoValue::Message(any));

        let value = message_to_json(&carton, DecodeMode::Expand);
        assert_eq!(value["payload"]["value"], STANDARD.encode(b"\x0a\xff"));
    }

    #[test]
    fn nested_any_degrades_deep_in_the_tree() {
        let graph = graph();
        let bad = any_message(&graph, "type.googleapis.com/demo.Missing", b"deep");

        let mut inner_carton = DynamicMessage::new(graph.message("demo.Carton").unwrap());
        inner_carton.set_field_by_name("id", ProtoValue::String("inner".to_string()));
        inner_carton.set_field_by_name("payload", ProtoValue::Message(bad));

        let outer_any = any_message(
            &graph,
            "type.googleapis.com/demo.Carton",
            &inner_carton.encode_to_vec(),
        );
        let mut outer = DynamicMessage::new(graph.message("demo.Carton").unwrap());
        outer.set_field_by_name("payload", ProtoValue::Message(outer_any));

        let value = message_to_json(&outer, DecodeMode::Expand);
        let expanded = &value["payload"];
        assert_eq!(expanded["@type"], "type.googleapis.com/demo.Carton");
        assert_eq!(expanded["id"], "inner");
        assert_eq!(expanded["payload"]["@type"], "type.googleapis.com/demo.Missing");
        assert_eq!(expanded["payload"]["value"], STANDARD.encode(b"deep"));
    }

    #[test]
    fn raw_mode_leaves_any_opaque() {
        let graph = graph();
        let inner = json_to_message(
            graph.message("demo.Payload").unwrap(),
            json!({ "note": "hi" }),
        )
        .unwrap();
        let payload_bytes = inner.encode_to_vec();
        let any = any_message(&graph, "type.googleapis.com/demo.Payload", &payload_bytes);

        let mut carton = DynamicMessage::new(graph.message("demo.Carton").unwrap());
        carton.set_field_by_name("payload", ProtoValue::Message(any));

        let value = message_to_json(&carton, DecodeMode::Raw);
        assert_eq!(value["payload"]["@type"], "type.googleapis.com/demo.Payload");
        assert_eq!(value["payload"]["value"], STANDARD.encode(&payload_bytes));
    }

    #[test]
    fn enums_bytes_and_maps_follow_the_mapping_rules() {
        let graph = graph();
        let carton = graph.message("demo.Carton").unwrap();
        let body = json!({
            "big": "42",
            "blob": STANDARD.encode(b"abc"),
            "color": "RED",
            "counts": { "a": 1 },
            "tags": ["x", "y"]
        });

        let message = json_to_message(carton, body).unwrap();
        let value = message_to_json(&message, DecodeMode::Expand);

        assert_eq!(value["big"], "42");
        assert_eq!(value["blob"], STANDARD.encode(b"abc"));
        assert_eq!(value["color"], "RED");
        assert_eq!(value["counts"]["a"], 1);
        assert_eq!(value["tags"], json!(["x", "y"]));
    }

    #[test]
    fn empty_type_url_degrades() {
        let graph = graph();
        let any = any_message(&graph, "", b"");
        let mut carton = DynamicMessage::new(graph.message("demo.Carton").unwrap());
        carton.set_field_by_name("payload", ProtoValue::Message(any));

        let value = message_to_json(&carton, DecodeMode::Expand);
        assert_eq!(value["payload"]["@type"], "");
        assert_eq!(value["payload"]["value"], "");
    }
}
