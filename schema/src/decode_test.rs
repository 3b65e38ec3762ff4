use std::sync::Arc;

use prost::Message;

use crate::{DynamicMessage, MessageType, Schema, SchemaError, Value, load_type};

const CHAT_PROTO: &str = r#"
syntax = "proto3";
package messagepackage;
message MyMessage {
    string username = 1;
    string text = 2;
}
"#;

const ROOM_PROTO: &str = r#"
syntax = "proto3";
package room;

message Member {
    string id = 1;
    string name = 2;
}

message Snapshot {
    enum Visibility {
        PUBLIC = 0;
        PRIVATE = 1;
    }
    string room_id = 1;
    Member owner = 2;
    repeated Member members = 3;
    repeated int32 positions = 4;
    sint64 offset = 5;
    fixed32 checksum = 6;
    double ratio = 7;
    bool archived = 8;
    bytes avatar = 9;
    Visibility visibility = 10;
    optional string topic = 11;
    repeated string tags = 12;
}
"#;

#[derive(Clone, PartialEq, Message)]
struct MyMessage {
    #[prost(string, tag = "1")]
    username: String,
    #[prost(string, tag = "2")]
    text: String,
}

#[derive(Clone, PartialEq, Message)]
struct Member {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(string, tag = "2")]
    name: String,
}

#[derive(Clone, PartialEq, Message)]
struct Snapshot {
    #[prost(string, tag = "1")]
    room_id: String,
    #[prost(message, optional, tag = "2")]
    owner: Option<Member>,
    #[prost(message, repeated, tag = "3")]
    members: Vec<Member>,
    #[prost(int32, repeated, tag = "4")]
    positions: Vec<i32>,
    #[prost(sint64, tag = "5")]
    offset: i64,
    #[prost(fixed32, tag = "6")]
    checksum: u32,
    #[prost(double, tag = "7")]
    ratio: f64,
    #[prost(bool, tag = "8")]
    archived: bool,
    #[prost(bytes = "vec", tag = "9")]
    avatar: Vec<u8>,
    #[prost(int32, tag = "10")]
    visibility: i32,
    #[prost(string, optional, tag = "11")]
    topic: Option<String>,
    #[prost(string, repeated, tag = "12")]
    tags: Vec<String>,
}

fn chat_type() -> MessageType {
    load_type(CHAT_PROTO, "messagepackage.MyMessage").unwrap()
}

fn snapshot_type() -> MessageType {
    load_type(ROOM_PROTO, "room.Snapshot").unwrap()
}

fn member(id: &str, name: &str) -> Member {
    Member { id: id.to_owned(), name: name.to_owned() }
}

#[test]
fn decode_prost_encoded_chat_message() {
    let bytes = MyMessage { username: "alice".to_owned(), text: "hi".to_owned() }.encode_to_vec();
    let decoded = chat_type().decode(&bytes).unwrap();
    assert_eq!(decoded.get_str("username"), Some("alice"));
    assert_eq!(decoded.get_str("text"), Some("hi"));
}

#[test]
fn decode_empty_frame_yields_proto3_defaults() {
    let decoded = chat_type().decode(&[]).unwrap();
    assert_eq!(decoded.get_str("username"), Some(""));
    assert_eq!(decoded.get_str("text"), Some(""));
}

#[test]
fn decode_full_snapshot_matches_prost() {
    let snapshot = Snapshot {
        room_id: "general".to_owned(),
        owner: Some(member("u1", "Ann")),
        members: vec![member("u1", "Ann"), member("u2", "Bo")],
        positions: vec![3, -7, 150],
        offset: -42,
        checksum: 0xDEAD_BEEF,
        ratio: 0.25,
        archived: true,
        avatar: vec![0, 1, 254, 255],
        visibility: 1,
        topic: Some("release".to_owned()),
        tags: vec!["a".to_owned(), "b".to_owned()],
    };
    let decoded = snapshot_type().decode(&snapshot.encode_to_vec()).unwrap();

    assert_eq!(decoded.get_str("room_id"), Some("general"));
    let owner = decoded.get("owner").and_then(Value::as_message).unwrap();
    assert_eq!(owner.get_str("name"), Some("Ann"));
    let members = decoded.get("members").and_then(Value::as_list).unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1].as_message().unwrap().get_str("id"), Some("u2"));
    assert_eq!(
        decoded.get("positions"),
        Some(&Value::List(vec![Value::I32(3), Value::I32(-7), Value::I32(150)]))
    );
    assert_eq!(decoded.get("offset"), Some(&Value::I64(-42)));
    assert_eq!(decoded.get("checksum"), Some(&Value::U32(0xDEAD_BEEF)));
    assert_eq!(decoded.get("ratio"), Some(&Value::F64(0.25)));
    assert_eq!(decoded.get("archived"), Some(&Value::Bool(true)));
    assert_eq!(decoded.get("avatar"), Some(&Value::Bytes(vec![0, 1, 254, 255])));
    assert_eq!(decoded.get("visibility"), Some(&Value::Enum(1)));
    assert_eq!(decoded.get_str("topic"), Some("release"));
    assert_eq!(decoded.get("tags"), Some(&Value::List(vec!["a".into(), "b".into()])));
}

#[test]
fn decode_absent_fields_get_defaults_but_explicit_presence_stays_absent() {
    let decoded = snapshot_type().decode(&[]).unwrap();
    assert_eq!(decoded.get_str("room_id"), Some(""));
    assert_eq!(decoded.get("members"), Some(&Value::List(Vec::new())));
    assert_eq!(decoded.get("visibility"), Some(&Value::Enum(0)));
    assert_eq!(decoded.get("avatar"), Some(&Value::Bytes(Vec::new())));
    assert!(!decoded.contains("owner"));
    assert!(!decoded.contains("topic"));
}

#[test]
fn decode_nested_message_gets_defaults() {
    let snapshot = Snapshot { owner: Some(member("u1", "")), ..Snapshot::default() };
    let decoded = snapshot_type().decode(&snapshot.encode_to_vec()).unwrap();
    let owner = decoded.get("owner").and_then(Value::as_message).unwrap();
    assert_eq!(owner.get_str("id"), Some("u1"));
    assert_eq!(owner.get_str("name"), Some(""));
}

#[test]
fn decode_accepts_unpacked_repeated_scalars() {
    // Field 4, varint wire type, written twice instead of packed.
    let bytes = [0x20, 0x05, 0x20, 0x06];
    let decoded = snapshot_type().decode(&bytes).unwrap();
    assert_eq!(decoded.get("positions"), Some(&Value::List(vec![Value::I32(5), Value::I32(6)])));
}

#[test]
fn decode_last_singular_value_wins() {
    let mut bytes = MyMessage { username: "first".to_owned(), text: String::new() }.encode_to_vec();
    bytes.extend(MyMessage { username: "second".to_owned(), text: String::new() }.encode_to_vec());
    let decoded = chat_type().decode(&bytes).unwrap();
    assert_eq!(decoded.get_str("username"), Some("second"));
}

#[test]
fn decode_merges_repeated_occurrences_of_singular_message() {
    let mut bytes = Snapshot { owner: Some(member("u1", "")), ..Snapshot::default() }.encode_to_vec();
    bytes.extend(Snapshot { owner: Some(member("", "Ann")), ..Snapshot::default() }.encode_to_vec());
    let decoded = snapshot_type().decode(&bytes).unwrap();
    let owner = decoded.get("owner").and_then(Value::as_message).unwrap();
    assert_eq!(owner.get_str("id"), Some("u1"));
    assert_eq!(owner.get_str("name"), Some("Ann"));
}

#[test]
fn decode_skips_unknown_fields() {
    let mut bytes = vec![
        0x78, 0x2A, // field 15, varint 42
        0x85, 0x01, 1, 2, 3, 4, // field 16, fixed32
        0x8A, 0x01, 0x02, b'x', b'y', // field 17, length-delimited
    ];
    bytes.extend(MyMessage { username: "bo".to_owned(), text: "yo".to_owned() }.encode_to_vec());
    let decoded = chat_type().decode(&bytes).unwrap();
    assert_eq!(decoded.get_str("username"), Some("bo"));
    assert_eq!(decoded.len(), 2);
}

#[test]
fn decode_rejects_wire_type_mismatch() {
    // Field 1 (username, a string) sent as a varint.
    let err = chat_type().decode(&[0x08, 0x01]).unwrap_err();
    assert!(matches!(err, SchemaError::WireType { ref field, .. } if field == "username"), "{err}");
}

#[test]
fn decode_rejects_truncated_string() {
    // Field 1 claims ten bytes but carries two.
    let err = chat_type().decode(&[0x0A, 0x0A, b'a', b'b']).unwrap_err();
    assert!(matches!(err, SchemaError::Truncated { .. }), "{err}");
}

#[test]
fn decode_rejects_invalid_utf8() {
    let err = chat_type().decode(&[0x12, 0x02, 0xC3, 0x28]).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidUtf8 { ref field } if field == "text"), "{err}");
}

#[test]
fn decode_rejects_garbage_key() {
    let err = chat_type().decode(&[0xFF, 0xFF, 0xFF]).unwrap_err();
    assert!(matches!(err, SchemaError::Decode(_)), "{err}");
}

#[test]
fn decode_skips_unknown_groups() {
    let mut bytes = MyMessage { username: "alice".to_owned(), text: "hi".to_owned() }.encode_to_vec();
    // Field 5, empty group.
    bytes.extend([0x2B, 0x2C]);
    // Field 6 group holding a varint, a string, and a nested field 7 group.
    bytes.extend([0x33, 0x08, 0x01, 0x12, 0x01, b'z', 0x3B, 0x3C, 0x34]);
    let decoded = chat_type().decode(&bytes).unwrap();
    assert_eq!(decoded.get_str("username"), Some("alice"));
    assert_eq!(decoded.get_str("text"), Some("hi"));
    assert_eq!(decoded.len(), 2);
}

#[test]
fn decode_rejects_unterminated_unknown_group() {
    let err = chat_type().decode(&[0x2B, 0x08, 0x01]).unwrap_err();
    assert!(matches!(err, SchemaError::UnbalancedGroup { number: 5 }), "{err}");
}

#[test]
fn decode_rejects_mismatched_group_end() {
    // Opens field 5, closes field 6.
    let err = chat_type().decode(&[0x2B, 0x34]).unwrap_err();
    assert!(matches!(err, SchemaError::UnbalancedGroup { number: 5 }), "{err}");
}

#[test]
fn decode_rejects_group_on_declared_field() {
    // Field 1 (username), start-group wire type.
    let err = chat_type().decode(&[0x0B, 0x0C]).unwrap_err();
    assert!(matches!(err, SchemaError::UnsupportedGroup), "{err}");
}

#[test]
fn decode_enforces_recursion_limit() {
    let schema = Arc::new(Schema::parse("message Node { Node child = 1; }").unwrap());
    let node = schema.lookup_type("Node").unwrap();

    let mut bytes: Vec<u8> = Vec::new();
    for _ in 0..=crate::RECURSION_LIMIT + 1 {
        let mut outer = vec![0x0A];
        prost::encoding::encode_varint(bytes.len() as u64, &mut outer);
        outer.extend(bytes);
        bytes = outer;
    }
    let err = node.decode(&bytes).unwrap_err();
    assert!(matches!(err, SchemaError::RecursionLimit), "{err}");
}

#[test]
fn encode_matches_prost_bytes() {
    let message = DynamicMessage::new().with("username", "alice").with("text", "hi");
    let ours = chat_type().encode(&message).unwrap();
    let theirs = MyMessage { username: "alice".to_owned(), text: "hi".to_owned() }.encode_to_vec();
    assert_eq!(ours, theirs);
}

#[test]
fn encode_snapshot_decodes_with_prost() {
    let owner = DynamicMessage::new().with("id", "u9").with("name", "Cy");
    let message = DynamicMessage::new()
        .with("room_id", "ops")
        .with("owner", owner)
        .with("positions", Value::List(vec![Value::I32(1), Value::I32(-1)]))
        .with("offset", Value::I64(-3))
        .with("visibility", Value::Enum(1))
        .with("tags", Value::List(vec!["x".into()]));
    let bytes = snapshot_type().encode(&message).unwrap();

    let decoded = Snapshot::decode(bytes.as_slice()).unwrap();
    assert_eq!(decoded.room_id, "ops");
    assert_eq!(decoded.owner, Some(member("u9", "Cy")));
    assert_eq!(decoded.positions, vec![1, -1]);
    assert_eq!(decoded.offset, -3);
    assert_eq!(decoded.visibility, 1);
    assert_eq!(decoded.tags, vec!["x".to_owned()]);
}

#[test]
fn encode_rejects_value_of_wrong_type() {
    let message = DynamicMessage::new().with("username", Value::I32(3));
    let err = chat_type().encode(&message).unwrap_err();
    assert!(matches!(err, SchemaError::ValueMismatch { ref field } if field == "username"));
}
