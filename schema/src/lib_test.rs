use super::*;

const CHAT_PROTO: &str = r#"
syntax = "proto3";
package messagepackage;
message MyMessage {
    string username = 1;
    string text = 2;
}
"#;

#[test]
fn lookup_type_by_fully_qualified_name() {
    let schema = Arc::new(Schema::parse(CHAT_PROTO).expect("schema"));
    let ty = schema.lookup_type("messagepackage.MyMessage").expect("type");
    assert_eq!(ty.full_name(), "messagepackage.MyMessage");
    assert_eq!(ty.descriptor().fields.len(), 2);
    assert_eq!(ty.schema().package(), Some("messagepackage"));
}

#[test]
fn lookup_type_accepts_leading_dot() {
    let schema = Arc::new(Schema::parse(CHAT_PROTO).expect("schema"));
    assert!(schema.lookup_type(".messagepackage.MyMessage").is_ok());
}

#[test]
fn lookup_type_rejects_short_or_unknown_names() {
    let schema = Arc::new(Schema::parse(CHAT_PROTO).expect("schema"));
    let err = schema.lookup_type("MyMessage").expect_err("short name should not resolve");
    assert!(matches!(err, SchemaError::UnknownType(ref name) if name == "MyMessage"));
    assert_eq!(err.to_string(), "no such type: MyMessage");
}

#[test]
fn load_type_propagates_parse_errors() {
    let err = load_type("message {", "x.Y").expect_err("should fail");
    assert!(matches!(err, SchemaError::Parse { line: 1, .. }));
}

#[test]
fn message_type_clones_share_schema() {
    let ty = load_type(CHAT_PROTO, "messagepackage.MyMessage").expect("type");
    let other = ty.clone();
    assert!(std::ptr::eq(ty.schema(), other.schema()));
}

#[test]
fn decoded_message_renders_as_json() {
    let ty = load_type(CHAT_PROTO, "messagepackage.MyMessage").expect("type");
    let bytes = ty
        .encode(&DynamicMessage::new().with("username", "alice").with("text", "hi"))
        .expect("encode");
    let decoded = ty.decode(&bytes).expect("decode");
    assert_eq!(decoded.to_json(), serde_json::json!({ "username": "alice", "text": "hi" }));
}

#[test]
fn schema_lists_messages_in_name_order() {
    let schema = Schema::parse("package p; message B {} message A {} enum E { X = 0; }").expect("schema");
    let names: Vec<&str> = schema.messages().map(|m| m.full_name.as_str()).collect();
    assert_eq!(names, ["p.A", "p.B"]);
    assert_eq!(schema.enums().count(), 1);
}

#[test]
fn descriptors_serialize_for_inspection() {
    let schema = Schema::parse(CHAT_PROTO).expect("schema");
    let msg = schema.message("messagepackage.MyMessage").expect("message");
    let json = serde_json::to_value(msg).expect("json");
    assert_eq!(json["fields"][0]["name"], "username");
    assert_eq!(json["fields"][0]["kind"], serde_json::json!({ "scalar": "string" }));
    assert_eq!(json["fields"][0]["label"], "singular");
}
