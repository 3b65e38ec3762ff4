use super::*;

#[test]
fn default_config_points_at_chat_endpoints() {
    let config = ReceiverConfig::default();
    assert_eq!(config.ws_url, "ws://localhost:3000/me/ws/connect");
    assert_eq!(config.schema_path, "/protobuf/user_message.proto");
    assert_eq!(config.message_type, "messagepackage.MyMessage");
    assert_eq!(config.container_id, "chat_room");
}

#[test]
fn from_json_overrides_only_given_keys() {
    let config = ReceiverConfig::from_json(r#"{ "ws_url": "wss://chat.example/ws" }"#).unwrap();
    assert_eq!(config.ws_url, "wss://chat.example/ws");
    assert_eq!(config.message_type, DEFAULT_MESSAGE_TYPE);
    assert_eq!(config.container_id, DEFAULT_CONTAINER_ID);
}

#[test]
fn from_json_rejects_mistyped_values() {
    assert!(ReceiverConfig::from_json(r#"{ "ws_url": 3 }"#).is_err());
}
