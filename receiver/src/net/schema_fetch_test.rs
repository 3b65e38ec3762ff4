use super::*;

#[test]
fn schema_status_message_names_path_and_status() {
    assert_eq!(
        schema_status_message("/protobuf/user_message.proto", 404),
        "GET /protobuf/user_message.proto returned 404"
    );
}
