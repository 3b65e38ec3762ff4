//! Receiver configuration.
//!
//! The defaults are the fixed endpoints the chat page is served with; an
//! embedding page or the CLI may override any of them.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WS_URL: &str = "ws://localhost:3000/me/ws/connect";
pub const DEFAULT_SCHEMA_PATH: &str = "/protobuf/user_message.proto";
pub const DEFAULT_MESSAGE_TYPE: &str = "messagepackage.MyMessage";
pub const DEFAULT_CONTAINER_ID: &str = "chat_room";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// WebSocket endpoint delivering binary chat frames.
    pub ws_url: String,
    /// Where the `.proto` schema text is fetched from.
    pub schema_path: String,
    /// Fully-qualified message type every frame decodes as.
    pub message_type: String,
    /// Id of the element lines are appended to.
    pub container_id: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_owned(),
            schema_path: DEFAULT_SCHEMA_PATH.to_owned(),
            message_type: DEFAULT_MESSAGE_TYPE.to_owned(),
            container_id: DEFAULT_CONTAINER_ID.to_owned(),
        }
    }
}

impl ReceiverConfig {
    /// Build a config from a JSON object; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input or mistyped keys.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
