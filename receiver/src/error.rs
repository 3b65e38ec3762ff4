use schema::SchemaError;

/// Error raised by schema loading, connecting, or handling a single frame.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// The schema text could not be fetched.
    #[error("schema load failed: {0}")]
    SchemaLoad(String),
    /// The schema could not be parsed, the type is missing, or a frame did not decode.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The WebSocket could not be opened.
    #[error("websocket connect failed: {0}")]
    Connect(String),
    /// The decoded message lacks a text field the chat line needs.
    #[error("decoded message has no string field `{0}`")]
    MissingField(&'static str),
    /// The element lines are appended to does not exist.
    #[error("container `{0}` not found")]
    ContainerMissing(String),
    /// Writing the line to the container failed.
    #[error("container append failed: {0}")]
    Container(String),
}
