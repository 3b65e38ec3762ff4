//! Projection of a decoded frame onto the line shown in the chat room.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use std::fmt;

use schema::DynamicMessage;

use crate::error::ReceiverError;

/// One rendered chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatLine {
    pub username: String,
    pub text: String,
}

impl ChatLine {
    #[must_use]
    pub fn new(username: impl Into<String>, text: impl Into<String>) -> Self {
        Self { username: username.into(), text: text.into() }
    }

    /// Pull `username` and `text` out of a decoded message.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiverError::MissingField`] if either field is absent or
    /// not a string under the loaded schema.
    pub fn from_message(message: &DynamicMessage) -> Result<Self, ReceiverError> {
        let username = message
            .get_str("username")
            .ok_or(ReceiverError::MissingField("username"))?;
        let text = message.get_str("text").ok_or(ReceiverError::MissingField("text"))?;
        Ok(Self::new(username, text))
    }
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.username, self.text)
    }
}
