#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

use std::fmt;

/// Lifecycle of the single WebSocket connection.
///
/// `Closed` is terminal: the receiver does not reconnect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    /// Move to `next`, logging the change. Nothing leaves `Closed`.
    #[must_use]
    pub fn transition(self, next: Self) -> Self {
        if self == Self::Closed || self == next {
            return self;
        }
        log::info!("connection {self} -> {next}");
        next
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}
