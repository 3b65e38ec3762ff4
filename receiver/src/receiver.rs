//! Chat receiver lifecycle: join schema load with connection open, then
//! decode, format, and append one line per inbound frame.
//!
//! ERROR HANDLING
//! ==============
//! A schema-load failure is logged once and the receiver keeps draining the
//! socket without appending anything. A bad frame is logged and dropped; it
//! never affects the frames after it. A socket error or remote close ends
//! the session in the terminal `Closed` state.

#[cfg(test)]
#[path = "receiver_test.rs"]
mod receiver_test;

use std::fmt;
use std::future::Future;

use futures::{Stream, StreamExt};
use schema::MessageType;

use crate::chat::ChatLine;
use crate::error::ReceiverError;
use crate::sink::ChatSink;
use crate::state::connection::ConnectionState;

/// A frame as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Incoming {
    Binary(Vec<u8>),
    /// Text frames are not part of the chat protocol and are ignored.
    Text(String),
}

/// Counters reported when a session ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames that became a line in the container.
    pub appended: usize,
    /// Binary frames that failed to decode or append.
    pub failed: usize,
    /// Non-binary frames skipped.
    pub ignored: usize,
    /// Frames discarded because no schema was available.
    pub dropped: usize,
    /// Connection state when the summary was taken; `Closed` once a run ends.
    pub state: ConnectionState,
}

/// Frame handler installed once both the schema and the socket are ready.
pub struct ChatReceiver<S> {
    message_type: MessageType,
    sink: S,
    summary: RunSummary,
}

impl<S: ChatSink> ChatReceiver<S> {
    pub fn new(message_type: MessageType, sink: S) -> Self {
        Self { message_type, sink, summary: RunSummary { state: ConnectionState::Open, ..RunSummary::default() } }
    }

    /// Decode one binary frame and append its line.
    ///
    /// # Errors
    ///
    /// Returns the decode, projection, or container error for this frame.
    /// Nothing is appended when an error is returned.
    pub fn on_frame(&mut self, frame: &[u8]) -> Result<ChatLine, ReceiverError> {
        let message = self.message_type.decode(frame)?;
        let line = ChatLine::from_message(&message)?;
        self.sink.append_line(&line)?;
        Ok(line)
    }

    /// Handle one transport frame, logging failures instead of propagating.
    pub fn handle(&mut self, incoming: Incoming) {
        match incoming {
            Incoming::Binary(bytes) => match self.on_frame(&bytes) {
                Ok(line) => {
                    log::debug!("appended: {line}");
                    self.summary.appended += 1;
                }
                Err(e) => {
                    log::warn!("dropping frame of {} bytes: {e}", bytes.len());
                    self.summary.failed += 1;
                }
            },
            Incoming::Text(text) => {
                log::debug!("ignoring text frame of {} bytes", text.len());
                self.summary.ignored += 1;
            }
        }
    }

    /// Process frames until the stream ends or yields an error.
    pub async fn run<St, E>(&mut self, frames: St) -> RunSummary
    where
        St: Stream<Item = Result<Incoming, E>>,
        E: fmt::Display,
    {
        let mut frames = std::pin::pin!(frames);
        while let Some(item) = frames.next().await {
            match item {
                Ok(incoming) => self.handle(incoming),
                Err(e) => {
                    log::warn!("websocket receive failed: {e}");
                    break;
                }
            }
        }
        self.summary.state = self.summary.state.transition(ConnectionState::Closed);
        self.summary
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Run a whole receiver session.
///
/// `load_schema` resolves to the `.proto` text and `connect` resolves once
/// the socket is open. Both run concurrently; the frame handler is only
/// installed after both complete, so every frame is decoded against a loaded
/// schema. Frames that arrive in the meantime wait in the transport.
pub async fn run_session<L, C, St, E, S>(
    message_type: &str,
    load_schema: L,
    connect: C,
    sink: S,
) -> RunSummary
where
    L: Future<Output = Result<String, ReceiverError>>,
    C: Future<Output = Result<St, ReceiverError>>,
    St: Stream<Item = Result<Incoming, E>>,
    E: fmt::Display,
    S: ChatSink,
{
    let state = ConnectionState::Connecting;
    log::info!("connection {state}; loading schema");

    let (schema_source, socket) = futures::future::join(load_schema, connect).await;

    let loaded = schema_source
        .and_then(|source| schema::load_type(&source, message_type).map_err(ReceiverError::from));
    if let Err(e) = &loaded {
        log::error!("{e}");
    }

    let frames = match socket {
        Ok(frames) => frames,
        Err(e) => {
            log::warn!("{e}");
            return RunSummary { state: state.transition(ConnectionState::Closed), ..RunSummary::default() };
        }
    };
    let state = state.transition(ConnectionState::Open);

    match loaded {
        Ok(ty) => {
            log::info!("schema loaded; decoding frames as {}", ty.full_name());
            ChatReceiver::new(ty, sink).run(frames).await
        }
        Err(_) => drain(frames, state).await,
    }
}

/// Keep the socket read without a schema; every frame is discarded.
async fn drain<St, E>(frames: St, state: ConnectionState) -> RunSummary
where
    St: Stream<Item = Result<Incoming, E>>,
    E: fmt::Display,
{
    let mut frames = std::pin::pin!(frames);
    let mut summary = RunSummary { state, ..RunSummary::default() };
    while let Some(item) = frames.next().await {
        match item {
            Ok(_) => summary.dropped += 1,
            Err(e) => {
                log::warn!("websocket receive failed: {e}");
                break;
            }
        }
    }
    summary.state = summary.state.transition(ConnectionState::Closed);
    summary
}
