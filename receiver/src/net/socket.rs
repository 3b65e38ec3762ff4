//! WebSocket transport via `gloo-net`.

#[cfg(test)]
#[path = "socket_test.rs"]
mod socket_test;

#[cfg(feature = "csr")]
use crate::error::ReceiverError;
#[cfg(feature = "csr")]
use crate::receiver::Incoming;

/// How often the connecting socket is checked for the open transition.
#[cfg(feature = "csr")]
const OPEN_POLL_MS: u64 = 16;

#[cfg(any(test, feature = "csr"))]
fn closed_before_open_message(url: &str) -> String {
    format!("{url} closed before opening")
}

#[cfg(feature = "csr")]
fn incoming_from_message(message: gloo_net::websocket::Message) -> Incoming {
    match message {
        gloo_net::websocket::Message::Bytes(bytes) => Incoming::Binary(bytes),
        gloo_net::websocket::Message::Text(text) => Incoming::Text(text),
    }
}

/// Open the socket and resolve once it is ready.
///
/// The state poll only makes the open transition observable: the session
/// logs `connecting -> open` at the real moment, and a socket that closes
/// during the handshake fails here as a connect error instead of as an
/// empty frame stream. Reading frames never waits on it.
///
/// Messages that arrive before the caller starts polling the returned stream
/// are queued by `gloo-net`, so none are lost while the schema loads.
///
/// # Errors
///
/// Returns [`ReceiverError::Connect`] if the URL is rejected or the socket
/// closes before it opens.
#[cfg(feature = "csr")]
pub async fn open_socket(
    url: &str,
) -> Result<impl futures::Stream<Item = Result<Incoming, gloo_net::websocket::WebSocketError>>, ReceiverError> {
    use futures::StreamExt;
    use gloo_net::websocket::State;
    use gloo_net::websocket::futures::WebSocket;

    let ws = WebSocket::open(url).map_err(|e| ReceiverError::Connect(e.to_string()))?;
    loop {
        match ws.state() {
            State::Open => break,
            State::Connecting => {
                gloo_timers::future::sleep(std::time::Duration::from_millis(OPEN_POLL_MS)).await;
            }
            State::Closing | State::Closed => {
                return Err(ReceiverError::Connect(closed_before_open_message(url)));
            }
        }
    }

    Ok(ws.map(|msg| msg.map(incoming_from_message)))
}
