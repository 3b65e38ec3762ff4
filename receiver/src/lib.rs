//! # receiver
//!
//! Chat receiver: opens one WebSocket, loads the chat `.proto` schema, and
//! appends one `"<username> - <text>"` line per inbound binary frame to a
//! container.
//!
//! The core (`receiver`, `chat`, `sink`, `state`) is transport-agnostic and
//! runs natively, which is how the `cli` crate and the tests drive it. The
//! browser build (`csr` feature) supplies the schema fetch, the WebSocket, and
//! a Leptos view mounted into the `chat_room` element.

pub mod chat;
#[cfg(feature = "csr")]
pub mod components;
pub mod config;
pub mod error;
pub mod net;
pub mod receiver;
pub mod sink;
pub mod state;

pub use chat::ChatLine;
pub use config::ReceiverConfig;
pub use error::ReceiverError;
pub use receiver::{ChatReceiver, Incoming, RunSummary, run_session};
pub use sink::{ChatSink, MemorySink, WriterSink};
pub use state::connection::ConnectionState;

/// Browser entry point: wire the default configuration to the page.
#[cfg(feature = "csr")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = ReceiverConfig::default();
    wasm_bindgen_futures::spawn_local(async move {
        let sink = sink::LeptosSink::new(&config.container_id);
        let summary = run_session(
            &config.message_type,
            net::schema_fetch::fetch_schema(&config.schema_path),
            net::socket::open_socket(&config.ws_url),
            sink,
        )
        .await;
        log::info!(
            "chat receiver stopped: appended={} failed={} ignored={} dropped={}",
            summary.appended,
            summary.failed,
            summary.ignored,
            summary.dropped
        );
    });
}
