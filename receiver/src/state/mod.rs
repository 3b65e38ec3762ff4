//! Receiver state models.
//!
//! `connection` tracks the socket lifecycle; `chat` holds the rendered lines
//! the browser view reads from.

pub mod chat;
pub mod connection;
