//! Browser networking for the receiver.
//!
//! SYSTEM CONTEXT
//! ==============
//! `schema_fetch` loads the `.proto` text over HTTP and `socket` opens the
//! WebSocket. Both are only live in the `csr` build; the native CLI supplies
//! its own equivalents to `run_session`.

pub mod schema_fetch;
pub mod socket;
