//! Leptos views for the browser build.

pub mod chat_room;
