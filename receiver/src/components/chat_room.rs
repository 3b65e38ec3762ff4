//! Append-only list of chat lines rendered into the page's container.

use leptos::prelude::*;

use crate::state::chat::{ChatEntry, ChatState};

/// One plain-text `<div>` per received message, in arrival order.
#[component]
pub fn ChatRoom(chat: RwSignal<ChatState>) -> impl IntoView {
    view! {
        <For
            each=move || chat.with(|c| c.lines.clone())
            key=|entry: &ChatEntry| entry.seq
            children=move |entry: ChatEntry| view! { <div>{entry.line.to_string()}</div> }
        />
    }
}

pub(crate) fn chat_room_view(chat: RwSignal<ChatState>) -> impl IntoView {
    view! { <ChatRoom chat=chat /> }
}
