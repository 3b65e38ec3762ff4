//! Containers that chat lines are appended to.

#[cfg(test)]
#[path = "sink_test.rs"]
mod sink_test;

use std::io::Write;

use crate::chat::ChatLine;
use crate::error::ReceiverError;

/// Destination for rendered chat lines. Each call appends exactly one line.
pub trait ChatSink {
    /// Append `line` after every previously appended line.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiverError::ContainerMissing`] or
    /// [`ReceiverError::Container`] when the line could not be shown.
    fn append_line(&mut self, line: &ChatLine) -> Result<(), ReceiverError>;
}

impl<T: ChatSink + ?Sized> ChatSink for &mut T {
    fn append_line(&mut self, line: &ChatLine) -> Result<(), ReceiverError> {
        (**self).append_line(line)
    }
}

/// Collects lines in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl ChatSink for MemorySink {
    fn append_line(&mut self, line: &ChatLine) -> Result<(), ReceiverError> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

/// Writes one line per message to any `io::Write`, flushing after each so a
/// terminal shows messages as they arrive.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChatSink for WriterSink<W> {
    fn append_line(&mut self, line: &ChatLine) -> Result<(), ReceiverError> {
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| ReceiverError::Container(e.to_string()))
    }
}

/// Browser container: a Leptos view over [`ChatState`](crate::state::chat::ChatState),
/// mounted into the element with `container_id` on the first line.
///
/// The element is looked up lazily so the page only needs it by the time
/// the first message arrives; until it exists, lines are rejected.
#[cfg(feature = "csr")]
pub struct LeptosSink {
    container_id: String,
    chat: leptos::prelude::RwSignal<crate::state::chat::ChatState>,
    mounted: bool,
}

#[cfg(feature = "csr")]
impl LeptosSink {
    #[must_use]
    pub fn new(container_id: &str) -> Self {
        Self {
            container_id: container_id.to_owned(),
            chat: leptos::prelude::RwSignal::new(crate::state::chat::ChatState::default()),
            mounted: false,
        }
    }

    fn mount(&mut self) -> Result<(), ReceiverError> {
        use wasm_bindgen::JsCast;

        let container = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(&self.container_id))
            .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok())
            .ok_or_else(|| ReceiverError::ContainerMissing(self.container_id.clone()))?;

        let chat = self.chat;
        leptos::mount::mount_to(container, move || crate::components::chat_room::chat_room_view(chat)).forget();
        self.mounted = true;
        Ok(())
    }
}

#[cfg(feature = "csr")]
impl ChatSink for LeptosSink {
    fn append_line(&mut self, line: &ChatLine) -> Result<(), ReceiverError> {
        use leptos::prelude::Update;

        if !self.mounted {
            self.mount()?;
        }
        self.chat.update(|c| c.push(line.clone()));
        Ok(())
    }
}
