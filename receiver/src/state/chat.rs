#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use crate::chat::ChatLine;

/// Lines shown in the chat room, oldest first.
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    pub lines: Vec<ChatEntry>,
    next_seq: u64,
}

/// A line plus its arrival sequence, used as a stable render key since the
/// same text may arrive more than once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEntry {
    pub seq: u64,
    pub line: ChatLine,
}

impl ChatState {
    pub fn push(&mut self, line: ChatLine) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.lines.push(ChatEntry { seq, line });
    }
}
