use super::*;

#[test]
fn chat_state_default_empty_lines() {
    let state = ChatState::default();
    assert!(state.lines.is_empty());
}

#[test]
fn push_assigns_increasing_sequence_to_duplicates() {
    let mut state = ChatState::default();
    state.push(ChatLine::new("a", "same"));
    state.push(ChatLine::new("a", "same"));
    assert_eq!(state.lines.len(), 2);
    assert_eq!(state.lines[0].seq, 0);
    assert_eq!(state.lines[1].seq, 1);
    assert_eq!(state.lines[0].line, state.lines[1].line);
}
