// libs/agent-cell/src/services/history.rs
use crate::models::{ChatMessage, Role};

/// Bounds what is sent to the model: every system message plus the `window`
/// most recent other messages, in their original order. Older turns are
/// dropped on purpose.
pub fn trim_history(messages: &[ChatMessage], window: usize) -> Vec<ChatMessage> {
    let conversational = messages.iter().filter(|m| !m.is_system()).count();
    let mut skip = conversational.saturating_sub(window);

    // A tool result without the assistant message that requested it is
    // rejected by the chat API, so the cut never starts on one.
    let mut remaining = messages.iter().filter(|m| !m.is_system()).skip(skip);
    while matches!(remaining.next(), Some(m) if m.role == Role::Tool) {
        skip += 1;
    }

    let mut seen = 0;
    messages
        .iter()
        .filter(|message| {
            if message.is_system() {
                return true;
            }
            seen += 1;
            seen > skip
        })
        .cloned()
        .collect()
}
