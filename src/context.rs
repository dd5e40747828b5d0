//! Conversation context folding.
//!
//! The remote agent keeps its own per-session memory, but the history is
//! also replayed inline so a freshly switched agent still sees what was
//! said. This module turns a history snapshot plus the new input into the
//! single text payload the agent receives.

use crate::models::{ChatMessage, Role};

/// Maximum number of trailing history messages replayed to the agent.
pub const HISTORY_WINDOW: usize = 10;

const TOPIC_PREVIEW_CHARS: usize = 50;

/// Fold the trailing [`HISTORY_WINDOW`] messages and `input` into one payload.
///
/// System and context-only messages are dropped. Each remaining message is
/// rendered as `User: ...` or `Assistant: ...`, the new input is appended as
/// a `User:` line, and the lines are joined by a blank line. When nothing
/// from the history survives, the payload is `input` unchanged.
pub fn build_conversation_context(history: &[ChatMessage], input: &str) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);

    let mut parts: Vec<String> = history[start..]
        .iter()
        .filter(|msg| msg.role != Role::System && !msg.is_context)
        .map(|msg| match msg.role {
            Role::User => format!("User: {}", msg.content),
            _ => format!("Assistant: {}", msg.content),
        })
        .collect();

    if parts.is_empty() {
        return input.to_string();
    }

    parts.push(format!("User: {}", input));
    parts.join("\n\n")
}

/// One-line description of a conversation, for status output.
pub fn conversation_summary(history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return "No previous conversation.".to_string();
    }

    let user: Vec<&ChatMessage> = history
        .iter()
        .filter(|m| m.role == Role::User && !m.is_context)
        .collect();
    let assistant = history.iter().filter(|m| m.role == Role::Assistant).count();

    let mut summary = format!(
        "Conversation has {} user messages and {} assistant responses.",
        user.len(),
        assistant
    );

    if !user.is_empty() {
        let topics: Vec<String> = user[user.len().saturating_sub(3)..]
            .iter()
            .map(|m| topic_preview(&m.content))
            .collect();
        summary.push_str(&format!(" Recent topics: {}", topics.join(", ")));
    }

    summary
}

fn topic_preview(content: &str) -> String {
    if content.chars().count() > TOPIC_PREVIEW_CHARS {
        let head: String = content.chars().take(TOPIC_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
