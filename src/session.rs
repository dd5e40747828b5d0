//! Explicit per-user chat session.
//!
//! A [`Session`] is an owned value handed by `&mut` into each chat
//! operation. Resetting mints a fresh session id so the remote agent never
//! sees two conversations under the same id.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::ChatMessage;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub selected_agent_id: Option<String>,
    pub selected_agent_name: Option<String>,
    pub selected_alias_id: Option<String>,
    /// Number of assistant replies received in this session.
    pub message_count: u64,
    pub start_time: DateTime<Utc>,
    pub last_agent_switch_time: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            selected_agent_id: None,
            selected_agent_name: None,
            selected_alias_id: None,
            message_count: 0,
            start_time: Utc::now(),
            last_agent_switch_time: None,
        }
    }

    /// Start a new conversation with the same agent selection.
    pub fn reset(&self) -> Self {
        Self {
            selected_agent_id: self.selected_agent_id.clone(),
            selected_agent_name: self.selected_agent_name.clone(),
            selected_alias_id: self.selected_alias_id.clone(),
            ..Self::new()
        }
    }

    /// A fresh session with no agent selected.
    pub fn disconnect(&self) -> Self {
        Self::new()
    }

    /// Select an agent.
    ///
    /// When switching away from a previously selected agent and the session
    /// already has history, a context-only note recording the switch is
    /// appended. The note is shown to the user but never replayed to the
    /// agent.
    pub fn select_agent(&mut self, agent_id: &str, agent_name: &str, alias_id: &str) {
        if self.selected_agent_id.as_deref() == Some(agent_id) {
            self.selected_alias_id = Some(alias_id.to_string());
            return;
        }

        let previous = self.selected_agent_name.take();
        self.selected_agent_id = Some(agent_id.to_string());
        self.selected_agent_name = Some(agent_name.to_string());
        self.selected_alias_id = Some(alias_id.to_string());
        self.last_agent_switch_time = Some(Utc::now());

        if let Some(previous) = previous {
            if !self.messages.is_empty() {
                self.messages.push(ChatMessage::context_note(format!(
                    "Note: Switching from agent '{}' to '{}'. Previous conversation context is maintained.",
                    previous, agent_name
                )));
            }
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Shortened id for status lines.
    pub fn short_id(&self) -> &str {
        self.session_id.get(..8).unwrap_or(&self.session_id)
    }

    pub fn duration(&self) -> chrono::Duration {
        Utc::now() - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn reset_mints_new_id_and_keeps_agent() {
        let mut session = Session::new();
        session.select_agent("A1", "Analyst", "ALIAS");
        session.push(ChatMessage::user("hi"));
        session.message_count = 3;

        let fresh = session.reset();
        assert_ne!(fresh.session_id, session.session_id);
        assert!(fresh.messages.is_empty());
        assert_eq!(fresh.message_count, 0);
        assert_eq!(fresh.selected_agent_id.as_deref(), Some("A1"));
        assert_eq!(fresh.selected_alias_id.as_deref(), Some("ALIAS"));
    }

    #[test]
    fn disconnect_clears_agent() {
        let mut session = Session::new();
        session.select_agent("A1", "Analyst", "ALIAS");
        let fresh = session.disconnect();
        assert_ne!(fresh.session_id, session.session_id);
        assert!(fresh.selected_agent_id.is_none());
    }

    #[test]
    fn switching_agents_with_history_adds_context_note() {
        let mut session = Session::new();
        session.select_agent("A1", "Analyst", "ALIAS");
        session.push(ChatMessage::user("hi"));
        session.select_agent("A2", "Writer", "ALIAS2");

        let note = session.messages.last().unwrap();
        assert_eq!(note.role, Role::System);
        assert!(note.is_context);
        assert!(note.content.contains("'Analyst' to 'Writer'"));
        assert!(session.last_agent_switch_time.is_some());
    }

    #[test]
    fn first_selection_or_empty_history_adds_nothing() {
        let mut session = Session::new();
        session.select_agent("A1", "Analyst", "ALIAS");
        session.select_agent("A2", "Writer", "ALIAS");
        assert!(session.messages.is_empty());
    }

    #[test]
    fn reselecting_same_agent_only_updates_alias() {
        let mut session = Session::new();
        session.select_agent("A1", "Analyst", "OLD");
        session.push(ChatMessage::user("hi"));
        session.select_agent("A1", "Analyst", "NEW");
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.selected_alias_id.as_deref(), Some("NEW"));
    }

    #[test]
    fn short_id_is_eight_chars() {
        assert_eq!(Session::new().short_id().len(), 8);
    }
}
