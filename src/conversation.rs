//! Conversation history and the request lifecycle.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ChatError, Result};
use crate::providers::WireMessage;

pub const GREETING: &str =
    "👋 Hi! I'm your DSA Assistant. Ask me about arrays, stacks, queues, trees, or algorithms.";

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: u64,
    /// Generated locally (greeting, offline or failure notice). Notices are
    /// shown to the user but never sent upstream.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub notice: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), timestamp: now_ms(), notice: false }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: now_ms(), notice: false }
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: now_ms(), notice: true }
    }
}

/// Where the single outstanding chat request is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight,
    Completed,
    Failed,
}

impl RequestState {
    pub fn is_in_flight(self) -> bool {
        self == RequestState::InFlight
    }
}

/// Ordered, role-tagged message list shown to the user.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    state: RequestState,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// A fresh conversation holding only the greeting.
    pub fn new() -> Self {
        Self { messages: vec![ChatMessage::notice(GREETING)], state: RequestState::Idle }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replace the content of the most recent message. Streaming only ever
    /// extends a reply, so the new content must start with the old one.
    pub fn update_last_content(&mut self, content: &str) {
        if let Some(last) = self.messages.last_mut() {
            debug_assert!(content.starts_with(last.content.as_str()), "reply content must only grow");
            last.content.clear();
            last.content.push_str(content);
        }
    }

    /// Messages to send upstream: everything except local notices.
    pub fn history(&self) -> Vec<WireMessage> {
        self.messages
            .iter()
            .filter(|m| !m.notice)
            .map(|m| WireMessage { role: m.role, content: m.content.clone() })
            .collect()
    }

    /// Drop everything but a new greeting. Refused while a reply is streaming.
    pub fn clear(&mut self) -> Result<()> {
        if self.state.is_in_flight() {
            return Err(ChatError::RequestInFlight);
        }
        self.messages = vec![ChatMessage::notice(GREETING)];
        self.state = RequestState::Idle;
        Ok(())
    }

    pub fn request_state(&self) -> RequestState {
        self.state
    }

    /// Idle/Completed/Failed -> InFlight.
    pub fn begin_request(&mut self) -> Result<()> {
        if self.state.is_in_flight() {
            return Err(ChatError::RequestInFlight);
        }
        self.state = RequestState::InFlight;
        Ok(())
    }

    pub fn complete_request(&mut self) {
        self.state = RequestState::Completed;
    }

    pub fn fail_request(&mut self) {
        self.state = RequestState::Failed;
    }

    /// Release a request whose future was dropped before it resolved.
    pub fn abandon_request(&mut self) {
        if self.state.is_in_flight() {
            self.state = RequestState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_greeting_notice() {
        let c = Conversation::new();
        assert_eq!(c.len(), 1);
        let first = &c.messages()[0];
        assert_eq!(first.role, Role::Assistant);
        assert_eq!(first.content, GREETING);
        assert!(first.notice);
    }

    #[test]
    fn test_history_skips_notices() {
        let mut c = Conversation::new();
        c.push(ChatMessage::user("What is a queue?"));
        c.push(ChatMessage::assistant("FIFO."));
        c.push(ChatMessage::notice("⚠️ oops"));
        let h = c.history();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].role, Role::User);
        assert_eq!(h[1].content, "FIFO.");
    }

    #[test]
    fn test_update_last_content_grows() {
        let mut c = Conversation::new();
        c.push(ChatMessage::assistant("Hel"));
        c.update_last_content("Hello");
        assert_eq!(c.last().map(|m| m.content.as_str()), Some("Hello"));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut c = Conversation::new();
        assert_eq!(c.request_state(), RequestState::Idle);
        c.begin_request().expect("idle -> in flight");
        assert!(matches!(c.begin_request(), Err(ChatError::RequestInFlight)));
        c.complete_request();
        assert_eq!(c.request_state(), RequestState::Completed);
        c.begin_request().expect("completed -> in flight");
        c.fail_request();
        assert_eq!(c.request_state(), RequestState::Failed);
        c.begin_request().expect("failed -> in flight");
    }

    #[test]
    fn test_abandon_releases_in_flight() {
        let mut c = Conversation::new();
        c.begin_request().unwrap();
        c.abandon_request();
        assert_eq!(c.request_state(), RequestState::Failed);
        c.abandon_request();
        assert_eq!(c.request_state(), RequestState::Failed);
    }

    #[test]
    fn test_clear_resets_to_greeting() {
        let mut c = Conversation::new();
        c.push(ChatMessage::user("hi"));
        c.clear().unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.messages()[0].content, GREETING);
    }

    #[test]
    fn test_clear_refused_while_in_flight() {
        let mut c = Conversation::new();
        c.begin_request().unwrap();
        assert!(c.clear().is_err());
    }

    #[test]
    fn test_message_serialization_omits_false_notice() {
        let json = serde_json::to_string(&ChatMessage::user("x")).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("notice"));
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert!(!back.notice);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_now_ms_is_reasonable() {
        assert!(now_ms() > 1_700_000_000_000);
    }
}
