use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::webhook::{AssistantGateway, AssistantRequest, ChatRole, GatewayError, HistoryEntry, HISTORY_WINDOW};

pub const GREETING: &str = "Hello! I'm your AI study assistant. How can I help you today?";
pub const DEFAULT_SUBJECT: &str = "general";

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// In-memory conversation with the study assistant. Nothing is persisted.
#[derive(Debug, Clone)]
pub struct ChatSession {
    subject: String,
    messages: Vec<ChatMessage>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT)
    }
}

impl ChatSession {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            messages: vec![ChatMessage::new(ChatRole::Assistant, GREETING)],
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Appends the user's message, asks the assistant with the preceding
    /// context window, and appends the reply. Blank input is ignored and
    /// returns `Ok(None)`.
    pub async fn send<G: AssistantGateway>(
        &mut self,
        gateway: &G,
        text: &str,
    ) -> Result<Option<&ChatMessage>, GatewayError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let history = self.recent_history();
        self.messages.push(ChatMessage::new(ChatRole::User, text));

        info!("💬 [{}] user message ({} chars)", self.subject, text.len());
        let reply = gateway
            .send(AssistantRequest::Chat {
                message: text.to_string(),
                history,
            })
            .await
            .map_err(|e| {
                warn!("Chat reply failed: {}", e);
                e
            })?;

        self.messages.push(ChatMessage::new(ChatRole::Assistant, reply.text));
        Ok(self.messages.last())
    }

    fn recent_history(&self) -> Vec<HistoryEntry> {
        let start = self.messages.len().saturating_sub(HISTORY_WINDOW);
        self.messages[start..]
            .iter()
            .map(|m| HistoryEntry {
                role: m.role,
                content: m.text.clone(),
            })
            .collect()
    }
}
