use std::time::Duration;

use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::WebhookConfig;

/// Message shown to the user whenever the assistant cannot answer.
pub const AI_FAILURE_MESSAGE: &str = "Failed to get response from AI. Please try again.";

/// Number of prior messages forwarded as conversation context.
pub const HISTORY_WINDOW: usize = 5;

const WEBHOOK_ACTION: &str = "sendMessage";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to get AI response: request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to get AI response: HTTP status {0}")]
    Status(u16),
    #[error("Failed to get AI response: reply had no text field")]
    MissingReplyField,
}

impl GatewayError {
    pub fn user_message(&self) -> &'static str {
        AI_FAILURE_MESSAGE
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

/// What the caller wants from the assistant.
#[derive(Debug, Clone)]
pub enum AssistantRequest {
    Chat { message: String, history: Vec<HistoryEntry> },
    GenerateQuiz { prompt: String },
    GradeQuiz { prompt: String },
}

impl AssistantRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            AssistantRequest::Chat { .. } => "chat",
            AssistantRequest::GenerateQuiz { .. } => "generate-quiz",
            AssistantRequest::GradeQuiz { .. } => "grade-quiz",
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            AssistantRequest::Chat { message, .. } => message,
            AssistantRequest::GenerateQuiz { prompt } | AssistantRequest::GradeQuiz { prompt } => prompt,
        }
    }

    /// The trailing history window that accompanies the prompt.
    pub fn recent_history(&self) -> &[HistoryEntry] {
        match self {
            AssistantRequest::Chat { history, .. } => {
                &history[history.len().saturating_sub(HISTORY_WINDOW)..]
            }
            _ => &[],
        }
    }
}

/// Known reply field names, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyField {
    Output,
    Response,
    Message,
    Text,
    Content,
}

impl ReplyField {
    pub const ALL: [ReplyField; 5] = [
        ReplyField::Output,
        ReplyField::Response,
        ReplyField::Message,
        ReplyField::Text,
        ReplyField::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyField::Output => "output",
            ReplyField::Response => "response",
            ReplyField::Message => "message",
            ReplyField::Text => "text",
            ReplyField::Content => "content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub field: ReplyField,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WebhookMetadata<'a> {
    conversation_history: &'a [HistoryEntry],
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WebhookEnvelope<'a> {
    action: &'static str,
    session_id: String,
    chat_input: &'a str,
    metadata: WebhookMetadata<'a>,
}

/// Finds the reply text in a webhook response body. Workflow engines often
/// answer with a one-element array, so the first element is searched too.
pub fn extract_reply(body: &Value) -> Option<AssistantReply> {
    let object = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };

    ReplyField::ALL.iter().find_map(|field| {
        object
            .get(field.as_str())
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(|text| AssistantReply { text: text.to_string(), field: *field })
    })
}

/// Single-shot prompt/response seam used by the quiz engine and the chat.
#[allow(async_fn_in_trait)]
pub trait AssistantGateway {
    async fn send(&self, request: AssistantRequest) -> Result<AssistantReply, GatewayError>;
}

#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl AssistantGateway for WebhookClient {
    async fn send(&self, request: AssistantRequest) -> Result<AssistantReply, GatewayError> {
        let envelope = WebhookEnvelope {
            action: WEBHOOK_ACTION,
            session_id: format!("session_{}", Uuid::new_v4()),
            chat_input: request.prompt(),
            metadata: WebhookMetadata {
                conversation_history: request.recent_history(),
            },
        };

        info!(
            "🤖 Sending {} request to AI webhook ({} history messages)",
            request.kind(),
            envelope.metadata.conversation_history.len()
        );

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                error!("AI webhook request failed: {}", e);
                GatewayError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("AI webhook error {}: {}", status, error_text);
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!("AI webhook returned a non-JSON body: {}", e);
            GatewayError::Http(e)
        })?;

        let reply = extract_reply(&body).ok_or_else(|| {
            error!("AI webhook reply had none of the known text fields: {}", body);
            GatewayError::MissingReplyField
        })?;

        debug!("AI reply taken from '{}' ({} chars)", reply.field.as_str(), reply.text.len());
        Ok(reply)
    }
}
