use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::ids::generate_message_id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates who authored a `ChatMessage`.
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One entry of a conversation as shown to the person chatting.
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Role names understood by the remote agent.
pub enum AgentRole {
    User,
    Assistant,
}

impl From<Sender> for AgentRole {
    fn from(value: Sender) -> Self {
        match value {
            Sender::User => AgentRole::User,
            Sender::Bot => AgentRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub role: AgentRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Body posted to the agent's streaming endpoint.
pub struct AgentRequest {
    pub messages: Vec<AgentMessage>,
    pub run_id: String,
    pub max_retries: u32,
    pub max_steps: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub runtime_context: Map<String, Value>,
    pub thread_id: String,
    pub resource_id: String,
}

pub const DEFAULT_RUN_ID: &str = "weatherAgent";
pub const DEFAULT_THREAD_ID: &str = "BE-ITC-57";
pub const DEFAULT_RESOURCE_ID: &str = "weatherAgent";

#[derive(Debug, Clone, PartialEq)]
/// Fixed per-run knobs and session identifiers attached to every request.
///
/// `max_retries` and `max_steps` govern the remote agent's own step loop; the
/// client never retries a turn itself.
pub struct RunParameters {
    pub run_id: String,
    pub thread_id: String,
    pub resource_id: String,
    pub max_retries: u32,
    pub max_steps: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            run_id: DEFAULT_RUN_ID.to_string(),
            thread_id: DEFAULT_THREAD_ID.to_string(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            max_retries: 2,
            max_steps: 5,
            temperature: 0.5,
            top_p: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Bookkeeping collected while a reply streams.
pub struct StreamSummary {
    pub message_id: Option<String>,
    pub finish_reason: Option<String>,
    pub text_deltas: usize,
    pub skipped_bytes: usize,
}

#[derive(Debug, Error)]
/// Enumerates supported `BreezeAiError` values.
pub enum BreezeAiError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error! status: {status}")]
    HttpStatus { status: u16, body: String },
    #[error("No response body reader available")]
    StreamUnavailable,
    #[error("{0}")]
    Decode(String),
    #[error("protocol anomaly: {buffered} bytes buffered without a complete frame (limit {limit})")]
    ProtocolAnomaly { buffered: usize, limit: usize },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type StreamDeltaHandler = Arc<dyn Fn(String) + Send + Sync>;
