//! Interface to the generative model that judges rule conformance.
//!
//! The oracle is treated as a fallible, non-deterministic service returning
//! free-form text. The pipeline only depends on this trait, never on a
//! particular transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions.
    System,
    /// Request or corrective follow-up.
    User,
    /// A previous oracle reply.
    Assistant,
}

/// One conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl Message {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A request to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Conversation so far.
    pub messages: Vec<Message>,
}

/// Token counters reported for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Completion tokens.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens.
    #[serde(default)]
    pub total_tokens: u64,
}

/// An oracle reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleReply {
    /// Raw reply text.
    pub text: String,
    /// Token counters.
    #[serde(default)]
    pub usage: TokenUsage,
    /// Monetary cost of the call.
    #[serde(default)]
    pub cost: f64,
    /// Whether the transport served the reply from its own cache.
    #[serde(default)]
    pub cached: bool,
}

impl OracleReply {
    /// Creates a reply with no usage information.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Errors reported by oracle transports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Transport failure (network, process, protocol).
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete in time.
    #[error("timed out after {secs}s")]
    Timeout {
        /// Timeout that elapsed.
        secs: u64,
    },

    /// The call was cancelled.
    #[error("aborted")]
    Aborted,
}

/// A generative model that can be asked to judge code.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Sends the conversation and returns the raw reply.
    async fn invoke(&self, request: &OracleRequest) -> Result<OracleReply, OracleError>;
}
