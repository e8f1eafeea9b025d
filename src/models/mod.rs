//! Wire and domain types shared across the client.
//!
//! Response payloads follow the backend's uniform envelope:
//! `{ "status": "success" | "error", "data": ..., "message": ... }`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uniform response envelope returned by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Payload of a successful login or refresh exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Advertised lifetime in seconds. The authoritative expiry is the
    /// `exp` claim inside the token itself.
    pub expires_in: u64,
    pub user: UserSummary,
}

/// Minimal user identity carried in the token envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
}

/// One stored chat exchange (user message plus assistant response).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Optional attachment metadata the backend echoes back on a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Wrapper for the chat history endpoint payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// In-memory identity projection of the current credential's claims.
///
/// Created when a valid credential is found or obtained; destroyed on
/// logout or irrecoverable refresh failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub app_metadata: serde_json::Map<String, serde_json::Value>,
}
