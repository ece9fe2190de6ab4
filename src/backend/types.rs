//! Wire types for the game-generation backend's HTTP JSON API.
//!
//! Unknown fields are ignored on the way in; optional request fields are
//! omitted on the way out.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider: String,
}

/// `GET /api/game/models`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// One element of `GET /api/conversations/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Message count, for the "N turns" hint in the history list.
    #[serde(default)]
    pub messages: usize,
}

/// Everything the backend persists per generation turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub game_type: String,
    #[serde(default)]
    pub game_logic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub html_content: String,
    #[serde(default)]
    pub image_resources: Vec<String>,
    #[serde(default)]
    pub audio_resources: Vec<String>,
    #[serde(default)]
    pub agent_chain: Vec<String>,
}

/// One backend message inside a full conversation: a user prompt and the
/// game generated in reply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    pub message_id: String,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub game_data: GameData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// `GET /api/conversations/{id}/full`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationFull {
    #[serde(default)]
    pub id: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<RemoteMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// `POST /api/game/new`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGameRequest {
    pub user_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// `POST /api/game/history-based`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryGameRequest {
    pub conversation_id: String,
    pub parent_message_id: String,
    pub user_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Token accounting some backends attach to a generation reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

/// Success shape of both generation endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateReply {
    pub conversation_id: String,
    pub message_id: String,
    pub game_data: GameData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// `GET /api/game/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}
