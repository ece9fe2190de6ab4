use serde::{Deserialize, Serialize};

pub mod state;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Lifecycle of a transcript entry. A user message starts out `Pending`
/// while its generation request is outstanding, then is either confirmed
/// or marked failed; it is never rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Local list key, allocated by the controller. Not a backend identity.
    pub id: u64,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: String,
    pub status: MessageStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameFiles {
    pub html: String,
}

/// One generated game snapshot. `id` is the position in the append-only
/// version list; `message_id` back-references the backend message that
/// produced it (lookup only, no ownership).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameVersion {
    pub id: usize,
    pub files: GameFiles,
    pub title: String,
    pub game_type: String,
    pub description: String,
    pub user_prompt: String,
    pub timestamp: String,
    pub message_id: String,
    pub image_resources: Vec<String>,
    pub audio_resources: Vec<String>,
    pub agent_chain: Vec<String>,
}

/// Where the next prompt attaches in the backend's message graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadState {
    pub conversation_id: Option<String>,
    pub parent_message_id: Option<String>,
}

impl ThreadState {
    /// A generation request is "new" unless the thread carries both a
    /// conversation and a parent message to chain from.
    pub fn continuation(&self) -> Option<(&str, &str)> {
        match (&self.conversation_id, &self.parent_message_id) {
            (Some(conversation), Some(parent)) => Some((conversation.as_str(), parent.as_str())),
            _ => None,
        }
    }
}

/// The network call the controller decided on for a submitted prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    New {
        user_prompt: String,
        model: Option<String>,
    },
    HistoryBased {
        conversation_id: String,
        parent_message_id: String,
        user_prompt: String,
        model: Option<String>,
    },
}

pub fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
