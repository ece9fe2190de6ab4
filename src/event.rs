use crate::backend::types::{ConversationFull, ConversationSummary, GenerateReply, ModelCatalog};
use crate::backend::BackendStatus;

/// Everything background tasks report back to the egui thread. The
/// channel is drained once per frame; each spawned request resolves to
/// exactly one of these.
#[derive(Debug, Clone)]
pub enum AppEvent {
    BackendStatus(BackendStatus),
    ModelsLoaded(ModelCatalog),
    ModelsFailed(String),
    ConversationsLoaded(Vec<ConversationSummary>),
    ConversationsFailed(String),
    ConversationLoaded(ConversationFull),
    ConversationLoadFailed {
        conversation_id: String,
        message: String,
        not_found: bool,
    },
    GenerationSucceeded(GenerateReply),
    GenerationFailed(String),
}
