//! Conversation/version reconciliation.
//!
//! `ConversationState` owns the client-side view of one conversation: the
//! chat transcript, the append-only list of generated game versions, the
//! thread state that decides whether the next prompt starts a new game or
//! continues an existing one, and the single in-flight guard. All mutation
//! happens on the UI thread; network completions are fed back in through
//! `complete_submit`/`fail_submit`.

use crate::backend::types::{ConversationFull, GenerateReply};
use crate::session::{
    local_timestamp, GameFiles, GameVersion, GenerationRequest, Message, MessageRole,
    MessageStatus, ThreadState,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// A generation request is already outstanding; the new prompt is
    /// dropped, not queued.
    RequestInFlight,
    BlankPrompt,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestInFlight => write!(f, "a generation request is already in flight"),
            Self::BlankPrompt => write!(f, "prompt is empty"),
        }
    }
}

impl std::error::Error for SubmitError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionError {
    SelectionOutOfRange { index: usize, len: usize },
    UnknownVersion { id: usize },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectionOutOfRange { index, len } => {
                write!(f, "version index {index} out of range for {len} versions")
            }
            Self::UnknownVersion { id } => write!(f, "no version with id {id}"),
        }
    }
}

impl std::error::Error for VersionError {}

#[derive(Debug, Default)]
pub struct ConversationState {
    thread: ThreadState,
    messages: Vec<Message>,
    versions: Vec<GameVersion>,
    selected: Option<usize>,
    in_flight: bool,
    next_message_id: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn versions(&self) -> &[GameVersion] {
        &self.versions
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_version(&self) -> Option<&GameVersion> {
        self.selected.and_then(|index| self.versions.get(index))
    }

    pub fn thread(&self) -> &ThreadState {
        &self.thread
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Accept a prompt for generation. Appends the optimistic pending user
    /// message, arms the guard, and returns which request the network layer
    /// must issue. No state changes on rejection.
    pub fn begin_submit(
        &mut self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<GenerationRequest, SubmitError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SubmitError::BlankPrompt);
        }
        if self.in_flight {
            return Err(SubmitError::RequestInFlight);
        }

        self.push_message(MessageRole::User, prompt.to_string(), MessageStatus::Pending);
        self.in_flight = true;

        let model = model.map(|id| id.to_string());
        Ok(match self.thread.continuation() {
            Some((conversation_id, parent_message_id)) => GenerationRequest::HistoryBased {
                conversation_id: conversation_id.to_string(),
                parent_message_id: parent_message_id.to_string(),
                user_prompt: prompt.to_string(),
                model,
            },
            None => GenerationRequest::New {
                user_prompt: prompt.to_string(),
                model,
            },
        })
    }

    /// Fold a successful generation reply into the transcript and version
    /// list, advance the thread to the new message id, and release the guard.
    pub fn complete_submit(&mut self, reply: &GenerateReply) {
        if self.thread.conversation_id.is_none() {
            self.thread.conversation_id = Some(reply.conversation_id.clone());
        }
        self.thread.parent_message_id = Some(reply.message_id.clone());

        let user_prompt = self
            .resolve_pending(MessageStatus::Confirmed)
            .unwrap_or_default();

        let data = &reply.game_data;
        let content = if data.description.is_empty() {
            format!("Generated \"{}\".", data.title)
        } else {
            data.description.clone()
        };
        self.push_message(MessageRole::Assistant, content, MessageStatus::Confirmed);

        self.versions.push(GameVersion {
            id: self.versions.len(),
            files: GameFiles {
                html: data.html_content.clone(),
            },
            title: data.title.clone(),
            game_type: data.game_type.clone(),
            description: data.description.clone(),
            user_prompt,
            timestamp: local_timestamp(),
            message_id: reply.message_id.clone(),
            image_resources: data.image_resources.clone(),
            audio_resources: data.audio_resources.clone(),
            agent_chain: data.agent_chain.clone(),
        });
        self.selected = Some(self.versions.len() - 1);
        self.in_flight = false;
    }

    /// Record a failed generation. The pending user message is kept and
    /// marked failed, an assistant failure notice is appended, and the
    /// thread state is left exactly as it was so a retry is safe.
    pub fn fail_submit(&mut self, error: &str) {
        self.resolve_pending(MessageStatus::Failed);
        self.push_message(
            MessageRole::Assistant,
            format!("Game generation failed: {error}. Your prompt was kept; send it again to retry."),
            MessageStatus::Failed,
        );
        self.in_flight = false;
    }

    /// Replace the whole local view with a conversation fetched from the
    /// backend. Each backend message expands to one user message, one
    /// assistant message, and one game version whose id is its position.
    /// Any unsent local draft state is discarded.
    pub fn load_conversation(&mut self, full: &ConversationFull) {
        self.messages.clear();
        self.versions.clear();
        self.next_message_id = 0;
        self.in_flight = false;

        for remote in &full.messages {
            let timestamp = remote.timestamp.clone().unwrap_or_default();
            self.push_message_at(
                MessageRole::User,
                remote.user_prompt.clone(),
                MessageStatus::Confirmed,
                timestamp.clone(),
            );
            let data = &remote.game_data;
            let content = if data.description.is_empty() {
                format!("Generated \"{}\".", data.title)
            } else {
                data.description.clone()
            };
            self.push_message_at(
                MessageRole::Assistant,
                content,
                MessageStatus::Confirmed,
                timestamp.clone(),
            );
            self.versions.push(GameVersion {
                id: self.versions.len(),
                files: GameFiles {
                    html: data.html_content.clone(),
                },
                title: data.title.clone(),
                game_type: data.game_type.clone(),
                description: data.description.clone(),
                user_prompt: remote.user_prompt.clone(),
                timestamp,
                message_id: remote.message_id.clone(),
                image_resources: data.image_resources.clone(),
                audio_resources: data.audio_resources.clone(),
                agent_chain: data.agent_chain.clone(),
            });
        }

        match full.messages.last() {
            Some(last) => {
                self.thread = ThreadState {
                    conversation_id: Some(full.conversation_id.clone()),
                    parent_message_id: Some(last.message_id.clone()),
                };
                self.selected = Some(self.versions.len() - 1);
            }
            None => {
                // Nothing to chain from; the next prompt starts fresh.
                self.thread = ThreadState::default();
                self.selected = None;
            }
        }
    }

    /// Back to the empty initial state; the next submit takes the new-game
    /// branch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn select_version(&mut self, index: usize) -> Result<(), VersionError> {
        if index >= self.versions.len() {
            return Err(VersionError::SelectionOutOfRange {
                index,
                len: self.versions.len(),
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Replace the files of one version in place, e.g. after a source edit.
    /// Everything else, including the selection, is untouched.
    pub fn update_version_files(
        &mut self,
        version_id: usize,
        files: GameFiles,
    ) -> Result<(), VersionError> {
        match self.versions.iter_mut().find(|v| v.id == version_id) {
            Some(version) => {
                version.files = files;
                Ok(())
            }
            None => Err(VersionError::UnknownVersion { id: version_id }),
        }
    }

    /// Mark the most recent pending user message and return its content
    /// (the prompt that produced the current request).
    fn resolve_pending(&mut self, status: MessageStatus) -> Option<String> {
        let message = self
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.role == MessageRole::User && m.status == MessageStatus::Pending)?;
        message.status = status;
        Some(message.content.clone())
    }

    fn push_message(&mut self, role: MessageRole, content: String, status: MessageStatus) {
        self.push_message_at(role, content, status, local_timestamp());
    }

    fn push_message_at(
        &mut self,
        role: MessageRole,
        content: String,
        status: MessageStatus,
        timestamp: String,
    ) {
        let id = self.next_message_id;
        self.next_message_id += 1;
        self.messages.push(Message {
            id,
            role,
            content,
            timestamp,
            status,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::{ConversationFull, GameData, GenerateReply, RemoteMessage};

    fn reply(conversation: &str, message: &str, title: &str) -> GenerateReply {
        GenerateReply {
            conversation_id: conversation.to_string(),
            message_id: message.to_string(),
            game_data: GameData {
                title: title.to_string(),
                game_type: "arcade".to_string(),
                description: format!("{title} description"),
                html_content: format!("<html>{title}</html>"),
                ..GameData::default()
            },
            usage: None,
        }
    }

    fn remote(message_id: &str, prompt: &str, title: &str) -> RemoteMessage {
        RemoteMessage {
            message_id: message_id.to_string(),
            user_prompt: prompt.to_string(),
            game_data: GameData {
                title: title.to_string(),
                html_content: format!("<html>{title}</html>"),
                ..GameData::default()
            },
            timestamp: Some("2025-11-02T10:00:00Z".to_string()),
        }
    }

    fn conversation(id: &str, messages: Vec<RemoteMessage>) -> ConversationFull {
        ConversationFull {
            id: String::new(),
            conversation_id: id.to_string(),
            title: None,
            messages,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn successful_submits_grow_versions_with_positional_ids() {
        let mut state = ConversationState::new();

        for (n, title) in ["Pong", "Snake", "Maze"].iter().enumerate() {
            let request = state
                .begin_submit(&format!("make {title}"), None)
                .expect("submit should be accepted");
            if n == 0 {
                assert!(matches!(request, GenerationRequest::New { .. }));
            } else {
                assert!(matches!(request, GenerationRequest::HistoryBased { .. }));
            }
            state.complete_submit(&reply("conv-1", &format!("m{n}"), title));
        }

        assert_eq!(state.versions().len(), 3);
        for (position, version) in state.versions().iter().enumerate() {
            assert_eq!(version.id, position);
        }
        assert_eq!(state.selected_index(), Some(2));
        assert_eq!(state.thread().conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(state.thread().parent_message_id.as_deref(), Some("m2"));
        // Two transcript entries per turn.
        assert_eq!(state.messages().len(), 6);
    }

    #[test]
    fn history_request_carries_current_thread_state() {
        let mut state = ConversationState::new();
        state.begin_submit("make pong", None).expect("first submit");
        state.complete_submit(&reply("conv-9", "m1", "Pong"));

        let request = state
            .begin_submit("faster ball", Some("sonnet"))
            .expect("second submit");
        assert_eq!(
            request,
            GenerationRequest::HistoryBased {
                conversation_id: "conv-9".to_string(),
                parent_message_id: "m1".to_string(),
                user_prompt: "faster ball".to_string(),
                model: Some("sonnet".to_string()),
            }
        );
    }

    #[test]
    fn failed_submit_leaves_thread_and_versions_untouched() {
        let mut state = ConversationState::new();
        state.begin_submit("make pong", None).expect("first submit");
        state.complete_submit(&reply("conv-1", "m1", "Pong"));
        let thread_before = state.thread().clone();

        state.begin_submit("add a second paddle", None).expect("second submit");
        state.fail_submit("backend timed out");

        assert_eq!(state.thread(), &thread_before);
        assert_eq!(state.versions().len(), 1);
        assert!(!state.is_in_flight());

        let user = &state.messages()[state.messages().len() - 2];
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.status, MessageStatus::Failed);
        assert_eq!(user.content, "add a second paddle");
        let notice = state.messages().last().expect("failure notice");
        assert_eq!(notice.role, MessageRole::Assistant);
        assert_eq!(notice.status, MessageStatus::Failed);

        // Retrying reuses the unchanged thread state.
        let retry = state
            .begin_submit("add a second paddle", None)
            .expect("retry should be accepted");
        assert!(matches!(
            retry,
            GenerationRequest::HistoryBased { ref parent_message_id, .. } if parent_message_id == "m1"
        ));
    }

    #[test]
    fn second_submit_while_in_flight_is_dropped() {
        let mut state = ConversationState::new();
        state.begin_submit("make pong", None).expect("first submit");

        let result = state.begin_submit("make snake", None);
        assert_eq!(result, Err(SubmitError::RequestInFlight));
        assert_eq!(state.messages().len(), 1);
        assert!(state.versions().is_empty());
    }

    #[test]
    fn blank_prompt_is_rejected_without_state_change() {
        let mut state = ConversationState::new();
        assert_eq!(state.begin_submit("   ", None), Err(SubmitError::BlankPrompt));
        assert!(state.messages().is_empty());
        assert!(!state.is_in_flight());
    }

    #[test]
    fn load_conversation_is_idempotent() {
        let full = conversation(
            "conv-3",
            vec![remote("m1", "make snake", "Snake"), remote("m2", "add walls", "Snake II")],
        );

        let mut state = ConversationState::new();
        state.load_conversation(&full);
        let messages_first = state.messages().to_vec();
        let versions_first = state.versions().to_vec();
        let selected_first = state.selected_index();

        state.load_conversation(&full);
        assert_eq!(state.messages(), messages_first.as_slice());
        assert_eq!(state.versions(), versions_first.as_slice());
        assert_eq!(state.selected_index(), selected_first);

        assert_eq!(state.thread().parent_message_id.as_deref(), Some("m2"));
        assert_eq!(state.selected_index(), Some(1));
        assert_eq!(state.versions()[1].message_id, "m2");
        assert_eq!(state.versions()[1].user_prompt, "add walls");
    }

    #[test]
    fn load_conversation_discards_local_draft() {
        let mut state = ConversationState::new();
        state.begin_submit("make pong", None).expect("submit");
        state.fail_submit("offline");

        let full = conversation("conv-4", vec![remote("m1", "make snake", "Snake")]);
        state.load_conversation(&full);

        assert_eq!(state.messages().len(), 2);
        assert_eq!(state.versions().len(), 1);
        assert_eq!(state.thread().conversation_id.as_deref(), Some("conv-4"));
    }

    #[test]
    fn empty_conversation_loads_to_empty_lists_and_no_selection() {
        let mut state = ConversationState::new();
        state.load_conversation(&conversation("conv-5", vec![]));

        assert!(state.messages().is_empty());
        assert!(state.versions().is_empty());
        assert_eq!(state.selected_index(), None);

        // With nothing to chain from, the next prompt starts a new game.
        let request = state.begin_submit("make pong", None).expect("submit");
        assert!(matches!(request, GenerationRequest::New { .. }));
    }

    #[test]
    fn reset_returns_to_the_new_game_branch() {
        let mut state = ConversationState::new();
        state.begin_submit("make pong", None).expect("submit");
        state.complete_submit(&reply("conv-1", "m1", "Pong"));

        state.reset();
        assert!(state.messages().is_empty());
        assert!(state.versions().is_empty());
        assert_eq!(state.selected_index(), None);
        assert_eq!(state.thread(), &ThreadState::default());

        let request = state.begin_submit("make snake", None).expect("submit");
        assert!(matches!(request, GenerationRequest::New { .. }));
    }

    #[test]
    fn update_version_files_touches_only_the_target() {
        let mut state = ConversationState::new();
        state.begin_submit("make pong", None).expect("submit");
        state.complete_submit(&reply("conv-1", "m1", "Pong"));
        state.begin_submit("make snake", None).expect("submit");
        state.complete_submit(&reply("conv-1", "m2", "Snake"));
        assert_eq!(state.selected_index(), Some(1));

        let untouched = state.versions()[1].clone();
        state
            .update_version_files(
                0,
                GameFiles {
                    html: "<html>edited</html>".to_string(),
                },
            )
            .expect("update should succeed");

        assert_eq!(state.versions()[0].files.html, "<html>edited</html>");
        assert_eq!(state.versions()[0].title, "Pong");
        assert_eq!(state.versions()[1], untouched);
        assert_eq!(state.selected_index(), Some(1));
    }

    #[test]
    fn update_version_files_rejects_unknown_ids() {
        let mut state = ConversationState::new();
        let result = state.update_version_files(3, GameFiles::default());
        assert_eq!(result, Err(VersionError::UnknownVersion { id: 3 }));
    }

    #[test]
    fn select_version_rejects_out_of_range_indices() {
        let mut state = ConversationState::new();
        state.begin_submit("make pong", None).expect("submit");
        state.complete_submit(&reply("conv-1", "m1", "Pong"));

        assert_eq!(
            state.select_version(1),
            Err(VersionError::SelectionOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(state.selected_index(), Some(0));
        state.select_version(0).expect("in-range selection");
    }
}
