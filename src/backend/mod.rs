pub mod api;
pub mod types;

use crate::config::AppConfig;
use crate::event::AppEvent;
use crate::session::GenerationRequest;
use api::GameApi;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time;
use tracing::{debug, info, warn};
use types::{HistoryGameRequest, NewGameRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Unknown,
    Checking,
    Online,
    Offline,
}

impl BackendStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Checking => "Checking...",
            Self::Online => "Backend Online",
            Self::Offline => "Backend Offline",
        }
    }
}

/// Bridge between the egui thread and the backend API. Cheap to clone;
/// every operation spawns onto the tokio runtime and resolves to exactly
/// one `AppEvent` on the channel, so the UI's guard bookkeeping can rely
/// on a completion arriving for every request it starts.
#[derive(Clone)]
pub struct BackendClient {
    api: GameApi,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
    health_poll_interval: Duration,
    history_limit: usize,
    health_poller_started: Arc<AtomicBool>,
}

impl BackendClient {
    pub fn new(config: &AppConfig, tx: mpsc::Sender<AppEvent>) -> anyhow::Result<Self> {
        let runtime_handle = Handle::try_current()
            .map_err(|err| anyhow::anyhow!("tokio runtime unavailable: {err}"))?;
        let api = GameApi::new(
            config.backend_url.clone(),
            config.request_timeout,
            config.generate_timeout,
        )?;

        Ok(Self {
            api,
            tx,
            runtime_handle,
            health_poll_interval: config.health_poll_interval,
            history_limit: config.history_limit,
            health_poller_started: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Kick off the health poller and the initial metadata fetches.
    pub fn start(&self) {
        info!("connecting to game backend at {}", self.api.base_url());
        let _ = self.tx.send(AppEvent::BackendStatus(BackendStatus::Checking));
        self.spawn_health_poller();
        self.fetch_models();
        self.refresh_conversations();
    }

    /// Issue the generation call the controller decided on.
    pub fn submit(&self, request: GenerationRequest) {
        let api = self.api.clone();
        let tx = self.tx.clone();

        self.runtime_handle.spawn(async move {
            let result = match request {
                GenerationRequest::New { user_prompt, model } => {
                    api.new_game(&NewGameRequest { user_prompt, model }).await
                }
                GenerationRequest::HistoryBased {
                    conversation_id,
                    parent_message_id,
                    user_prompt,
                    model,
                } => {
                    api.history_based_game(&HistoryGameRequest {
                        conversation_id,
                        parent_message_id,
                        user_prompt,
                        model,
                    })
                    .await
                }
            };

            match result {
                Ok(reply) => {
                    info!(message_id = %reply.message_id, "generation finished");
                    let _ = tx.send(AppEvent::GenerationSucceeded(reply));
                }
                Err(err) => {
                    warn!("generation failed: {err}");
                    let _ = tx.send(AppEvent::GenerationFailed(err.to_string()));
                }
            }
        });
    }

    pub fn refresh_conversations(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let limit = self.history_limit;

        self.runtime_handle.spawn(async move {
            match api.list_conversations(limit).await {
                Ok(summaries) => {
                    debug!("loaded {} conversation summaries", summaries.len());
                    let _ = tx.send(AppEvent::ConversationsLoaded(summaries));
                }
                Err(err) => {
                    warn!("conversation listing failed: {err}");
                    let _ = tx.send(AppEvent::ConversationsFailed(err.to_string()));
                }
            }
        });
    }

    pub fn load_conversation(&self, conversation_id: String) {
        let api = self.api.clone();
        let tx = self.tx.clone();

        self.runtime_handle.spawn(async move {
            match api.get_conversation(&conversation_id).await {
                Ok(full) => {
                    let _ = tx.send(AppEvent::ConversationLoaded(full));
                }
                Err(err) => {
                    warn!("loading conversation {conversation_id} failed: {err}");
                    let _ = tx.send(AppEvent::ConversationLoadFailed {
                        conversation_id,
                        message: err.to_string(),
                        not_found: err.is_not_found(),
                    });
                }
            }
        });
    }

    pub fn fetch_models(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();

        self.runtime_handle.spawn(async move {
            match api.list_models().await {
                Ok(catalog) => {
                    let _ = tx.send(AppEvent::ModelsLoaded(catalog));
                }
                Err(err) => {
                    warn!("model listing failed: {err}");
                    let _ = tx.send(AppEvent::ModelsFailed(err.to_string()));
                }
            }
        });
    }

    fn spawn_health_poller(&self) {
        if self
            .health_poller_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let api = self.api.clone();
        let tx = self.tx.clone();
        let interval = self.health_poll_interval;

        self.runtime_handle.spawn(async move {
            let mut ticker = time::interval(interval);
            let mut last_status = BackendStatus::Unknown;

            loop {
                ticker.tick().await;
                let status = match api.health().await {
                    Ok(report) => {
                        debug!(status = %report.status, "health check ok");
                        BackendStatus::Online
                    }
                    Err(err) => {
                        debug!("health check failed: {err}");
                        BackendStatus::Offline
                    }
                };
                if status != last_status {
                    last_status = status;
                    let _ = tx.send(AppEvent::BackendStatus(status));
                }
            }
        });
    }
}
