//! Typed wrappers over the backend's HTTP endpoints.
//!
//! Every call is single-attempt; retry is a user decision, not a client
//! one. Deadlines are enforced by the underlying clients, so a hung call
//! always resolves to a `Transport` error instead of leaving the caller
//! waiting forever.

use crate::backend::types::{
    ConversationFull, ConversationSummary, GenerateReply, HealthReport, HistoryGameRequest,
    ModelCatalog, NewGameRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const BODY_SNIPPET_CHARS: usize = 240;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("backend reported failure: {message}")]
    Backend { message: String },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Missing conversations need a different user message than transport
    /// or server trouble.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

#[derive(Clone)]
pub struct GameApi {
    /// Metadata deadline: models, conversations, health.
    http: reqwest::Client,
    /// Generation deadline; producing a game takes minutes, not seconds.
    generate_http: reqwest::Client,
    base_url: String,
}

impl GameApi {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        generate_timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(request_timeout).build()?,
            generate_http: reqwest::Client::builder().timeout(generate_timeout).build()?,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_models(&self) -> Result<ModelCatalog, ApiError> {
        self.get_json(&self.http, "/api/game/models").await
    }

    pub async fn list_conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, ApiError> {
        self.get_json(&self.http, &format!("/api/conversations/list?limit={limit}"))
            .await
    }

    pub async fn get_conversation(&self, id: &str) -> Result<ConversationFull, ApiError> {
        self.get_json(&self.http, &format!("/api/conversations/{id}/full"))
            .await
    }

    pub async fn new_game(&self, request: &NewGameRequest) -> Result<GenerateReply, ApiError> {
        self.post_json(&self.generate_http, "/api/game/new", request)
            .await
    }

    pub async fn history_based_game(
        &self,
        request: &HistoryGameRequest,
    ) -> Result<GenerateReply, ApiError> {
        self.post_json(&self.generate_http, "/api/game/history-based", request)
            .await
    }

    pub async fn health(&self) -> Result<HealthReport, ApiError> {
        self.get_json(&self.http, "/api/game/health").await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        client: &reqwest::Client,
        path: &str,
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let response = client.get(&url).send().await.map_err(|source| {
            ApiError::Transport {
                url: url.clone(),
                source,
            }
        })?;
        read_json(url, response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        client: &reqwest::Client,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let response = client.post(&url).json(body).send().await.map_err(|source| {
            ApiError::Transport {
                url: url.clone(),
                source,
            }
        })?;
        read_json(url, response).await
    }
}

async fn read_json<T: DeserializeOwned>(
    url: String,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(|source| ApiError::Transport {
        url: url.clone(),
        source,
    })?;

    if !status.is_success() {
        return Err(ApiError::Status {
            url,
            status: status.as_u16(),
            body: snippet(&body),
        });
    }

    let value: Value = serde_json::from_str(&body).map_err(|source| ApiError::Decode {
        url: url.clone(),
        source,
    })?;
    let value = match unwrap_envelope(value) {
        Ok(value) => value,
        Err(message) => return Err(ApiError::Backend { message }),
    };
    serde_json::from_value(value).map_err(|source| ApiError::Decode { url, source })
}

/// Older backend builds wrap every payload in `{success, data, error}`.
/// A `success: false` body is an application failure even on HTTP 200.
fn unwrap_envelope(value: Value) -> Result<Value, String> {
    let Some(success) = value.get("success").and_then(Value::as_bool) else {
        return Ok(value);
    };
    if !success {
        let message = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("backend returned success=false without an error message")
            .to_string();
        return Err(message);
    }
    match value.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Ok(value),
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_SNIPPET_CHARS).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::GameData;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(router: Router) -> GameApi {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server");
        });
        GameApi::new(
            format!("http://{addr}"),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .expect("test client")
    }

    fn reply_for(prompt: &str, message_id: &str) -> Json<Value> {
        Json(json!({
            "conversation_id": "conv-1",
            "message_id": message_id,
            "game_data": {
                "title": format!("Game for {prompt}"),
                "html_content": "<html></html>"
            }
        }))
    }

    #[tokio::test]
    async fn new_game_posts_prompt_and_parses_reply() {
        let api = serve(Router::new().route(
            "/api/game/new",
            post(|Json(body): Json<NewGameRequest>| async move {
                assert_eq!(body.model.as_deref(), Some("sonnet"));
                reply_for(&body.user_prompt, "m1")
            }),
        ))
        .await;

        let reply = api
            .new_game(&NewGameRequest {
                user_prompt: "make pong".to_string(),
                model: Some("sonnet".to_string()),
            })
            .await
            .expect("new game should succeed");
        assert_eq!(reply.message_id, "m1");
        assert_eq!(reply.game_data.title, "Game for make pong");
    }

    #[tokio::test]
    async fn history_based_game_carries_thread_fields() {
        let api = serve(Router::new().route(
            "/api/game/history-based",
            post(|Json(body): Json<HistoryGameRequest>| async move {
                assert_eq!(body.conversation_id, "conv-1");
                assert_eq!(body.parent_message_id, "m1");
                reply_for(&body.user_prompt, "m2")
            }),
        ))
        .await;

        let reply = api
            .history_based_game(&HistoryGameRequest {
                conversation_id: "conv-1".to_string(),
                parent_message_id: "m1".to_string(),
                user_prompt: "faster".to_string(),
                model: None,
            })
            .await
            .expect("history-based game should succeed");
        assert_eq!(reply.message_id, "m2");
    }

    #[tokio::test]
    async fn missing_conversation_is_distinguishable_from_other_failures() {
        let api = serve(Router::new().route(
            "/api/conversations/{id}/full",
            get(|Path(id): Path<String>| async move {
                (StatusCode::NOT_FOUND, format!("conversation {id} not found"))
            }),
        ))
        .await;

        let error = api
            .get_conversation("nope")
            .await
            .expect_err("lookup should fail");
        assert!(error.is_not_found());
        assert!(matches!(error, ApiError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn server_error_surfaces_status_and_body() {
        let api = serve(Router::new().route(
            "/api/game/models",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model registry unavailable") }),
        ))
        .await;

        let error = api.list_models().await.expect_err("call should fail");
        assert!(!error.is_not_found());
        match error {
            ApiError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert!(body.contains("model registry unavailable"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn legacy_failure_envelope_is_an_application_error() {
        let api = serve(Router::new().route(
            "/api/game/new",
            post(|| async {
                Json(json!({"success": false, "error": "generation pipeline exploded"}))
            }),
        ))
        .await;

        let error = api
            .new_game(&NewGameRequest {
                user_prompt: "make pong".to_string(),
                model: None,
            })
            .await
            .expect_err("call should fail");
        match error {
            ApiError::Backend { message } => {
                assert_eq!(message, "generation pipeline exploded");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn legacy_success_envelope_unwraps_data() {
        let api = serve(Router::new().route(
            "/api/game/new",
            post(|| async {
                Json(json!({
                    "success": true,
                    "data": {
                        "conversation_id": "conv-legacy",
                        "message_id": "m1",
                        "game_data": {"title": "Pong", "html_content": "<html></html>"}
                    }
                }))
            }),
        ))
        .await;

        let reply = api
            .new_game(&NewGameRequest {
                user_prompt: "make pong".to_string(),
                model: None,
            })
            .await
            .expect("enveloped success should parse");
        assert_eq!(reply.conversation_id, "conv-legacy");
    }

    #[tokio::test]
    async fn list_conversations_passes_the_limit() {
        let api = serve(Router::new().route(
            "/api/conversations/list",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("limit").map(String::as_str), Some("7"));
                Json(json!([{
                    "intro": "make pong",
                    "conversation_id": "conv-1",
                    "timestamp": "2025-11-02T10:00:00Z",
                    "messages": 3
                }]))
            }),
        ))
        .await;

        let summaries = api
            .list_conversations(7)
            .await
            .expect("listing should succeed");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].messages, 3);
    }

    #[tokio::test]
    async fn health_report_parses() {
        let api = serve(Router::new().route(
            "/api/game/health",
            get(|| async {
                Json(json!({
                    "status": "healthy",
                    "timestamp": "2025-11-02T10:00:00Z",
                    "service": "game-generation-backend"
                }))
            }),
        ))
        .await;

        let report = api.health().await.expect("health should succeed");
        assert_eq!(report.status, "healthy");
        assert_eq!(report.service.as_deref(), Some("game-generation-backend"));
    }

    #[test]
    fn snippet_caps_long_bodies() {
        let long = "x".repeat(1000);
        let cut = snippet(&long);
        assert!(cut.chars().count() <= BODY_SNIPPET_CHARS + 1);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn generate_reply_parses_without_envelope() {
        let value = json!({
            "conversation_id": "c",
            "message_id": "m",
            "game_data": GameData::default(),
        });
        let unwrapped = unwrap_envelope(value.clone()).expect("plain payload passes through");
        assert_eq!(unwrapped, value);
    }
}
