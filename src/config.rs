use anyhow::{Context, Result};
use std::time::Duration;

const BACKEND_URL_VAR: &str = "PLAYFORGE_BACKEND_URL";
const REQUEST_TIMEOUT_VAR: &str = "PLAYFORGE_REQUEST_TIMEOUT_SECS";
const GENERATE_TIMEOUT_VAR: &str = "PLAYFORGE_GENERATE_TIMEOUT_SECS";
const HEALTH_POLL_VAR: &str = "PLAYFORGE_HEALTH_POLL_SECS";
const PREFERRED_MODEL_VAR: &str = "PLAYFORGE_MODEL";
const HISTORY_LIMIT_VAR: &str = "PLAYFORGE_HISTORY_LIMIT";

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Runtime configuration, read once at startup from the environment
/// (after `dotenvy` has folded in any `.env` file).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    /// Deadline for metadata calls (models, conversations, health).
    pub request_timeout: Duration,
    /// Deadline for generation calls; game generation is slow.
    pub generate_timeout: Duration,
    pub health_poll_interval: Duration,
    /// Model id to preselect in the picker, if the backend offers it.
    pub preferred_model: Option<String>,
    /// Result cap for the conversation history listing.
    pub history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            generate_timeout: Duration::from_secs(300),
            health_poll_interval: Duration::from_secs(5),
            preferred_model: None,
            history_limit: 20,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend_url = match std::env::var(BACKEND_URL_VAR) {
            Ok(raw) => normalize_base_url(&raw)
                .with_context(|| format!("invalid {BACKEND_URL_VAR}: {raw:?}"))?,
            Err(_) => defaults.backend_url,
        };

        Ok(Self {
            backend_url,
            request_timeout: duration_from_env(REQUEST_TIMEOUT_VAR, defaults.request_timeout)?,
            generate_timeout: duration_from_env(GENERATE_TIMEOUT_VAR, defaults.generate_timeout)?,
            health_poll_interval: duration_from_env(HEALTH_POLL_VAR, defaults.health_poll_interval)?,
            preferred_model: std::env::var(PREFERRED_MODEL_VAR)
                .ok()
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty()),
            history_limit: usize_from_env(HISTORY_LIMIT_VAR, defaults.history_limit)?,
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        anyhow::bail!("expected an http(s) URL");
    }
    Ok(trimmed.to_string())
}

fn duration_from_env(var: &str, default: Duration) -> Result<Duration> {
    match std::env::var(var) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{var} must be a whole number of seconds, got {raw:?}"))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(default),
    }
}

fn usize_from_env(var: &str, default: usize) -> Result<usize> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{var} must be a non-negative integer, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_base_url;

    #[test]
    fn normalize_base_url_strips_trailing_slash() {
        let url = normalize_base_url("http://localhost:8000/").expect("url should normalize");
        assert_eq!(url, "http://localhost:8000");
    }

    #[test]
    fn normalize_base_url_rejects_bare_host() {
        assert!(normalize_base_url("localhost:8000").is_err());
    }
}
