//! HTTP backend for the local model API service.
//!
//! The service wraps a subscription-backed CLI behind two endpoints:
//! `GET /health` and `POST /claude` with body `{prompt, model, timeout}`.
//! A health probe must succeed before the first completion; failure is fatal
//! with an instructional message.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::ModelBackend;
use crate::errors::HiveError;

/// Default base URL of the local model API service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:47291";

/// Seconds granted to the service for one completion.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Socket-level timeout; longer than the request timeout so the service can
/// report its own timeout first.
pub const DEFAULT_SOCKET_TIMEOUT_SECS: u64 = 150;

/// Concrete model key used when a custom alias is unknown.
const DEFAULT_MODEL_KEY: &str = "sonnet";

/// Map a logical `custom:` alias to the model key the service understands.
///
/// Non-`custom:` names pass through verbatim; unknown aliases fall back to
/// the default key.
pub fn model_key(logical: &str) -> String {
    match logical {
        "custom:max-subscription" => DEFAULT_MODEL_KEY.to_string(),
        "custom:claude-opus-4" => "opus".to_string(),
        "custom:claude-sonnet-4" => "sonnet".to_string(),
        "custom:claude-3-7-sonnet" => "claude-3-7-sonnet-20250219".to_string(),
        "custom:claude-3-5-haiku" => "haiku".to_string(),
        other if other.starts_with("custom:") => DEFAULT_MODEL_KEY.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    response: String,
}

/// Backend that POSTs completions to the local model API service.
pub struct ApiServiceBackend {
    base_url: String,
    client: reqwest::Client,
    request_timeout_secs: u64,
    health: OnceCell<()>,
}

impl ApiServiceBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_SOCKET_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client for model API service")?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            health: OnceCell::new(),
        })
    }

    /// Probe `GET /health`; anything but `200 {"status": "healthy"}` means
    /// the service is not running.
    async fn check_health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let healthy = match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response
                .json::<HealthResponse>()
                .await
                .map(|body| body.status == "healthy")
                .unwrap_or(false),
            _ => false,
        };

        if healthy {
            Ok(())
        } else {
            Err(HiveError::BackendUnavailable(format!(
                "model API service is not running at {}\n\
                 Start the service with: cd .claude/claude-api-service && docker-compose up -d\n\
                 Or check service health at: {}/health",
                self.base_url, self.base_url
            ))
            .into())
        }
    }

    async fn call_service(&self, prompt: &str, model: &str) -> Result<String> {
        let url = format!("{}/claude", self.base_url);
        let body = serde_json::json!({
            "prompt": prompt,
            "model": model,
            "timeout": self.request_timeout_secs,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.classify_transport_error(err))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let wait_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(2);
            return Err(HiveError::RateLimited { wait_secs }.into());
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(
                HiveError::BackendUnavailable(format!("API service returned {}: {}", status, text))
                    .into(),
            );
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("API service returned a malformed completion body")?;
        Ok(completion.response)
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> anyhow::Error {
        if err.is_timeout() {
            HiveError::Timeout {
                secs: self.request_timeout_secs,
            }
            .into()
        } else {
            HiveError::BackendUnavailable(format!("request to model API service failed: {}", err))
                .into()
        }
    }
}

#[async_trait::async_trait]
impl ModelBackend for ApiServiceBackend {
    fn resolve_model(&self, logical: &str) -> String {
        model_key(logical)
    }

    async fn complete(&self, prompt: &str, model: &str) -> Result<String> {
        self.health
            .get_or_try_init(|| self.check_health())
            .await?;
        self.call_service(prompt, model).await
    }
}
