//! Model routing layer: resolves logical model names to concrete backends.
//!
//! Logical names have the shape `<provider>:<model>` or `custom:<alias>`.
//! Resolvers are registered explicitly at process start, keyed by scheme;
//! names with an unknown scheme fall through to the default resolver.

pub mod api_service;
pub mod message;

pub use api_service::{ApiServiceBackend, DEFAULT_BASE_URL, model_key};
pub use message::{
    MessagePart, ModelMessage, ModelResponse, ResponsePart, Role, Usage, estimate_tokens,
    render_prompt,
};

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Name of the tool-call-style part carrying a bridged structured result.
pub const STRUCTURED_RESULT_TOOL: &str = "final_result";

/// A concrete completion backend. Implementations receive the rendered
/// prompt and the model key they resolved from the logical name.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Map a logical model name to the key this backend understands.
    fn resolve_model(&self, logical: &str) -> String {
        logical.to_string()
    }

    /// Complete a prompt, returning the raw response text.
    async fn complete(&self, prompt: &str, model: &str) -> Result<String>;
}

/// Registry of scheme-keyed resolvers with a default fallthrough.
pub struct ModelRouter {
    resolvers: HashMap<String, Arc<dyn ModelBackend>>,
    default_backend: Arc<dyn ModelBackend>,
}

impl ModelRouter {
    pub fn new(default_backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            resolvers: HashMap::new(),
            default_backend,
        }
    }

    /// Standard process-start wiring: the local API service handles the
    /// `custom:` scheme and doubles as the default resolver for any scheme
    /// no provider-native backend has been registered for.
    pub fn with_api_service(base_url: &str) -> Result<Self> {
        let backend: Arc<dyn ModelBackend> = Arc::new(ApiServiceBackend::new(base_url)?);
        let mut router = Self::new(Arc::clone(&backend));
        router.register("custom", backend);
        Ok(router)
    }

    /// Register a resolver for a scheme (e.g., "custom", "openai").
    pub fn register(&mut self, scheme: impl Into<String>, backend: Arc<dyn ModelBackend>) {
        self.resolvers.insert(scheme.into(), backend);
    }

    fn backend_for(&self, logical: &str) -> &Arc<dyn ModelBackend> {
        let scheme = logical.split_once(':').map(|(scheme, _)| scheme);
        scheme
            .and_then(|s| self.resolvers.get(s))
            .unwrap_or(&self.default_backend)
    }

    /// Complete messages as plain text.
    pub async fn complete_text(
        &self,
        logical_model: &str,
        messages: &[ModelMessage],
    ) -> Result<ModelResponse> {
        let backend = self.backend_for(logical_model);
        let model = backend.resolve_model(logical_model);
        let prompt = render_prompt(messages);
        debug!(model = %model, logical = %logical_model, "dispatching model request");

        let raw = backend.complete(&prompt, &model).await?;
        Ok(ModelResponse {
            model: logical_model.to_string(),
            usage: Usage {
                input_tokens: estimate_tokens(&prompt),
                output_tokens: estimate_tokens(&raw),
            },
            parts: vec![ResponsePart::Text { text: raw }],
        })
    }

    /// Complete messages, bridging a JSON response body into a structured
    /// `final_result` tool-call part. A body that does not parse as JSON is
    /// returned as a text part instead.
    pub async fn complete_structured(
        &self,
        logical_model: &str,
        messages: &[ModelMessage],
    ) -> Result<ModelResponse> {
        let backend = self.backend_for(logical_model);
        let model = backend.resolve_model(logical_model);
        let prompt = render_prompt(messages);
        debug!(model = %model, logical = %logical_model, "dispatching structured model request");

        let raw = backend.complete(&prompt, &model).await?;
        let usage = Usage {
            input_tokens: estimate_tokens(&prompt),
            output_tokens: estimate_tokens(&raw),
        };

        let parsed: Option<Value> = serde_json::from_str(raw.trim()).ok().or_else(|| {
            extract_json_block(&raw).and_then(|block| serde_json::from_str(block).ok())
        });

        let parts = match parsed {
            Some(arguments) => vec![ResponsePart::ToolCall {
                name: STRUCTURED_RESULT_TOOL.to_string(),
                arguments,
            }],
            None => vec![ResponsePart::Text { text: raw }],
        };

        Ok(ModelResponse {
            model: logical_model.to_string(),
            parts,
            usage,
        })
    }
}

/// Extract a JSON block from model response text.
///
/// Handles two common patterns:
/// 1. JSON wrapped in ```json ... ``` code blocks
/// 2. Raw JSON objects (finds first { to last })
pub fn extract_json_block(text: &str) -> Option<&str> {
    // Look for ```json ... ``` blocks
    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return Some(text[content_start..content_start + end].trim());
        }
    }

    // Try finding raw JSON object
    if let Some(start) = text.find('{')
        && let Some(end) = text.rfind('}')
    {
        return Some(&text[start..=end]);
    }

    None
}
