//! `OpenAI` chat-completions provider.
//!
//! The same wire format serves three deployments: api.openai.com, Azure
//! `OpenAI` (deployment-scoped URL, `api-key` header), and self-hosted
//! `OpenAI`-compatible servers.

use serde::{Deserialize, Serialize};

use super::{ChatRequest, LlmProvider};
use crate::AiError;

/// Azure `OpenAI` REST API version used when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-03-01-preview";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// How requests are authenticated.
enum Auth {
    Bearer(String),
    AzureKey(String),
    None,
}

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    url: String,
    auth: Auth,
    model: String,
    label: &'static str,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a provider for api.openai.com.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self::compatible(OPENAI_BASE_URL, Some(api_key), model)
    }

    /// Creates a provider for any server exposing `/chat/completions` under
    /// `base_url`.
    #[must_use]
    pub fn compatible(base_url: &str, api_key: Option<String>, model: String) -> Self {
        Self {
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            auth: api_key.map_or(Auth::None, Auth::Bearer),
            model,
            label: "openai",
            client: reqwest::Client::new(),
        }
    }

    /// Creates a provider for an Azure `OpenAI` deployment.
    #[must_use]
    pub fn azure(endpoint: &str, api_key: String, deployment: String, api_version: &str) -> Self {
        Self {
            url: format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/'),
            ),
            auth: Auth::AzureKey(api_key),
            model: deployment,
            label: "azure-openai",
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: [OpenAiMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, AiError> {
        let body = OpenAiRequest {
            model: &self.model,
            messages: [
                OpenAiMessage {
                    role: "system",
                    content: request.system_prompt,
                },
                OpenAiMessage {
                    role: "user",
                    content: request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body);

        builder = match &self.auth {
            Auth::Bearer(key) => builder.header("Authorization", format!("Bearer {key}")),
            Auth::AzureKey(key) => builder.header("api-key", key),
            Auth::None => builder,
        };

        let resp = builder.send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err: OpenAiError = serde_json::from_str(&body).unwrap_or_else(|_| OpenAiError {
                error: OpenAiErrorDetail {
                    message: format!("HTTP {status}: {body}"),
                },
            });
            return Err(AiError::Provider {
                message: err.error.message,
            });
        }

        parse_response(&body)
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

/// Extracts the first choice's text from a chat-completions body.
fn parse_response(body: &str) -> Result<String, AiError> {
    let response: OpenAiResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No choices in OpenAI response".to_string(),
        })?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AiError::Provider {
            message: "AI returned empty content".to_string(),
        }),
    }
}
