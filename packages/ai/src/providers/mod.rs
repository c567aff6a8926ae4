//! LLM provider abstraction and implementations.
//!
//! Supports `OpenAI` (and `OpenAI`-compatible servers), Azure `OpenAI`,
//! Anthropic, and AWS Bedrock via a common trait.

pub mod anthropic;
#[cfg(feature = "bedrock")]
pub mod bedrock;
pub mod openai;

use crate::AiError;

/// A single-turn completion request.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// System prompt framing the model's role.
    pub system_prompt: &'a str,
    /// The user turn.
    pub user_prompt: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends a single-turn request and returns the concatenated text of the
    /// reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the reply has no text.
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, AiError>;

    /// Short provider label for logs.
    fn name(&self) -> &'static str;
}

/// Creates an LLM provider from process environment variables.
///
/// See [`create_provider`] for the variables consulted.
///
/// # Errors
///
/// Returns [`AiError::Config`] if a provider is requested but incompletely
/// configured.
#[allow(clippy::unused_async)] // async is needed when bedrock feature is enabled
pub async fn create_provider_from_env() -> Result<Option<Box<dyn LlmProvider>>, AiError> {
    create_provider(|key| std::env::var(key).ok()).await
}

/// Creates an LLM provider from a variable lookup.
///
/// If `AI_PROVIDER` is set, uses that provider. Otherwise auto-detects from
/// available credentials:
///
/// 1. `AZURE_OPENAI_ENDPOINT` and `AZURE_OPENAI_API_KEY` -> Azure `OpenAI`
/// 2. `ANTHROPIC_API_KEY` -> Anthropic Claude
/// 3. `OPENAI_API_KEY` or `AI_BASE_URL` -> `OpenAI` / compatible server
/// 4. `AWS_BEARER_TOKEN_BEDROCK` or `AWS_PROFILE` -> Bedrock
///
/// Returns `Ok(None)` when nothing is configured: the narrator is simply
/// unavailable and callers fall back to templated analysis.
///
/// # Errors
///
/// Returns [`AiError::Config`] if a provider is requested but a required
/// variable is missing, or the provider name is unknown.
#[allow(clippy::unused_async)]
pub async fn create_provider<F>(lookup: F) -> Result<Option<Box<dyn LlmProvider>>, AiError>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    let Some(provider) = lookup("AI_PROVIDER").or_else(|| detect_provider(&lookup)) else {
        log::warn!(
            "No AI credentials detected. Set one of: AZURE_OPENAI_ENDPOINT + \
             AZURE_OPENAI_API_KEY, ANTHROPIC_API_KEY, OPENAI_API_KEY, AI_BASE_URL, \
             or AWS credentials. Match analysis will use templated summaries."
        );
        return Ok(None);
    };

    let require = |key: &str| {
        lookup(key).ok_or_else(|| AiError::Config {
            message: format!("{key} environment variable not set"),
        })
    };

    let provider: Box<dyn LlmProvider> = match provider.to_lowercase().as_str() {
        "azure" | "azure-openai" => {
            let endpoint = require("AZURE_OPENAI_ENDPOINT")?;
            let api_key = require("AZURE_OPENAI_API_KEY")?;
            let deployment = require("AZURE_OPENAI_DEPLOYMENT_NAME")?;
            let api_version = lookup("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| openai::DEFAULT_AZURE_API_VERSION.to_string());
            Box::new(openai::OpenAiProvider::azure(
                &endpoint,
                api_key,
                deployment,
                &api_version,
            ))
        }
        "anthropic" | "claude" => {
            let api_key = require("ANTHROPIC_API_KEY")?;
            let model =
                lookup("AI_MODEL").unwrap_or_else(|| "claude-sonnet-4-20250514".to_string());
            Box::new(anthropic::AnthropicProvider::new(api_key, model))
        }
        "openai" | "gpt" => {
            let model = lookup("AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
            match lookup("AI_BASE_URL") {
                // Local servers (Ollama, vLLM, llama.cpp) usually take no key.
                Some(base_url) => Box::new(openai::OpenAiProvider::compatible(
                    &base_url,
                    lookup("OPENAI_API_KEY"),
                    model,
                )),
                None => Box::new(openai::OpenAiProvider::new(
                    require("OPENAI_API_KEY")?,
                    model,
                )),
            }
        }
        #[cfg(feature = "bedrock")]
        "bedrock" | "aws" => {
            let model = lookup("AI_MODEL")
                .unwrap_or_else(|| "us.anthropic.claude-sonnet-4-20250514-v1:0".to_string());
            let region = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION"));
            Box::new(bedrock::BedrockProvider::new(model, region).await)
        }
        #[cfg(not(feature = "bedrock"))]
        "bedrock" | "aws" => {
            return Err(AiError::Config {
                message: "Bedrock support not compiled. Rebuild with --features bedrock"
                    .to_string(),
            });
        }
        other => {
            return Err(AiError::Config {
                message: format!(
                    "Unknown AI provider: {other}. Use 'azure', 'anthropic', 'openai', or 'bedrock'."
                ),
            });
        }
    };

    log::info!("Narrator backend: {}", provider.name());

    Ok(Some(provider))
}

/// Picks a provider name from whichever credentials are present.
fn detect_provider<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let has = |key: &str| lookup(key).is_some_and(|v| !v.is_empty());

    if has("AZURE_OPENAI_ENDPOINT") && has("AZURE_OPENAI_API_KEY") {
        log::info!("Auto-detected AI provider: Azure OpenAI");
        return Some("azure".to_string());
    }

    if has("ANTHROPIC_API_KEY") {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return Some("anthropic".to_string());
    }

    if has("OPENAI_API_KEY") || has("AI_BASE_URL") {
        log::info!("Auto-detected AI provider: OpenAI-compatible");
        return Some("openai".to_string());
    }

    if has("AWS_BEARER_TOKEN_BEDROCK") || has("AWS_PROFILE") {
        log::info!("Auto-detected AI provider: Bedrock (AWS credentials found)");
        return Some("bedrock".to_string());
    }

    None
}
