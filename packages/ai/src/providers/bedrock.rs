//! AWS Bedrock provider implementation using the Converse API.

use aws_sdk_bedrockruntime::types::{
    self as bedrock, ContentBlock as BedrockContent, ConversationRole, Message as BedrockMessage,
    SystemContentBlock,
};

use super::{ChatRequest, LlmProvider};
use crate::AiError;

/// AWS Bedrock provider using the Converse API.
///
/// Authentication uses the standard AWS credential chain (env vars, IAM
/// role, `~/.aws/credentials`, or `AWS_BEARER_TOKEN_BEDROCK`).
pub struct BedrockProvider {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockProvider {
    /// Creates a new Bedrock provider.
    ///
    /// Loads AWS configuration from the environment. Bearer-token auth
    /// needs a region for endpoint resolution, so `us-east-1` is assumed
    /// when none is given.
    pub async fn new(model_id: String, region: Option<String>) -> Self {
        let region = region.unwrap_or_else(|| {
            log::info!("No AWS_REGION set; defaulting to us-east-1 for Bedrock");
            "us-east-1".to_string()
        });

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .load()
            .await;
        let client = aws_sdk_bedrockruntime::Client::new(&config);

        Self { client, model_id }
    }
}

#[async_trait::async_trait]
impl LlmProvider for BedrockProvider {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, AiError> {
        let message = BedrockMessage::builder()
            .role(ConversationRole::User)
            .content(BedrockContent::Text(request.user_prompt.to_string()))
            .build()
            .map_err(|e| AiError::Provider {
                message: format!("Failed to build Bedrock Message: {e}"),
            })?;

        let response = self
            .client
            .converse()
            .model_id(&self.model_id)
            .system(SystemContentBlock::Text(request.system_prompt.to_string()))
            .messages(message)
            .inference_config(
                bedrock::InferenceConfiguration::builder()
                    .max_tokens(i32::try_from(request.max_tokens).unwrap_or(i32::MAX))
                    .temperature(request.temperature)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| AiError::Provider {
                message: format!("Bedrock Converse error: {e}"),
            })?;

        let output = response.output().ok_or_else(|| AiError::Provider {
            message: "No output in Bedrock response".to_string(),
        })?;

        let bedrock::ConverseOutput::Message(response_msg) = output else {
            return Err(AiError::Provider {
                message: "Unexpected Bedrock output variant".to_string(),
            });
        };

        let text = response_msg
            .content()
            .iter()
            .filter_map(|block| match block {
                BedrockContent::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(AiError::Provider {
                message: "AI returned empty content".to_string(),
            });
        }

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "bedrock"
    }
}
