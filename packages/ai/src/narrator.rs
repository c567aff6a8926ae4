//! Narrative generation for a single producer/consumer match.

use carbonflow_marketplace_models::{Match, Producer};
use serde::Deserialize;

use crate::AiError;
use crate::providers::{ChatRequest, LlmProvider};

/// System prompt sent with every narration request.
pub const SYSTEM_PROMPT: &str =
    "You are an expert analyst providing data in a strict JSON format.";

const TEMPERATURE: f32 = 0.5;
const MAX_TOKENS: u32 = 500;

/// Justification text plus exactly two decision factors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Narrative {
    /// Why the partnership is or is not a good fit.
    pub justification: String,
    /// Two short bullet-style considerations.
    pub strategic_considerations: [String; 2],
}

/// Something that can write a [`Narrative`] for a match.
#[async_trait::async_trait]
pub trait Narrator: Send + Sync {
    /// Produces the narrative for `matched` as a partner of `producer`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the backend fails or its reply cannot be
    /// parsed into a [`Narrative`].
    async fn narrate(&self, producer: &Producer, matched: &Match) -> Result<Narrative, AiError>;
}

/// [`Narrator`] backed by an LLM provider.
pub struct LlmNarrator {
    provider: Box<dyn LlmProvider>,
}

impl LlmNarrator {
    /// Wraps a provider.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl Narrator for LlmNarrator {
    async fn narrate(&self, producer: &Producer, matched: &Match) -> Result<Narrative, AiError> {
        let prompt = build_prompt(producer, matched);
        let reply = self
            .provider
            .complete(&ChatRequest {
                system_prompt: SYSTEM_PROMPT,
                user_prompt: &prompt,
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            })
            .await?;
        parse_narrative(&reply)
    }
}

/// Builds the user prompt for one match.
#[must_use]
pub fn build_prompt(producer: &Producer, matched: &Match) -> String {
    let consumer = &matched.consumer;
    format!(
        r#"You are a sustainability business analyst. Given the following CO2 Producer and a potential Consumer, provide a brief analysis.

Producer:
- Name: "{producer_name}"
- Weekly CO2 Supply: {supply} tonnes

Consumer:
- Name: "{consumer_name}"
- Industry: "{industry}"
- Weekly CO2 Demand: {demand} tonnes
- Distance: {distance} km

Your response must be a single, valid JSON object with two keys: "justification" and "strategic_considerations".
- "justification": A concise paragraph explaining why this is or is not a good partnership.
- "strategic_considerations": An array of 2 short bullet-point style strings highlighting key decision factors."#,
        producer_name = producer.name,
        supply = producer.co2_supply_tonnes_per_week,
        consumer_name = consumer.name,
        industry = consumer.industry,
        demand = consumer.co2_demand_tonnes_per_week,
        distance = matched.distance_km,
    )
}

/// Parses a model reply into a [`Narrative`].
///
/// Accepts a bare JSON object, optionally wrapped in a markdown code fence.
///
/// # Errors
///
/// Returns [`AiError::MalformedNarrative`] if the reply is not a JSON object
/// with a non-empty `justification` and exactly two non-empty
/// `strategic_considerations`.
pub fn parse_narrative(reply: &str) -> Result<Narrative, AiError> {
    let json = strip_code_fence(reply.trim());

    let narrative: Narrative =
        serde_json::from_str(json).map_err(|e| AiError::MalformedNarrative {
            message: e.to_string(),
        })?;

    if narrative.justification.trim().is_empty() {
        return Err(AiError::MalformedNarrative {
            message: "empty justification".to_string(),
        });
    }
    if narrative
        .strategic_considerations
        .iter()
        .any(|s| s.trim().is_empty())
    {
        return Err(AiError::MalformedNarrative {
            message: "empty strategic consideration".to_string(),
        });
    }

    Ok(narrative)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
