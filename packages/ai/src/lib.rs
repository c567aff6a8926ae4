#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Narrative analysis of ranked producer/consumer matches.
//!
//! A [`narrator::Narrator`] turns one match into a short justification and
//! two strategic considerations. The stock implementation,
//! [`narrator::LlmNarrator`], prompts an [`providers::LlmProvider`]
//! (`OpenAI` or any `OpenAI`-compatible server, Azure `OpenAI`, Anthropic
//! Claude, or AWS Bedrock when the `bedrock` feature is enabled).
//!
//! [`augment::analyze_matches`] runs the narrator over a ranked list and
//! never fails: when no narrator is configured, or a single call errors,
//! times out, or returns malformed output, that item gets a deterministic
//! fallback analysis instead.

pub mod augment;
pub mod narrator;
pub mod providers;

use thiserror::Error;

/// Errors that can occur while talking to a narrator backend.
///
/// None of these escape [`augment::analyze_matches`]; they are logged and
/// converted to a fallback analysis for the affected match.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The model replied, but not with the expected narrative shape.
    #[error("Malformed narrative: {message}")]
    MalformedNarrative {
        /// Description of what was wrong with the reply.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
