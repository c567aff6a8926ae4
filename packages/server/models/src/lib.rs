#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the marketplace server.
//!
//! Field names are `snake_case` on the wire; the web frontend reads them
//! verbatim. Request bodies use `Option` fields so a missing key can be
//! answered with a specific 400 message instead of a generic parse error.

use carbonflow_marketplace_models::{Consumer, Match, Producer};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Whether a narrator backend is configured.
    pub narrator_available: bool,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// Query parameters for `GET /api/matches`.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchesQueryParams {
    pub producer_id: Option<String>,
}

/// `201` body for `POST /api/producers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerCreated {
    pub message: String,
    pub producer: Producer,
}

/// `201` body for `POST /api/consumers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerCreated {
    pub message: String,
    pub consumer: Consumer,
}

/// Body of `POST /api/analyze-matches`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeMatchesRequest {
    /// The producer the matches were found for.
    pub producer: Option<Producer>,
    /// Ranked matches, as returned by `GET /api/matches`.
    pub matches: Option<Vec<Match>>,
}

/// Body of `POST /api/impact-model`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactRequest {
    pub producer: Option<Producer>,
    /// The chosen match; must carry `distance_km`.
    pub consumer: Option<Match>,
}

/// Body of `POST /api/geocode`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocodeRequest {
    /// Free-form address to look up.
    pub address: Option<String>,
}
