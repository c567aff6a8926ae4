#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding for participant registration.
//!
//! Resolves a free-form address to a [`Location`] using a Nominatim /
//! `OpenStreetMap` search endpoint. The public instance allows at most one
//! request per second and requires an identifying `User-Agent`.

pub mod nominatim;

use carbonflow_marketplace_models::Location;
use thiserror::Error;

/// Public Nominatim search endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// `User-Agent` sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "carbonflow";

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Geocoder returned HTTP {status}")]
    Status {
        /// Response status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Where and how to reach the geocoding service.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Search endpoint URL.
    pub base_url: String,
    /// Identifying `User-Agent` header value.
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Reusable geocoding client.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    base_url: String,
}

impl Geocoder {
    /// Builds a client for the configured service.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Resolves `address` to coordinates. `Ok(None)` means the service had
    /// no match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the response is
    /// malformed.
    pub async fn geocode(&self, address: &str) -> Result<Option<Location>, GeocodeError> {
        let result = nominatim::geocode_freeform(&self.client, &self.base_url, address).await;
        match &result {
            Ok(Some(location)) => {
                log::debug!("Geocoded {address:?} to ({}, {})", location.lat, location.lon);
            }
            Ok(None) => log::debug!("No geocoding match for {address:?}"),
            Err(e) => log::warn!("Geocoding {address:?} failed: {e}"),
        }
        result
    }
}
