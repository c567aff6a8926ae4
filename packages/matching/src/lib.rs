#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Matching and ranking engine for the CO2 marketplace.
//!
//! Everything in this crate is synchronous and pure:
//!
//! - [`geo::distance_km`] computes haversine distance on a 6371 km sphere.
//! - [`filter::find_matches`] keeps the consumers a producer can fully
//!   supply and orders them nearest first.
//! - [`impact::compute_impact`] projects annual revenue, savings, and net
//!   CO2 for one producer/consumer pair.

pub mod filter;
pub mod geo;
pub mod impact;

use carbonflow_marketplace_models::ValidationError;
use thiserror::Error;

pub use filter::find_matches;
pub use geo::distance_km;
pub use impact::compute_impact;

/// Errors raised by the matching engine on invalid input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// The producer record failed validation.
    #[error("Invalid producer {id}: {source}")]
    InvalidProducer {
        /// Producer id.
        id: String,
        /// What was wrong.
        #[source]
        source: ValidationError,
    },

    /// A consumer record failed validation.
    #[error("Invalid consumer {id}: {source}")]
    InvalidConsumer {
        /// Consumer id.
        id: String,
        /// What was wrong.
        #[source]
        source: ValidationError,
    },
}

/// Rounds to 2 decimal places, the precision of every reported figure.
///
/// Rounding works on the exact binary value, so `2.675` (stored just below
/// the half) becomes `2.67`.
#[must_use]
pub fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}
