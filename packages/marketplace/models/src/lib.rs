#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Producer, consumer, match, and impact report types for the CO2
//! marketplace.
//!
//! Field names serialize in `snake_case` because the web frontend reads
//! them verbatim (`co2_supply_tonnes_per_week`, `distance_km`, ...). A
//! [`Match`] is a [`Consumer`] with its distance flattened alongside, and an
//! [`AnalyzedMatch`] is a [`Match`] with an `analysis` object attached.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a record fails field validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Latitude outside `[-90, 90]` or not finite.
    #[error("Latitude {lat} is outside [-90, 90]")]
    LatitudeOutOfRange {
        /// The rejected value.
        lat: f64,
    },

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("Longitude {lon} is outside [-180, 180]")]
    LongitudeOutOfRange {
        /// The rejected value.
        lon: f64,
    },

    /// A weekly tonnage was negative or not finite.
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidTonnage {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A distance was negative or not finite.
    #[error("distance_km must be a finite, non-negative number (got {value})")]
    InvalidDistance {
        /// The rejected value.
        value: f64,
    },
}

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Location {
    /// Creates a location from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Checks that both coordinates are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::LatitudeOutOfRange`] or
    /// [`ValidationError::LongitudeOutOfRange`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(ValidationError::LatitudeOutOfRange { lat: self.lat });
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(ValidationError::LongitudeOutOfRange { lon: self.lon });
        }
        Ok(())
    }
}

/// A facility that emits capturable CO2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    /// Unique id (`prod_<uuid>` for records created through the API).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Facility location.
    pub location: Location,
    /// CO2 available for offtake each week, in tonnes.
    pub co2_supply_tonnes_per_week: f64,
}

impl Producer {
    /// Validates the fields the matching engine depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an invalid location or supply.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.location.validate()?;
        validate_tonnage("co2_supply_tonnes_per_week", self.co2_supply_tonnes_per_week)
    }
}

/// A facility that buys CO2 as an industrial input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumer {
    /// Unique id (`cons_<uuid>` for records created through the API).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Industry the CO2 is used in (e.g. "Greenhouse Agriculture").
    pub industry: String,
    /// Facility location.
    pub location: Location,
    /// CO2 required each week, in tonnes.
    pub co2_demand_tonnes_per_week: f64,
}

impl Consumer {
    /// Validates the fields the matching engine depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an invalid location or demand.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.location.validate()?;
        validate_tonnage("co2_demand_tonnes_per_week", self.co2_demand_tonnes_per_week)
    }
}

/// Registration payload for a producer; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProducer {
    /// Display name.
    pub name: String,
    /// Facility location.
    pub location: Location,
    /// Weekly CO2 supply in tonnes.
    pub co2_supply_tonnes_per_week: f64,
}

impl NewProducer {
    /// Validates the payload before it is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty name, invalid location, or
    /// invalid supply.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)?;
        self.location.validate()?;
        validate_tonnage("co2_supply_tonnes_per_week", self.co2_supply_tonnes_per_week)
    }

    /// Attaches an id, producing the stored record.
    #[must_use]
    pub fn with_id(self, id: String) -> Producer {
        Producer {
            id,
            name: self.name,
            location: self.location,
            co2_supply_tonnes_per_week: self.co2_supply_tonnes_per_week,
        }
    }
}

/// Registration payload for a consumer; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConsumer {
    /// Display name.
    pub name: String,
    /// Industry the CO2 is used in.
    pub industry: String,
    /// Facility location.
    pub location: Location,
    /// Weekly CO2 demand in tonnes.
    pub co2_demand_tonnes_per_week: f64,
}

impl NewConsumer {
    /// Validates the payload before it is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty name or industry, invalid
    /// location, or invalid demand.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)?;
        validate_name("industry", &self.industry)?;
        self.location.validate()?;
        validate_tonnage("co2_demand_tonnes_per_week", self.co2_demand_tonnes_per_week)
    }

    /// Attaches an id, producing the stored record.
    #[must_use]
    pub fn with_id(self, id: String) -> Consumer {
        Consumer {
            id,
            name: self.name,
            industry: self.industry,
            location: self.location,
            co2_demand_tonnes_per_week: self.co2_demand_tonnes_per_week,
        }
    }
}

/// A feasible consumer for some producer, with the great-circle distance
/// between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// The matched consumer.
    #[serde(flatten)]
    pub consumer: Consumer,
    /// Producer-to-consumer distance in km, rounded to 2 decimals.
    pub distance_km: f64,
}

impl Match {
    /// Validates the consumer fields and the attached distance.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an invalid consumer or distance.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.consumer.validate()?;
        if !self.distance_km.is_finite() || self.distance_km < 0.0 {
            return Err(ValidationError::InvalidDistance {
                value: self.distance_km,
            });
        }
        Ok(())
    }
}

/// Narrative assessment of a single match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// 1-based position in the ranked list.
    pub rank: u32,
    /// Short paragraph on why the partnership does or does not fit.
    pub justification: String,
    /// Exactly two decision factors.
    pub strategic_considerations: [String; 2],
}

/// A match with its [`Analysis`] attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedMatch {
    /// The underlying match.
    #[serde(flatten)]
    pub matched: Match,
    /// The narrative assessment.
    pub analysis: Analysis,
}

/// Result of the analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// One-sentence summary of the batch.
    pub overall_summary: String,
    /// Matches in rank order.
    pub ranked_matches: Vec<AnalyzedMatch>,
}

/// Projected financial and environmental figures for one partnership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    /// Producer display name.
    pub producer_name: String,
    /// Consumer display name.
    pub consumer_name: String,
    /// CO2 transferred per year, in tonnes.
    pub annual_tonnage: f64,
    /// Money figures.
    pub financials: Financials,
    /// CO2 figures.
    pub environmental: Environmental,
}

/// Annual money figures of an [`ImpactReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    /// Producer income from selling captured CO2 at the credit price.
    pub producer_annual_revenue: f64,
    /// Consumer savings against buying industrial CO2.
    pub consumer_annual_savings: f64,
    /// Value of the carbon credits generated.
    pub carbon_credit_value: f64,
}

/// Annual CO2 figures of an [`ImpactReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environmental {
    /// Tonnes kept out of the atmosphere.
    pub co2_diverted: f64,
    /// Tonnes emitted by delivery logistics.
    pub estimated_logistics_emissions: f64,
    /// Diverted minus logistics emissions.
    pub net_co2_impact: f64,
}

fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn validate_tonnage(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidTonnage { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer() -> Consumer {
        Consumer {
            id: "cons_1".to_string(),
            name: "Valley Greenhouses".to_string(),
            industry: "Agriculture".to_string(),
            location: Location::new(52.1, 5.2),
            co2_demand_tonnes_per_week: 40.0,
        }
    }

    #[test]
    fn location_bounds_are_inclusive() {
        assert!(Location::new(90.0, 180.0).validate().is_ok());
        assert!(Location::new(-90.0, -180.0).validate().is_ok());
        assert_eq!(
            Location::new(90.5, 0.0).validate(),
            Err(ValidationError::LatitudeOutOfRange { lat: 90.5 })
        );
        assert_eq!(
            Location::new(0.0, -180.1).validate(),
            Err(ValidationError::LongitudeOutOfRange { lon: -180.1 })
        );
        assert!(Location::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn rejects_negative_and_non_finite_tonnage() {
        let mut c = consumer();
        c.co2_demand_tonnes_per_week = -1.0;
        assert!(matches!(
            c.validate(),
            Err(ValidationError::InvalidTonnage { .. })
        ));
        c.co2_demand_tonnes_per_week = f64::INFINITY;
        assert!(c.validate().is_err());
        c.co2_demand_tonnes_per_week = 0.0;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn new_producer_requires_name() {
        let new = NewProducer {
            name: "   ".to_string(),
            location: Location::new(0.0, 0.0),
            co2_supply_tonnes_per_week: 10.0,
        };
        assert_eq!(
            new.validate(),
            Err(ValidationError::EmptyField { field: "name" })
        );
    }

    #[test]
    fn match_rejects_negative_distance() {
        let m = Match {
            consumer: consumer(),
            distance_km: -0.5,
        };
        assert_eq!(
            m.validate(),
            Err(ValidationError::InvalidDistance { value: -0.5 })
        );
    }

    #[test]
    fn match_serializes_flat() {
        let m = Match {
            consumer: consumer(),
            distance_km: 12.34,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["name"], "Valley Greenhouses");
        assert_eq!(json["location"]["lat"], 52.1);
        assert_eq!(json["distance_km"], 12.34);
        assert!(json.get("consumer").is_none());

        let back: Match = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn analysis_requires_exactly_two_considerations() {
        let three = serde_json::json!({
            "rank": 1,
            "justification": "ok",
            "strategic_considerations": ["a", "b", "c"],
        });
        assert!(serde_json::from_value::<Analysis>(three).is_err());

        let two = serde_json::json!({
            "rank": 1,
            "justification": "ok",
            "strategic_considerations": ["a", "b"],
        });
        assert!(serde_json::from_value::<Analysis>(two).is_ok());
    }
}
