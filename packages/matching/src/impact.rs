//! Economic and environmental impact model for a matched pair.
//!
//! All figures are annualised from the binding weekly tonnage, which is the
//! smaller of the producer's supply and the consumer's demand. Prices and
//! the logistics emission factor are fixed policy parameters.

use carbonflow_marketplace_models::{
    Environmental, Financials, ImpactReport, Match, Producer, ValidationError,
};

use crate::{MatchError, round2};

/// Price paid to the producer per tonne, as carbon credits.
pub const CARBON_CREDIT_PRICE_PER_TONNE: f64 = 25.00;

/// Market price of industrial CO2 the consumer no longer buys, per tonne.
pub const INDUSTRIAL_CO2_PRICE_PER_TONNE: f64 = 75.00;

/// Delivery weeks in a year.
pub const WEEKS_PER_YEAR: f64 = 52.0;

/// Tonnes of CO2 emitted per 100 km of delivery distance, once per week.
pub const LOGISTICS_EMISSIONS_PER_100KM: f64 = 0.05;

/// Computes the annual [`ImpactReport`] for `producer` supplying `consumer`.
///
/// Internal arithmetic keeps full precision; every reported figure is
/// rounded to 2 decimals.
///
/// # Errors
///
/// Returns [`MatchError`] if the supply, demand, or distance is negative or
/// not finite.
pub fn compute_impact(producer: &Producer, consumer: &Match) -> Result<ImpactReport, MatchError> {
    let supply = producer.co2_supply_tonnes_per_week;
    if !supply.is_finite() || supply < 0.0 {
        return Err(MatchError::InvalidProducer {
            id: producer.id.clone(),
            source: ValidationError::InvalidTonnage {
                field: "co2_supply_tonnes_per_week",
                value: supply,
            },
        });
    }

    let demand = consumer.consumer.co2_demand_tonnes_per_week;
    if !demand.is_finite() || demand < 0.0 {
        return Err(MatchError::InvalidConsumer {
            id: consumer.consumer.id.clone(),
            source: ValidationError::InvalidTonnage {
                field: "co2_demand_tonnes_per_week",
                value: demand,
            },
        });
    }

    let distance = consumer.distance_km;
    if !distance.is_finite() || distance < 0.0 {
        return Err(MatchError::InvalidConsumer {
            id: consumer.consumer.id.clone(),
            source: ValidationError::InvalidDistance { value: distance },
        });
    }

    let tonnes_per_week = supply.min(demand);
    let tonnes_per_year = tonnes_per_week * WEEKS_PER_YEAR;

    let producer_revenue = tonnes_per_year * CARBON_CREDIT_PRICE_PER_TONNE;
    let consumer_savings = tonnes_per_year * INDUSTRIAL_CO2_PRICE_PER_TONNE;

    let logistics_emissions = (distance / 100.0) * LOGISTICS_EMISSIONS_PER_100KM * WEEKS_PER_YEAR;
    let net_co2_impact = tonnes_per_year - logistics_emissions;

    Ok(ImpactReport {
        producer_name: producer.name.clone(),
        consumer_name: consumer.consumer.name.clone(),
        annual_tonnage: round2(tonnes_per_year),
        financials: Financials {
            producer_annual_revenue: round2(producer_revenue),
            consumer_annual_savings: round2(consumer_savings),
            carbon_credit_value: round2(producer_revenue),
        },
        environmental: Environmental {
            co2_diverted: round2(tonnes_per_year),
            estimated_logistics_emissions: round2(logistics_emissions),
            net_co2_impact: round2(net_co2_impact),
        },
    })
}
