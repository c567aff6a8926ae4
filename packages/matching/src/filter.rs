//! Feasibility filtering and distance ranking.

use carbonflow_marketplace_models::{Consumer, Match, Producer};

use crate::{MatchError, geo, round2};

/// Returns the consumers `producer` can fully supply, nearest first.
///
/// A consumer is feasible only if its weekly demand does not exceed the
/// producer's total weekly supply; partial fulfilment is never considered.
/// Distances are rounded to 2 decimals before sorting, and consumers at
/// equal rounded distance keep their input order.
///
/// # Errors
///
/// Returns [`MatchError`] if the producer or any consumer has an invalid
/// location or tonnage.
pub fn find_matches(producer: &Producer, consumers: &[Consumer]) -> Result<Vec<Match>, MatchError> {
    producer
        .validate()
        .map_err(|source| MatchError::InvalidProducer {
            id: producer.id.clone(),
            source,
        })?;

    let mut matches = Vec::new();

    for consumer in consumers {
        consumer
            .validate()
            .map_err(|source| MatchError::InvalidConsumer {
                id: consumer.id.clone(),
                source,
            })?;

        let distance_km = round2(geo::distance_km(producer.location, consumer.location));

        if consumer.co2_demand_tonnes_per_week <= producer.co2_supply_tonnes_per_week {
            matches.push(Match {
                consumer: consumer.clone(),
                distance_km,
            });
        }
    }

    // `sort_by` is stable, which keeps input order for ties.
    matches.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    log::debug!(
        "Producer {} matched {}/{} consumers",
        producer.id,
        matches.len(),
        consumers.len()
    );

    Ok(matches)
}
