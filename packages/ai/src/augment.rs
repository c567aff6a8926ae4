//! Ranks matches and attaches an [`Analysis`] to each one.
//!
//! Every input match comes back with an analysis, in input order. Narrator
//! calls run concurrently (bounded by [`AugmentOptions::concurrency`]) and
//! each is capped by [`AugmentOptions::timeout`]. A missing narrator, a
//! failed call, an expired timeout, or an unparsable reply all turn into a
//! [`NarrationOutcome::Fallback`] for that one item.

use std::time::Duration;

use carbonflow_marketplace_models::{Analysis, AnalysisReport, AnalyzedMatch, Match, Producer};
use futures::StreamExt as _;

use crate::narrator::{Narrative, Narrator};

/// Default per-item narrator timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of narrator calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Tuning for [`augment`] and [`analyze_matches`].
#[derive(Debug, Clone, Copy)]
pub struct AugmentOptions {
    /// Upper bound on a single narrator call.
    pub timeout: Duration,
    /// Maximum concurrent narrator calls. Zero is treated as one.
    pub concurrency: usize,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Result of narrating one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationOutcome {
    /// The narrator produced the analysis.
    Narrated(Analysis),
    /// The templated analysis was substituted.
    Fallback(Analysis),
}

impl NarrationOutcome {
    /// The analysis, whichever way it was produced.
    #[must_use]
    pub fn into_analysis(self) -> Analysis {
        match self {
            Self::Narrated(analysis) | Self::Fallback(analysis) => analysis,
        }
    }

    /// Whether the templated analysis was used.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Why a fallback analysis was used; selects the wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackReason {
    /// No narrator is configured.
    Unavailable,
    /// The narrator was tried for this item and did not deliver.
    Failed,
}

/// Narrates every match, returning one outcome per input in input order.
pub async fn narrate_all(
    producer: &Producer,
    matches: &[Match],
    narrator: Option<&dyn Narrator>,
    options: AugmentOptions,
) -> Vec<NarrationOutcome> {
    let Some(narrator) = narrator else {
        log::info!(
            "Narrator unavailable; using templated analysis for {} match(es)",
            matches.len()
        );
        return matches
            .iter()
            .enumerate()
            .map(|(i, m)| {
                NarrationOutcome::Fallback(fallback(
                    producer,
                    m,
                    rank_for(i),
                    FallbackReason::Unavailable,
                ))
            })
            .collect();
    };

    futures::stream::iter(matches.iter().enumerate())
        .map(|(i, m)| narrate_one(narrator, producer, m, rank_for(i), options.timeout))
        .buffered(options.concurrency.max(1))
        .collect()
        .await
}

/// Attaches an analysis to every match, preserving order.
pub async fn augment(
    producer: &Producer,
    matches: Vec<Match>,
    narrator: Option<&dyn Narrator>,
    options: AugmentOptions,
) -> Vec<AnalyzedMatch> {
    let outcomes = narrate_all(producer, &matches, narrator, options).await;
    merge(matches, outcomes)
}

/// Builds the full analysis report for a ranked match list.
pub async fn analyze_matches(
    producer: &Producer,
    matches: Vec<Match>,
    narrator: Option<&dyn Narrator>,
    options: AugmentOptions,
) -> AnalysisReport {
    let outcomes = narrate_all(producer, &matches, narrator, options).await;
    let fallbacks = outcomes.iter().filter(|o| o.is_fallback()).count();
    let ranked_matches = merge(matches, outcomes);

    let count = ranked_matches.len();
    let overall_summary = if narrator.is_none() {
        format!(
            "Found {count} potential partners for {}, sorted by distance. AI analysis temporarily unavailable.",
            producer.name
        )
    } else if fallbacks == 0 {
        format!(
            "Found {count} potential partners for {}, sorted by distance. Each has been analyzed for strategic fit.",
            producer.name
        )
    } else {
        format!(
            "Found {count} potential partners for {}, sorted by distance. {} of {count} could not be analyzed by AI and use a summary instead.",
            producer.name, fallbacks
        )
    };

    AnalysisReport {
        overall_summary,
        ranked_matches,
    }
}

fn merge(matches: Vec<Match>, outcomes: Vec<NarrationOutcome>) -> Vec<AnalyzedMatch> {
    matches
        .into_iter()
        .zip(outcomes)
        .map(|(matched, outcome)| AnalyzedMatch {
            matched,
            analysis: outcome.into_analysis(),
        })
        .collect()
}

async fn narrate_one(
    narrator: &dyn Narrator,
    producer: &Producer,
    matched: &Match,
    rank: u32,
    timeout: Duration,
) -> NarrationOutcome {
    match tokio::time::timeout(timeout, narrator.narrate(producer, matched)).await {
        Ok(Ok(Narrative {
            justification,
            strategic_considerations,
        })) => NarrationOutcome::Narrated(Analysis {
            rank,
            justification,
            strategic_considerations,
        }),
        Ok(Err(e)) => {
            log::warn!("AI call failed for match {}: {e}", matched.consumer.name);
            NarrationOutcome::Fallback(fallback(producer, matched, rank, FallbackReason::Failed))
        }
        Err(_) => {
            log::warn!(
                "AI call for match {} timed out after {}s",
                matched.consumer.name,
                timeout.as_secs_f64()
            );
            NarrationOutcome::Fallback(fallback(producer, matched, rank, FallbackReason::Failed))
        }
    }
}

fn fallback(producer: &Producer, matched: &Match, rank: u32, reason: FallbackReason) -> Analysis {
    let consumer = &matched.consumer;
    let distance = matched.distance_km;
    let supply_demand = format!(
        "Supply-demand fit: {}t demand vs {}t supply",
        consumer.co2_demand_tonnes_per_week, producer.co2_supply_tonnes_per_week
    );

    match reason {
        FallbackReason::Unavailable => Analysis {
            rank,
            justification: format!(
                "This is a potential partnership between {} and {} in the {} industry. Distance: {distance} km. AI analysis temporarily unavailable.",
                producer.name, consumer.name, consumer.industry
            ),
            strategic_considerations: [
                supply_demand,
                format!("Logistics: {distance} km distance for delivery"),
            ],
        },
        FallbackReason::Failed => Analysis {
            rank,
            justification: format!(
                "Partnership between {} and {} in the {} industry shows potential. Distance: {distance} km. Detailed AI analysis temporarily unavailable.",
                producer.name, consumer.name, consumer.industry
            ),
            strategic_considerations: [
                supply_demand,
                format!("Logistics consideration: {distance} km delivery distance"),
            ],
        },
    }
}

fn rank_for(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}
