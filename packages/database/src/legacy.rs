//! One-shot import of the flat-file `database.json` format.
//!
//! The file is a single object with `producers`, `consumers`, and `users`
//! arrays. Users are ignored. Records whose id is already stored are
//! skipped, so importing the same file twice is harmless.

use std::path::Path;

use carbonflow_marketplace_models::{Consumer, Producer};
use serde::Deserialize;

use crate::{MarketplaceStore, StoreError};

#[derive(Debug, Default, Deserialize)]
struct LegacyDatabase {
    #[serde(default)]
    producers: Vec<Producer>,
    #[serde(default)]
    consumers: Vec<Consumer>,
}

/// Counts for one record kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportCounts {
    /// Newly stored.
    pub imported: usize,
    /// Already present by id.
    pub skipped: usize,
    /// Failed validation and were left out.
    pub invalid: usize,
}

/// Outcome of [`import_legacy_json`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub producers: ImportCounts,
    pub consumers: ImportCounts,
}

/// Imports producers and consumers from a legacy JSON file.
///
/// # Errors
///
/// Returns [`StoreError`] if the file cannot be read or parsed, or a write
/// fails for a reason other than validation.
pub async fn import_legacy_json(
    store: &dyn MarketplaceStore,
    path: &Path,
) -> Result<ImportSummary, StoreError> {
    let text = std::fs::read_to_string(path)?;
    import_legacy_str(store, &text).await
}

/// Same as [`import_legacy_json`] for already-loaded JSON text.
///
/// # Errors
///
/// Returns [`StoreError`] if the text is not valid legacy JSON or a write
/// fails for a reason other than validation.
pub async fn import_legacy_str(
    store: &dyn MarketplaceStore,
    text: &str,
) -> Result<ImportSummary, StoreError> {
    let legacy: LegacyDatabase = serde_json::from_str(text)?;
    let mut summary = ImportSummary::default();

    for producer in &legacy.producers {
        tally(&mut summary.producers, store.insert_producer(producer).await)?;
    }
    for consumer in &legacy.consumers {
        tally(&mut summary.consumers, store.insert_consumer(consumer).await)?;
    }

    log::info!(
        "Legacy import: producers {}/{} skipped/{} invalid, consumers {}/{} skipped/{} invalid",
        summary.producers.imported,
        summary.producers.skipped,
        summary.producers.invalid,
        summary.consumers.imported,
        summary.consumers.skipped,
        summary.consumers.invalid,
    );

    Ok(summary)
}

fn tally(counts: &mut ImportCounts, result: Result<bool, StoreError>) -> Result<(), StoreError> {
    match result {
        Ok(true) => counts.imported += 1,
        Ok(false) => counts.skipped += 1,
        Err(StoreError::Invalid { id, source }) => {
            log::warn!("Skipping invalid legacy record {id}: {source}");
            counts.invalid += 1;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
