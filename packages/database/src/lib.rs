#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistent storage for marketplace participants.
//!
//! Producers and consumers live in a single `SQLite` file (by default
//! `data/carbonflow.db`). Listing returns records in registration order.
//! The [`MarketplaceStore`] trait is what the server and CLI program
//! against; [`SqliteStore`] is the only implementation.

pub mod legacy;
pub mod sqlite;

use carbonflow_marketplace_models::{Consumer, Producer, ValidationError};
use thiserror::Error;

pub use sqlite::SqliteStore;

/// Default path for the marketplace database.
pub const DEFAULT_DB_PATH: &str = "data/carbonflow.db";

/// Errors from marketplace storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record failed validation before it was written.
    #[error("Invalid record {id}: {source}")]
    Invalid {
        /// Id of the offending record.
        id: String,
        /// What was wrong with it.
        #[source]
        source: ValidationError,
    },
}

/// Read/write access to registered producers and consumers.
#[async_trait::async_trait]
pub trait MarketplaceStore: Send + Sync {
    /// Looks up a producer by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn get_producer(&self, id: &str) -> Result<Option<Producer>, StoreError>;

    /// All producers, oldest registration first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn list_producers(&self) -> Result<Vec<Producer>, StoreError>;

    /// Stores a producer. Returns `false` if the id was already taken, in
    /// which case the existing record is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the producer is invalid or the write fails.
    async fn insert_producer(&self, producer: &Producer) -> Result<bool, StoreError>;

    /// Looks up a consumer by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup fails.
    async fn get_consumer(&self, id: &str) -> Result<Option<Consumer>, StoreError>;

    /// All consumers, oldest registration first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn list_consumers(&self) -> Result<Vec<Consumer>, StoreError>;

    /// Stores a consumer. Returns `false` if the id was already taken.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the consumer is invalid or the write fails.
    async fn insert_consumer(&self, consumer: &Consumer) -> Result<bool, StoreError>;
}

/// Generates a fresh producer id (`prod_<uuid>`).
#[must_use]
pub fn new_producer_id() -> String {
    format!("prod_{}", uuid::Uuid::new_v4())
}

/// Generates a fresh consumer id (`cons_<uuid>`).
#[must_use]
pub fn new_consumer_id() -> String {
    format!("cons_{}", uuid::Uuid::new_v4())
}
