//! `SQLite` implementation of [`MarketplaceStore`].

use std::path::Path;

use carbonflow_marketplace_models::{Consumer, Location, Producer};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};
use switchy_database_connection::init_sqlite_rusqlite;

use crate::{MarketplaceStore, StoreError};

/// Marketplace store backed by a single `SQLite` file.
pub struct SqliteStore {
    db: Box<dyn Database>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists. Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or schema
    /// creation fails.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db =
            init_sqlite_rusqlite(Some(path)).map_err(|e| StoreError::Database(e.to_string()))?;

        ensure_schema(db.as_ref()).await?;
        log::debug!("Opened marketplace database at {}", path.display());

        Ok(Self { db })
    }
}

/// Creates all tables if they don't already exist.
///
/// `seq` is an insertion counter so listings come back in registration
/// order.
async fn ensure_schema(db: &dyn Database) -> Result<(), StoreError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS producers (
            seq                         INTEGER PRIMARY KEY AUTOINCREMENT,
            id                          TEXT NOT NULL UNIQUE,
            name                        TEXT NOT NULL,
            lat                         REAL NOT NULL,
            lon                         REAL NOT NULL,
            co2_supply_tonnes_per_week  REAL NOT NULL
        )",
    )
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS consumers (
            seq                         INTEGER PRIMARY KEY AUTOINCREMENT,
            id                          TEXT NOT NULL UNIQUE,
            name                        TEXT NOT NULL,
            industry                    TEXT NOT NULL,
            lat                         REAL NOT NULL,
            lon                         REAL NOT NULL,
            co2_demand_tonnes_per_week  REAL NOT NULL
        )",
    )
    .await
    .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(())
}

fn row_to_producer(row: &Row) -> Producer {
    Producer {
        id: row.to_value("id").unwrap_or_default(),
        name: row.to_value("name").unwrap_or_default(),
        location: Location::new(
            row.to_value("lat").unwrap_or_default(),
            row.to_value("lon").unwrap_or_default(),
        ),
        co2_supply_tonnes_per_week: row.to_value("co2_supply_tonnes_per_week").unwrap_or_default(),
    }
}

fn row_to_consumer(row: &Row) -> Consumer {
    Consumer {
        id: row.to_value("id").unwrap_or_default(),
        name: row.to_value("name").unwrap_or_default(),
        industry: row.to_value("industry").unwrap_or_default(),
        location: Location::new(
            row.to_value("lat").unwrap_or_default(),
            row.to_value("lon").unwrap_or_default(),
        ),
        co2_demand_tonnes_per_week: row.to_value("co2_demand_tonnes_per_week").unwrap_or_default(),
    }
}

#[async_trait::async_trait]
impl MarketplaceStore for SqliteStore {
    async fn get_producer(&self, id: &str) -> Result<Option<Producer>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, name, lat, lon, co2_supply_tonnes_per_week
                 FROM producers WHERE id = $1",
                &[DatabaseValue::String(id.to_string())],
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows.first().map(row_to_producer))
    }

    async fn list_producers(&self) -> Result<Vec<Producer>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, name, lat, lon, co2_supply_tonnes_per_week
                 FROM producers ORDER BY seq",
                &[],
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows.iter().map(row_to_producer).collect())
    }

    async fn insert_producer(&self, producer: &Producer) -> Result<bool, StoreError> {
        producer.validate().map_err(|source| StoreError::Invalid {
            id: producer.id.clone(),
            source,
        })?;

        let inserted = self
            .db
            .exec_raw_params(
                "INSERT INTO producers (id, name, lat, lon, co2_supply_tonnes_per_week)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (id) DO NOTHING",
                &[
                    DatabaseValue::String(producer.id.clone()),
                    DatabaseValue::String(producer.name.clone()),
                    DatabaseValue::Real64(producer.location.lat),
                    DatabaseValue::Real64(producer.location.lon),
                    DatabaseValue::Real64(producer.co2_supply_tonnes_per_week),
                ],
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    async fn get_consumer(&self, id: &str) -> Result<Option<Consumer>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, name, industry, lat, lon, co2_demand_tonnes_per_week
                 FROM consumers WHERE id = $1",
                &[DatabaseValue::String(id.to_string())],
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows.first().map(row_to_consumer))
    }

    async fn list_consumers(&self) -> Result<Vec<Consumer>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, name, industry, lat, lon, co2_demand_tonnes_per_week
                 FROM consumers ORDER BY seq",
                &[],
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows.iter().map(row_to_consumer).collect())
    }

    async fn insert_consumer(&self, consumer: &Consumer) -> Result<bool, StoreError> {
        consumer.validate().map_err(|source| StoreError::Invalid {
            id: consumer.id.clone(),
            source,
        })?;

        let inserted = self
            .db
            .exec_raw_params(
                "INSERT INTO consumers (id, name, industry, lat, lon, co2_demand_tonnes_per_week)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO NOTHING",
                &[
                    DatabaseValue::String(consumer.id.clone()),
                    DatabaseValue::String(consumer.name.clone()),
                    DatabaseValue::String(consumer.industry.clone()),
                    DatabaseValue::Real64(consumer.location.lat),
                    DatabaseValue::Real64(consumer.location.lon),
                    DatabaseValue::Real64(consumer.co2_demand_tonnes_per_week),
                ],
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use super::*;

    /// Opens a store in a fresh temp file.
    pub(crate) async fn temp_store(label: &str) -> (SqliteStore, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "carbonflow_{label}_{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = SqliteStore::open(&path).await.unwrap();
        (store, path)
    }

    fn producer(id: &str, name: &str) -> Producer {
        Producer {
            id: id.to_string(),
            name: name.to_string(),
            location: Location::new(51.5, -0.12),
            co2_supply_tonnes_per_week: 80.5,
        }
    }

    fn consumer(id: &str, name: &str) -> Consumer {
        Consumer {
            id: id.to_string(),
            name: name.to_string(),
            industry: "Beverages".to_string(),
            location: Location::new(52.2, 0.12),
            co2_demand_tonnes_per_week: 12.25,
        }
    }

    #[tokio::test]
    async fn producers_round_trip_in_registration_order() {
        let (store, path) = temp_store("producers").await;

        for (id, name) in [("prod_b", "Bravo"), ("prod_a", "Alpha"), ("prod_c", "Charlie")] {
            assert!(store.insert_producer(&producer(id, name)).await.unwrap());
        }

        let names: Vec<String> = store
            .list_producers()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Bravo", "Alpha", "Charlie"]);

        assert_eq!(
            store.get_producer("prod_a").await.unwrap(),
            Some(producer("prod_a", "Alpha"))
        );
        assert_eq!(store.get_producer("prod_missing").await.unwrap(), None);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn duplicate_id_keeps_first_record() {
        let (store, path) = temp_store("duplicate").await;

        assert!(store.insert_consumer(&consumer("cons_1", "First")).await.unwrap());
        assert!(!store.insert_consumer(&consumer("cons_1", "Second")).await.unwrap());

        let all = store.list_consumers().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "First");
        assert_eq!(
            store.get_consumer("cons_1").await.unwrap(),
            Some(consumer("cons_1", "First"))
        );

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn rejects_invalid_records() {
        let (store, path) = temp_store("invalid").await;

        let mut bad = producer("prod_bad", "Bad");
        bad.location.lat = 120.0;
        assert!(matches!(
            store.insert_producer(&bad).await,
            Err(StoreError::Invalid { .. })
        ));

        let mut bad = consumer("cons_bad", "Bad");
        bad.co2_demand_tonnes_per_week = -1.0;
        assert!(matches!(
            store.insert_consumer(&bad).await,
            Err(StoreError::Invalid { .. })
        ));

        assert!(store.list_producers().await.unwrap().is_empty());
        assert!(store.list_consumers().await.unwrap().is_empty());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let (store, path) = temp_store("reopen").await;
        store.insert_producer(&producer("prod_1", "Kept")).await.unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_producers().await.unwrap().len(), 1);

        let _ = std::fs::remove_file(path);
    }
}
