#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the CO2 marketplace.
//!
//! Serves producer/consumer registration, distance-ranked matching, the
//! annual impact model, AI match analysis, and address geocoding. Records
//! live in a `SQLite` database (default `data/carbonflow.db`). The AI
//! narrator is optional: without provider credentials every analysis uses
//! the templated fallback.

pub mod error;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error::InternalError, middleware, web};
use carbonflow_ai::augment::AugmentOptions;
use carbonflow_ai::narrator::{LlmNarrator, Narrator};
use carbonflow_database::{DEFAULT_DB_PATH, MarketplaceStore, SqliteStore, StoreError};
use carbonflow_geocoder::{GeocodeError, Geocoder, GeocoderConfig};
use carbonflow_server_models::ApiErrorBody;
use thiserror::Error;

/// Port used when `PORT` is unset or unparsable.
pub const DEFAULT_PORT: u16 = 5001;

/// Shared application state.
pub struct AppState {
    /// Producer/consumer storage.
    pub store: Arc<dyn MarketplaceStore>,
    /// Narrative backend; `None` when no AI provider is configured.
    pub narrator: Option<Arc<dyn Narrator>>,
    /// Address geocoder.
    pub geocoder: Geocoder,
    /// Narrator timeout and fan-out.
    pub augment: AugmentOptions,
}

/// Startup configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Listening port (`PORT`).
    pub port: u16,
    /// `SQLite` database file (`DATABASE_PATH`).
    pub database_path: PathBuf,
    /// Geocoding endpoint and `User-Agent` (`NOMINATIM_URL`,
    /// `GEOCODER_USER_AGENT`).
    pub geocoder: GeocoderConfig,
    /// Narrator timeout and fan-out (`NARRATOR_TIMEOUT_SECS`,
    /// `NARRATOR_CONCURRENCY`).
    pub augment: AugmentOptions,
}

impl ServerConfig {
    /// Reads the configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AugmentOptions::default();
        let timeout = lookup("NARRATOR_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map_or(defaults.timeout, Duration::from_secs);
        let concurrency = lookup("NARRATOR_CONCURRENCY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.concurrency);

        let geocoder_defaults = GeocoderConfig::default();

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_path: lookup("DATABASE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            geocoder: GeocoderConfig {
                base_url: lookup("NOMINATIM_URL").unwrap_or(geocoder_defaults.base_url),
                user_agent: lookup("GEOCODER_USER_AGENT").unwrap_or(geocoder_defaults.user_agent),
            },
            augment: AugmentOptions {
                timeout,
                concurrency,
            },
        }
    }
}

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The database could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The geocoder client could not be built.
    #[error(transparent)]
    Geocoder(#[from] GeocodeError),
}

/// Opens the store, builds the geocoder, and picks up a narrator from the
/// environment if one is configured.
///
/// A misconfigured AI provider is logged and treated as "no narrator".
///
/// # Errors
///
/// Returns [`StartupError`] if the database or geocoder cannot be set up.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, StartupError> {
    log::info!("Opening database at {}...", config.database_path.display());
    let store = SqliteStore::open(&config.database_path).await?;

    let geocoder = Geocoder::new(&config.geocoder)?;

    let narrator: Option<Arc<dyn Narrator>> =
        match carbonflow_ai::providers::create_provider_from_env().await {
            Ok(Some(provider)) => Some(Arc::new(LlmNarrator::new(provider))),
            Ok(None) => None,
            Err(e) => {
                log::error!("AI provider misconfigured, continuing without narrator: {e}");
                None
            }
        };

    Ok(AppState {
        store: Arc::new(store),
        narrator,
        geocoder,
        augment: config.augment,
    })
}

/// Registers every route and the JSON body error handler.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let body = ApiErrorBody {
            error: err.to_string(),
        };
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    cfg.app_data(json_config)
        .route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/producers", web::get().to(handlers::list_producers))
                .route("/producers", web::post().to(handlers::create_producer))
                .route("/consumers", web::get().to(handlers::list_consumers))
                .route("/consumers", web::post().to(handlers::create_consumer))
                .route("/matches", web::get().to(handlers::matches))
                .route("/analyze-matches", web::post().to(handlers::analyze_matches))
                .route("/impact-model", web::post().to(handlers::impact_model))
                .route("/geocode", web::post().to(handlers::geocode)),
        );
}

/// Starts the marketplace API server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`) and initialises logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if startup fails, the server cannot
/// bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let state = web::Data::new(build_state(&config).await.map_err(std::io::Error::other)?);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use actix_web::http::StatusCode;
    use actix_web::test;
    use carbonflow_ai::AiError;
    use carbonflow_ai::narrator::Narrative;
    use carbonflow_marketplace_models::{Match, Producer};
    use serde_json::{Value, json};

    use super::*;

    struct ConfidentNarrator;

    #[async_trait::async_trait]
    impl Narrator for ConfidentNarrator {
        async fn narrate(&self, _: &Producer, m: &Match) -> Result<Narrative, AiError> {
            Ok(Narrative {
                justification: format!("{} is a strong fit.", m.consumer.name),
                strategic_considerations: ["Short haul".to_string(), "Steady demand".to_string()],
            })
        }
    }

    async fn test_state(narrator: Option<Arc<dyn Narrator>>) -> (web::Data<AppState>, PathBuf) {
        let path = std::env::temp_dir().join(format!("carbonflow_server_{}.db", uuid::Uuid::new_v4()));
        let store = SqliteStore::open(&path).await.unwrap();
        let geocoder = Geocoder::new(&GeocoderConfig {
            base_url: "http://127.0.0.1:9/search".to_string(),
            user_agent: "carbonflow-test".to_string(),
        })
        .unwrap();

        let state = web::Data::new(AppState {
            store: Arc::new(store),
            narrator,
            geocoder,
            augment: AugmentOptions {
                timeout: Duration::from_secs(2),
                concurrency: 2,
            },
        });
        (state, path)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure)).await
        };
    }

    fn producer_body(name: &str, lat: f64, lon: f64, supply: f64) -> Value {
        json!({
            "name": name,
            "location": {"lat": lat, "lon": lon},
            "co2_supply_tonnes_per_week": supply
        })
    }

    fn consumer_body(name: &str, lat: f64, lon: f64, demand: f64) -> Value {
        json!({
            "name": name,
            "industry": "Greenhouse Agriculture",
            "location": {"lat": lat, "lon": lon},
            "co2_demand_tonnes_per_week": demand
        })
    }

    #[actix_web::test]
    async fn banner_and_health() {
        let (state, path) = test_state(None).await;
        let app = app!(state);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"CarbonFlow API is running!");

        for uri in ["/health", "/api/health"] {
            let health: Value =
                test::call_and_read_body_json(&app, test::TestRequest::get().uri(uri).to_request())
                    .await;
            assert_eq!(health["healthy"], true);
            assert_eq!(health["narrator_available"], false);
        }

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn registration_and_listing() {
        let (state, path) = test_state(None).await;
        let app = app!(state);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/producers")
                .set_json(producer_body("Cement Works", 10.0, 20.0, 75.0))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["message"], "Producer added successfully");
        let id = created["producer"]["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("prod_"));

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/consumers")
                .set_json(consumer_body("Tomato Farm", 10.1, 20.0, 30.0))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert!(created["consumer"]["id"].as_str().unwrap().starts_with("cons_"));

        let producers: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/producers").to_request(),
        )
        .await;
        assert_eq!(producers.as_array().unwrap().len(), 1);
        assert_eq!(producers[0]["id"], id.as_str());
        assert_eq!(producers[0]["location"]["lat"], 10.0);

        let consumers: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/consumers").to_request(),
        )
        .await;
        assert_eq!(consumers[0]["industry"], "Greenhouse Agriculture");

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn registration_rejects_bad_input() {
        let (state, path) = test_state(None).await;
        let app = app!(state);

        for body in [
            producer_body("Too North", 91.0, 0.0, 10.0),
            producer_body("Negative", 0.0, 0.0, -5.0),
            producer_body("", 0.0, 0.0, 5.0),
            json!({"name": "No location", "co2_supply_tonnes_per_week": 5}),
        ] {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/producers")
                    .set_json(&body)
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "accepted {body}");
            let err: Value = test::read_body_json(resp).await;
            assert!(err["error"].is_string());
        }

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/consumers")
                .set_json(consumer_body("Far East", 0.0, 181.0, 5.0))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let producers: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/producers").to_request(),
        )
        .await;
        assert!(producers.as_array().unwrap().is_empty());

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn matches_are_feasible_and_nearest_first() {
        let (state, path) = test_state(None).await;
        let app = app!(state);

        let created: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/producers")
                .set_json(producer_body("Origin Plant", 0.0, 0.0, 100.0))
                .to_request(),
        )
        .await;
        let producer_id = created["producer"]["id"].as_str().unwrap().to_string();

        for body in [
            consumer_body("A", 0.0, 1.0, 50.0),
            consumer_body("B", 0.0, 2.0, 150.0),
            consumer_body("C", 0.0, 0.5, 100.0),
        ] {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/consumers")
                    .set_json(body)
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let matches: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/matches?producer_id={producer_id}"))
                .to_request(),
        )
        .await;
        let matches = matches.as_array().unwrap();
        let names: Vec<&str> = matches.iter().map(|m| m["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["C", "A"]);
        assert_eq!(matches[0]["distance_km"], 55.6);
        assert_eq!(matches[1]["distance_km"], 111.19);
        assert_eq!(matches[1]["industry"], "Greenhouse Agriculture");

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/matches").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "producer_id parameter is required");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/matches?producer_id=prod_nope")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Producer not found");

        let _ = std::fs::remove_file(path);
    }

    fn analysis_request() -> Value {
        json!({
            "producer": {
                "id": "prod_1",
                "name": "Origin Plant",
                "location": {"lat": 0.0, "lon": 0.0},
                "co2_supply_tonnes_per_week": 100
            },
            "matches": [
                {"id": "cons_1", "name": "Near", "industry": "Beverages",
                 "location": {"lat": 0.0, "lon": 0.5}, "co2_demand_tonnes_per_week": 20, "distance_km": 55.6},
                {"id": "cons_2", "name": "Mid", "industry": "Greenhouses",
                 "location": {"lat": 0.0, "lon": 1.0}, "co2_demand_tonnes_per_week": 30, "distance_km": 111.19},
                {"id": "cons_3", "name": "Far", "industry": "Chemicals",
                 "location": {"lat": 0.0, "lon": 2.0}, "co2_demand_tonnes_per_week": 40, "distance_km": 222.39}
            ]
        })
    }

    #[actix_web::test]
    async fn analysis_without_narrator_uses_templates() {
        let (state, path) = test_state(None).await;
        let app = app!(state);

        let report: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/analyze-matches")
                .set_json(analysis_request())
                .to_request(),
        )
        .await;

        assert!(
            report["overall_summary"]
                .as_str()
                .unwrap()
                .starts_with("Found 3 potential partners for Origin Plant")
        );
        let ranked = report["ranked_matches"].as_array().unwrap();
        assert_eq!(ranked.len(), 3);
        for (i, m) in ranked.iter().enumerate() {
            assert_eq!(m["analysis"]["rank"], i + 1);
            assert_eq!(
                m["analysis"]["strategic_considerations"]
                    .as_array()
                    .unwrap()
                    .len(),
                2
            );
            assert!(!m["analysis"]["justification"].as_str().unwrap().is_empty());
        }
        assert_eq!(ranked[2]["name"], "Far");
        assert_eq!(ranked[2]["distance_km"], 222.39);

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn analysis_with_narrator() {
        let (state, path) = test_state(Some(Arc::new(ConfidentNarrator))).await;
        let app = app!(state);

        let health: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/health").to_request(),
        )
        .await;
        assert_eq!(health["narrator_available"], true);

        let report: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/analyze-matches")
                .set_json(analysis_request())
                .to_request(),
        )
        .await;

        assert!(
            report["overall_summary"]
                .as_str()
                .unwrap()
                .ends_with("Each has been analyzed for strategic fit.")
        );
        assert_eq!(
            report["ranked_matches"][1]["analysis"]["justification"],
            "Mid is a strong fit."
        );

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn analysis_requires_producer_and_matches() {
        let (state, path) = test_state(None).await;
        let app = app!(state);

        let full = analysis_request();
        let mut empty_matches = full.clone();
        empty_matches["matches"] = json!([]);

        for body in [
            json!({}),
            json!({"producer": full["producer"].clone()}),
            json!({"matches": full["matches"].clone()}),
            empty_matches,
        ] {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/analyze-matches")
                    .set_json(&body)
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "accepted {body}");
            let err: Value = test::read_body_json(resp).await;
            assert_eq!(err["error"], "Producer and matches data are required");
        }

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn impact_model_reference_scenario() {
        let (state, path) = test_state(None).await;
        let app = app!(state);

        let mut request = analysis_request();
        let mut consumer = request["matches"][0].clone();
        consumer["co2_demand_tonnes_per_week"] = json!(50);
        consumer["distance_km"] = json!(200);
        let body = json!({"producer": request["producer"].take(), "consumer": consumer});

        let report: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/impact-model")
                .set_json(&body)
                .to_request(),
        )
        .await;

        assert_eq!(report["producer_name"], "Origin Plant");
        assert_eq!(report["consumer_name"], "Near");
        assert_eq!(report["annual_tonnage"], 2600.0);
        assert_eq!(report["financials"]["producer_annual_revenue"], 65000.0);
        assert_eq!(report["financials"]["consumer_annual_savings"], 195_000.0);
        assert_eq!(report["financials"]["carbon_credit_value"], 65000.0);
        assert_eq!(report["environmental"]["estimated_logistics_emissions"], 5.2);
        assert_eq!(report["environmental"]["net_co2_impact"], 2594.8);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/impact-model")
                .set_json(json!({"producer": body["producer"].clone()}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Producer and consumer data are required");

        let mut negative = body.clone();
        negative["consumer"]["distance_km"] = json!(-1);
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/impact-model")
                .set_json(&negative)
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn geocode_errors() {
        let (state, path) = test_state(None).await;
        let app = app!(state);

        for body in [json!({}), json!({"address": "   "})] {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/geocode")
                    .set_json(&body)
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let err: Value = test::read_body_json(resp).await;
            assert_eq!(err["error"], "Address is required");
        }

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/geocode")
                .set_json(json!({"address": "1 Main Street"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["error"], "Geocoding service failed.");

        let _ = std::fs::remove_file(path);
    }

    #[::core::prelude::v1::test]
    fn config_defaults_and_overrides() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.augment.timeout, Duration::from_secs(30));
        assert_eq!(config.augment.concurrency, 4);

        let env: BTreeMap<&str, &str> = [
            ("PORT", "8088"),
            ("DATABASE_PATH", "/tmp/market.db"),
            ("NARRATOR_TIMEOUT_SECS", "5"),
            ("NARRATOR_CONCURRENCY", "0"),
            ("GEOCODER_USER_AGENT", "acme-geo"),
        ]
        .into_iter()
        .collect();
        let config = ServerConfig::from_lookup(|k| env.get(k).map(ToString::to_string));
        assert_eq!(config.port, 8088);
        assert_eq!(config.database_path, PathBuf::from("/tmp/market.db"));
        assert_eq!(config.augment.timeout, Duration::from_secs(5));
        assert_eq!(config.augment.concurrency, 4);
        assert_eq!(config.geocoder.user_agent, "acme-geo");
    }
}
