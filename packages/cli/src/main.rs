#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Operator CLI for the CO2 marketplace.
//!
//! ```text
//! carbonflow serve [--bind 0.0.0.0] [--port 5001]
//! carbonflow producers list | add --name .. --lat .. --lon .. --supply ..
//! carbonflow consumers list | add --name .. --industry .. --lat .. --lon .. --demand ..
//! carbonflow matches <producer_id> [--analyze]
//! carbonflow impact <producer_id> <consumer_id>
//! carbonflow import <database.json>
//! ```
//!
//! Every command accepts `--database` (default `DATABASE_PATH` or
//! `data/carbonflow.db`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use carbonflow_ai::augment::{AugmentOptions, analyze_matches};
use carbonflow_ai::narrator::{LlmNarrator, Narrator};
use carbonflow_database::legacy::import_legacy_json;
use carbonflow_database::{
    DEFAULT_DB_PATH, MarketplaceStore, SqliteStore, new_consumer_id, new_producer_id,
};
use carbonflow_marketplace_models::{Location, Match, NewConsumer, NewProducer};
use carbonflow_matching::{compute_impact, distance_km, find_matches, round2};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "carbonflow", about = "CO2 producer/consumer marketplace tools")]
struct Cli {
    /// `SQLite` database path
    #[arg(long, global = true, env = "DATABASE_PATH", default_value = DEFAULT_DB_PATH)]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address (overrides `BIND_ADDR`)
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
    },
    /// List or register producers
    Producers {
        #[command(subcommand)]
        action: ProducerAction,
    },
    /// List or register consumers
    Consumers {
        #[command(subcommand)]
        action: ConsumerAction,
    },
    /// Show feasible consumers for a producer, nearest first
    Matches {
        /// Producer id
        producer_id: String,
        /// Also produce the AI (or templated) analysis
        #[arg(long)]
        analyze: bool,
    },
    /// Show the annual impact model for a producer/consumer pair
    Impact {
        /// Producer id
        producer_id: String,
        /// Consumer id
        consumer_id: String,
    },
    /// Import producers and consumers from a legacy `database.json`
    Import {
        /// Path to the JSON file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum ProducerAction {
    /// List all producers
    List,
    /// Register a producer
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Weekly CO2 supply in tonnes
        #[arg(long)]
        supply: f64,
    },
}

#[derive(Subcommand)]
enum ConsumerAction {
    /// List all consumers
    List,
    /// Register a consumer
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        industry: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Weekly CO2 demand in tonnes
        #[arg(long)]
        demand: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, port } => serve(cli.database, bind, port).await?,
        command => {
            let store = SqliteStore::open(&cli.database).await?;
            run(&store, command).await?;
        }
    }

    Ok(())
}

async fn serve(
    database: PathBuf,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = carbonflow_server::ServerConfig::from_env();
    config.database_path = database;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if let Some(port) = port {
        config.port = port;
    }

    // The server uses actix-web's runtime, so it runs in a blocking task to
    // avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(carbonflow_server::run_server(config))
    })
    .await??;

    Ok(())
}

async fn run(
    store: &dyn MarketplaceStore,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve { .. } => Ok(()),
        Commands::Producers { action } => producers(store, action).await,
        Commands::Consumers { action } => consumers(store, action).await,
        Commands::Matches {
            producer_id,
            analyze,
        } => matches(store, &producer_id, analyze).await,
        Commands::Impact {
            producer_id,
            consumer_id,
        } => impact(store, &producer_id, &consumer_id).await,
        Commands::Import { path } => import(store, &path).await,
    }
}

async fn producers(
    store: &dyn MarketplaceStore,
    action: ProducerAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProducerAction::List => {
            let producers = store.list_producers().await?;
            if producers.is_empty() {
                println!("No producers registered.");
                return Ok(());
            }

            println!("{:<42} {:>12} {:>20}  NAME", "ID", "SUPPLY t/wk", "LAT,LON");
            println!("{}", "-".repeat(100));
            for p in &producers {
                println!(
                    "{:<42} {:>12} {:>20}  {}",
                    p.id,
                    p.co2_supply_tonnes_per_week,
                    format_location(p.location),
                    p.name
                );
            }
            println!("\n{} producer(s)", producers.len());
        }
        ProducerAction::Add {
            name,
            lat,
            lon,
            supply,
        } => {
            let new = NewProducer {
                name,
                location: Location::new(lat, lon),
                co2_supply_tonnes_per_week: supply,
            };
            new.validate()?;
            let producer = new.with_id(new_producer_id());
            store.insert_producer(&producer).await?;
            println!("Added producer {} ({})", producer.name, producer.id);
        }
    }
    Ok(())
}

async fn consumers(
    store: &dyn MarketplaceStore,
    action: ConsumerAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConsumerAction::List => {
            let consumers = store.list_consumers().await?;
            if consumers.is_empty() {
                println!("No consumers registered.");
                return Ok(());
            }

            println!(
                "{:<42} {:>12} {:>20}  {:<24} NAME",
                "ID", "DEMAND t/wk", "LAT,LON", "INDUSTRY"
            );
            println!("{}", "-".repeat(120));
            for c in &consumers {
                println!(
                    "{:<42} {:>12} {:>20}  {:<24} {}",
                    c.id,
                    c.co2_demand_tonnes_per_week,
                    format_location(c.location),
                    c.industry,
                    c.name
                );
            }
            println!("\n{} consumer(s)", consumers.len());
        }
        ConsumerAction::Add {
            name,
            industry,
            lat,
            lon,
            demand,
        } => {
            let new = NewConsumer {
                name,
                industry,
                location: Location::new(lat, lon),
                co2_demand_tonnes_per_week: demand,
            };
            new.validate()?;
            let consumer = new.with_id(new_consumer_id());
            store.insert_consumer(&consumer).await?;
            println!("Added consumer {} ({})", consumer.name, consumer.id);
        }
    }
    Ok(())
}

async fn matches(
    store: &dyn MarketplaceStore,
    producer_id: &str,
    analyze: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let producer = store
        .get_producer(producer_id)
        .await?
        .ok_or_else(|| format!("Producer not found: {producer_id}"))?;
    let consumers = store.list_consumers().await?;
    let found = find_matches(&producer, &consumers)?;

    if found.is_empty() {
        println!("No feasible consumers for {}.", producer.name);
        return Ok(());
    }

    if !analyze {
        println!("{:>4} {:>12} {:>12}  {:<24} NAME", "#", "KM", "DEMAND", "INDUSTRY");
        println!("{}", "-".repeat(90));
        for (i, m) in found.iter().enumerate() {
            println!(
                "{:>4} {:>12} {:>12}  {:<24} {}",
                i + 1,
                m.distance_km,
                m.consumer.co2_demand_tonnes_per_week,
                m.consumer.industry,
                m.consumer.name
            );
        }
        return Ok(());
    }

    let narrator = narrator_from_env().await;
    let report =
        analyze_matches(&producer, found, narrator.as_deref(), AugmentOptions::default()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn impact(
    store: &dyn MarketplaceStore,
    producer_id: &str,
    consumer_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let producer = store
        .get_producer(producer_id)
        .await?
        .ok_or_else(|| format!("Producer not found: {producer_id}"))?;
    let consumer = store
        .get_consumer(consumer_id)
        .await?
        .ok_or_else(|| format!("Consumer not found: {consumer_id}"))?;

    let matched = Match {
        distance_km: round2(distance_km(producer.location, consumer.location)),
        consumer,
    };
    let report = compute_impact(&producer, &matched)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn import(store: &dyn MarketplaceStore, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let summary = import_legacy_json(store, path).await?;
    for (kind, counts) in [("producers", summary.producers), ("consumers", summary.consumers)] {
        println!(
            "{kind}: {} imported, {} already present, {} invalid",
            counts.imported, counts.skipped, counts.invalid
        );
    }
    Ok(())
}

async fn narrator_from_env() -> Option<Arc<dyn Narrator>> {
    match carbonflow_ai::providers::create_provider_from_env().await {
        Ok(Some(provider)) => Some(Arc::new(LlmNarrator::new(provider))),
        Ok(None) => None,
        Err(e) => {
            log::warn!("AI provider misconfigured, using templated analysis: {e}");
            None
        }
    }
}

fn format_location(location: Location) -> String {
    format!("{:.4},{:.4}", location.lat, location.lon)
}
