#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Marketplace API server binary. Configuration comes from the environment
//! (see [`carbonflow_server::ServerConfig::from_env`]).

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    carbonflow_server::run_server(carbonflow_server::ServerConfig::from_env()).await
}
