//! `Taskboard` server -- authoritative store for board task placement.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:9100
//! cargo run --bin taskboard-server
//!
//! # Run on a custom address with initial data
//! cargo run --bin taskboard-server -- --bind 127.0.0.1:8080 --seed board.toml
//!
//! # Or via environment variables
//! BOARD_SERVER_ADDR=127.0.0.1:8080 cargo run --bin taskboard-server
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use taskboard_server::config::{ServerCliArgs, ServerConfig};
use taskboard_server::seed::Seed;
use taskboard_server::server::{self, ServerState};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let state = match &config.seed_file {
        Some(path) => {
            let loaded = match Seed::load(path) {
                Ok(seed) => ServerState::from_seed(seed).await,
                Err(e) => Err(e),
            };
            match loaded {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to load seed");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => ServerState::new(),
    };

    tracing::info!(addr = %config.bind_addr, "starting taskboard server");

    match server::start_server_with_state(&config.bind_addr.to_string(), Arc::new(state)).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "board server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "board server task failed");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start board server");
            ExitCode::FAILURE
        }
    }
}
