//! Salon - appointment booking for a barbershop or salon
//!
//! Command-line front end over the salon core: staff and service admin,
//! slot lookup, booking and the appointment status workflow.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod service;
mod state;

use commands::{AppError, Cli};
use config::Config;
use state::AppState;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        eprintln!("salon: {e}");
        std::process::exit(match &e {
            AppError::Booking(err) if err.is_retryable() => 75,
            AppError::Booking(_) | AppError::Input(_) => 2,
            _ => 1,
        });
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config_path = match cli.config {
        Some(path) => path,
        None => state::default_config_path()?,
    };
    let config = Config::load(&config_path)?;

    tracing::info!(
        shop = %config.shop.name,
        mode = ?config.booking.mode,
        "Starting Salon"
    );

    let state = AppState::new(config)?;
    commands::run(cli.command, state).await
}
