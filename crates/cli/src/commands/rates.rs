use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

use crate::commands::quote::TripArgs;
use crate::commands::{current_rates, execute, open_database, CommandFailure, CommandResult};
use cartage_core::config::{load_rate_table, AppConfig, LoadOptions};
use cartage_core::domain::trip::TripRequest;
use cartage_core::pricing::{preview, PriceQuote, RateTable, RateTableSnapshot};
use cartage_db::repositories::{RateTableStore, SqlRateTableRepository};

#[derive(Debug, Subcommand)]
pub enum RatesCommand {
    #[command(about = "Show the installed rate table (built-in defaults until one is applied)")]
    Show,
    #[command(about = "Validate a TOML rate table and install it as the next version")]
    Apply {
        #[arg(long, help = "Rate table file; defaults to pricing.rate_table_path")]
        file: Option<PathBuf>,
    },
    #[command(about = "Replace the installed rate table with the built-in defaults")]
    Reset,
    #[command(about = "Price a trip against a candidate rate table without installing it")]
    Preview {
        #[arg(long, help = "Candidate rate table file; defaults to pricing.rate_table_path")]
        file: Option<PathBuf>,
        #[command(flatten)]
        trip: TripArgs,
    },
}

#[derive(Debug, Serialize)]
struct RatesShown {
    /// `false` while the built-in table is in effect.
    stored: bool,
    snapshot: RateTableSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RatesOutput {
    Shown(RatesShown),
    Installed(RateTableSnapshot),
    Preview(PriceQuote),
}

pub fn run(options: &LoadOptions, command: &RatesCommand) -> CommandResult {
    match command {
        RatesCommand::Show => execute("rates.show", options, show),
        RatesCommand::Apply { file } => {
            let file = file.clone();
            execute("rates.apply", options, |config| apply(config, file))
        }
        RatesCommand::Reset => execute("rates.reset", options, reset),
        RatesCommand::Preview { file, trip } => {
            let file = file.clone();
            let request = trip.to_request();
            execute("rates.preview", options, |config| preview_trip(config, file, request))
        }
    }
}

async fn show(config: AppConfig) -> Result<RatesOutput, CommandFailure> {
    let pool = open_database(&config).await?;
    let stored = SqlRateTableRepository::new(pool.clone()).load().await?.is_some();
    let snapshot = current_rates(&pool).await?.current();
    pool.close().await;

    Ok(RatesOutput::Shown(RatesShown { stored, snapshot: (*snapshot).clone() }))
}

async fn apply(config: AppConfig, file: Option<PathBuf>) -> Result<RatesOutput, CommandFailure> {
    let table = read_candidate(&config, file.as_deref())?;
    let pool = open_database(&config).await?;
    let snapshot = SqlRateTableRepository::new(pool.clone()).save(&table).await?;
    pool.close().await;

    tracing::info!(
        event_name = "cli.rates.applied",
        version = snapshot.version,
        "rate table installed"
    );
    Ok(RatesOutput::Installed(snapshot))
}

async fn reset(config: AppConfig) -> Result<RatesOutput, CommandFailure> {
    let pool = open_database(&config).await?;
    let snapshot = SqlRateTableRepository::new(pool.clone()).reset().await?;
    pool.close().await;

    tracing::info!(
        event_name = "cli.rates.reset",
        version = snapshot.version,
        "rate table reset to defaults"
    );
    Ok(RatesOutput::Installed(snapshot))
}

async fn preview_trip(
    config: AppConfig,
    file: Option<PathBuf>,
    request: TripRequest,
) -> Result<RatesOutput, CommandFailure> {
    let candidate = read_candidate(&config, file.as_deref())?;
    Ok(RatesOutput::Preview(preview(&request, &candidate, &config.pricing.currency)?))
}

/// Reads and validates a rate table file. A table that fails validation is never installed.
fn read_candidate(config: &AppConfig, file: Option<&Path>) -> Result<RateTable, CommandFailure> {
    let path = file.or(config.pricing.rate_table_path.as_deref()).ok_or_else(|| {
        CommandFailure::invalid_argument(
            "no rate table file given and pricing.rate_table_path is unset",
        )
    })?;

    load_rate_table(path).map_err(|error| {
        CommandFailure::new("rate_table_invalid", format!("{}: {error}", path.display()), 7)
    })
}
