use clap::ValueEnum;
use serde::Serialize;

use crate::commands::{execute, open_database, CommandFailure, CommandResult};
use cartage_core::config::{AppConfig, LoadOptions};
use cartage_db::{DbPool, DemoSeedDataset, SeedResult, VerificationResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SeedAction {
    /// Insert demo drivers and open bookings (idempotent).
    #[default]
    Load,
    /// Check that every demo record is present.
    Verify,
    /// Delete the demo records.
    Clean,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum SeedOutput {
    Load { seed: SeedResult, verification: VerificationResult },
    Verify(VerificationResult),
    Clean,
}

pub fn run(options: &LoadOptions, action: SeedAction) -> CommandResult {
    execute("seed", options, |config| seed(config, action))
}

async fn seed(config: AppConfig, action: SeedAction) -> Result<SeedOutput, CommandFailure> {
    let pool = open_database(&config).await?;

    let output = match action {
        SeedAction::Load => {
            let seed = DemoSeedDataset::load(&pool)
                .await
                .map_err(|error| CommandFailure::new("seed_execution", error.to_string(), 6))?;
            let verification = verify(&pool).await?;
            if let Some(message) = verification_failure_message(&verification) {
                return Err(CommandFailure::new("seed_verification", message, 6));
            }
            SeedOutput::Load { seed, verification }
        }
        SeedAction::Verify => SeedOutput::Verify(verify(&pool).await?),
        SeedAction::Clean => {
            DemoSeedDataset::clean(&pool)
                .await
                .map_err(|error| CommandFailure::new("seed_execution", error.to_string(), 6))?;
            SeedOutput::Clean
        }
    };

    pool.close().await;
    Ok(output)
}

async fn verify(pool: &DbPool) -> Result<VerificationResult, CommandFailure> {
    DemoSeedDataset::verify(pool)
        .await
        .map_err(|error| CommandFailure::new("seed_verification", error.to_string(), 6))
}

fn verification_failure_message(verification: &VerificationResult) -> Option<String> {
    if verification.all_passed {
        return None;
    }

    let failed_checks = verification
        .checks
        .iter()
        .filter(|check| !check.passed)
        .map(|check| check.name.as_str())
        .collect::<Vec<_>>();
    Some(if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    })
}
