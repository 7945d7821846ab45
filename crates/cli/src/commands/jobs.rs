use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;

use crate::commands::{execute, open_database, CommandFailure, CommandResult};
use cartage_core::audit::{AuditEvent, AuditSink};
use cartage_core::config::{AppConfig, LoadOptions};
use cartage_core::domain::booking::{ActorId, Booking, BookingId, BookingStatus, DriverId};
use cartage_core::domain::vehicle::VehicleType;
use cartage_core::errors::DomainError;
use cartage_core::lifecycle::JobLifecycle;
use cartage_core::ports::StandardCancellationPolicy;
use cartage_db::repositories::{BookingStore, SqlBookingRepository, SqlDriverRepository};
use cartage_db::DbPool;

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    #[command(about = "List open, unassigned bookings for a vehicle type, earliest pickup first")]
    Feed {
        #[arg(long)]
        vehicle_type: String,
    },
    #[command(about = "Show one booking")]
    Show {
        #[arg(long)]
        booking: String,
    },
    #[command(about = "Claim an open booking for a driver")]
    Accept {
        #[arg(long)]
        booking: String,
        #[arg(long)]
        driver: String,
    },
    #[command(about = "Move a claimed booking to its next status (or to cancelled)")]
    Advance {
        #[arg(long)]
        booking: String,
        #[arg(long, help = "Requested status, e.g. driver_en_route")]
        status: String,
        #[arg(long, help = "Acting driver id")]
        actor: String,
    },
    #[command(about = "Cancel a booking as its customer, its driver or an operator")]
    Cancel {
        #[arg(long)]
        booking: String,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        reason: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum JobsOutput {
    Feed { vehicle_type: VehicleType, jobs: Vec<Booking> },
    Booking(Booking),
}

type SqlLifecycle =
    JobLifecycle<SqlBookingRepository, SqlDriverRepository, StandardCancellationPolicy>;

/// Writes lifecycle audit events to the log; the CLI keeps no separate audit store.
struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        tracing::info!(
            event_name = "cli.audit",
            audit_event_type = %event.event_type,
            audit_event_id = %event.event_id,
            booking_id = event.booking_id.as_ref().map(|id| id.0.as_str()).unwrap_or("-"),
            actor = %event.actor,
            outcome = ?event.outcome,
            "audit event"
        );
    }
}

pub fn run(options: &LoadOptions, command: &JobsCommand) -> CommandResult {
    match command {
        JobsCommand::Feed { vehicle_type } => {
            let vehicle_type = vehicle_type.clone();
            execute("jobs.feed", options, |config| feed(config, vehicle_type))
        }
        JobsCommand::Show { booking } => {
            let booking_id = BookingId(booking.clone());
            execute("jobs.show", options, |config| show(config, booking_id))
        }
        JobsCommand::Accept { booking, driver } => {
            let booking_id = BookingId(booking.clone());
            let driver_id = DriverId(driver.clone());
            execute("jobs.accept", options, |config| accept(config, booking_id, driver_id))
        }
        JobsCommand::Advance { booking, status, actor } => {
            let booking_id = BookingId(booking.clone());
            let status = status.clone();
            let actor_id = ActorId(actor.clone());
            execute("jobs.advance", options, |config| {
                advance(config, booking_id, status, actor_id)
            })
        }
        JobsCommand::Cancel { booking, actor, reason } => {
            let booking_id = BookingId(booking.clone());
            let actor_id = ActorId(actor.clone());
            let reason = reason.clone();
            execute("jobs.cancel", options, |config| cancel(config, booking_id, actor_id, reason))
        }
    }
}

fn lifecycle(config: &AppConfig, pool: &DbPool) -> SqlLifecycle {
    JobLifecycle::new(
        SqlBookingRepository::new(pool.clone()),
        SqlDriverRepository::new(pool.clone()),
        StandardCancellationPolicy::new(config.dispatch.operator_ids.iter().cloned()),
    )
    .with_audit_sink(Arc::new(TracingAuditSink))
}

async fn feed(config: AppConfig, vehicle_type: String) -> Result<JobsOutput, CommandFailure> {
    let vehicle_type = vehicle_type.parse::<VehicleType>()?;
    let pool = open_database(&config).await?;
    let jobs = SqlBookingRepository::new(pool.clone()).list_open(vehicle_type).await?;
    pool.close().await;

    Ok(JobsOutput::Feed { vehicle_type, jobs })
}

async fn show(config: AppConfig, booking_id: BookingId) -> Result<JobsOutput, CommandFailure> {
    let pool = open_database(&config).await?;
    let booking = SqlBookingRepository::new(pool.clone()).find_by_id(&booking_id).await?;
    pool.close().await;

    booking
        .map(JobsOutput::Booking)
        .ok_or_else(|| DomainError::JobNotFound { booking_id }.into())
}

async fn accept(
    config: AppConfig,
    booking_id: BookingId,
    driver_id: DriverId,
) -> Result<JobsOutput, CommandFailure> {
    let pool = open_database(&config).await?;
    let result = lifecycle(&config, &pool).accept_job(&booking_id, &driver_id).await;
    pool.close().await;

    Ok(JobsOutput::Booking(result?))
}

async fn advance(
    config: AppConfig,
    booking_id: BookingId,
    status: String,
    actor_id: ActorId,
) -> Result<JobsOutput, CommandFailure> {
    let requested = status.parse::<BookingStatus>()?;
    let pool = open_database(&config).await?;
    let result = lifecycle(&config, &pool).advance(&booking_id, requested, &actor_id).await;
    pool.close().await;

    Ok(JobsOutput::Booking(result?))
}

async fn cancel(
    config: AppConfig,
    booking_id: BookingId,
    actor_id: ActorId,
    reason: String,
) -> Result<JobsOutput, CommandFailure> {
    let pool = open_database(&config).await?;
    let result = lifecycle(&config, &pool).cancel(&booking_id, &actor_id, &reason).await;
    pool.close().await;

    Ok(JobsOutput::Booking(result?))
}
