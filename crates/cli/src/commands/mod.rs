pub mod book;
pub mod config;
pub mod earnings;
pub mod jobs;
pub mod migrate;
pub mod quote;
pub mod rates;
pub mod seed;

use std::future::Future;

use cartage_core::config::{AppConfig, LoadOptions};
use cartage_core::errors::{ApplicationError, DomainError, ErrorClass};
use cartage_core::pricing::{RateTable, RateTableSnapshot, SharedRateTable};
use cartage_db::repositories::{RateTableStore, RepositoryError, SqlRateTableRepository};
use cartage_db::{connect_with_config, migrations, DbPool};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CommandReport<'a, T: Serialize> {
    command: &'a str,
    status: &'static str,
    data: &'a T,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    /// Success carrying a structured `data` document.
    pub fn report<T: Serialize>(command: &str, data: &T) -> Self {
        let payload = CommandReport { command, status: "ok", data };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        CommandFailure::new(error_class, message, exit_code).into_result(command)
    }
}

fn serialize_payload<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// A failed command before it is rendered. Domain rejections carry a correlation id
/// that is also logged, so an operator can match the printed error to the log line.
#[derive(Debug)]
pub struct CommandFailure {
    pub error_class: String,
    pub message: String,
    pub exit_code: u8,
    pub correlation_id: Option<String>,
}

impl CommandFailure {
    pub fn new(error_class: &str, message: impl Into<String>, exit_code: u8) -> Self {
        Self {
            error_class: error_class.to_string(),
            message: message.into(),
            exit_code,
            correlation_id: None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("invalid_argument", message, 7)
    }

    pub fn into_result(self, command: &str) -> CommandResult {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(self.error_class),
            message: self.message,
            correlation_id: self.correlation_id,
        };
        CommandResult { exit_code: self.exit_code, output: serialize_payload(&payload) }
    }
}

impl From<ApplicationError> for CommandFailure {
    fn from(error: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let (error_class, exit_code, user_message) = match &error {
            ApplicationError::Domain(domain) => (
                domain.kind().to_string(),
                exit_code_for(domain.class()),
                Some(domain.user_message()),
            ),
            ApplicationError::Persistence(_) => ("persistence".to_string(), 8, None),
            ApplicationError::Configuration(_) => ("config_validation".to_string(), 2, None),
        };
        let detail = error.to_string();
        let interface = error.into_interface(correlation_id.clone());
        let user_message = user_message.unwrap_or_else(|| interface.user_message().to_string());

        tracing::warn!(
            event_name = "cli.command.rejected",
            error_class = %error_class,
            correlation_id = %correlation_id,
            detail = %detail,
            "command rejected"
        );

        Self {
            error_class,
            message: format!("{user_message} ({detail})"),
            exit_code,
            correlation_id: Some(correlation_id),
        }
    }
}

impl From<DomainError> for CommandFailure {
    fn from(error: DomainError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl From<RepositoryError> for CommandFailure {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::from(error).into()
    }
}

fn exit_code_for(class: ErrorClass) -> u8 {
    match class {
        ErrorClass::Validation => 10,
        ErrorClass::StaleView => 11,
        ErrorClass::Conflict => 12,
        ErrorClass::Authorization => 13,
    }
}

/// Loads config, runs `body` on a current-thread runtime and renders its result.
pub(crate) fn execute<T, F, Fut>(command: &str, options: &LoadOptions, body: F) -> CommandResult
where
    T: Serialize,
    F: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = Result<T, CommandFailure>>,
{
    let outcome = load_config(options).and_then(|config| {
        let runtime = build_runtime()?;
        runtime.block_on(body(config))
    });

    match outcome {
        Ok(data) => CommandResult::report(command, &data),
        Err(failure) => failure.into_result(command),
    }
}

pub(crate) fn load_config(options: &LoadOptions) -> Result<AppConfig, CommandFailure> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandFailure::new("config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, CommandFailure> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandFailure::new(
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and applies pending migrations, so every command sees the current schema.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| CommandFailure::new("db_connectivity", error.to_string(), 4))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| CommandFailure::new("migration", error.to_string(), 5))?;
    Ok(pool)
}

/// The persisted rate table, or the built-in one as version 0 when none was ever saved.
pub(crate) async fn current_rates(pool: &DbPool) -> Result<SharedRateTable, CommandFailure> {
    let stored = SqlRateTableRepository::new(pool.clone()).load().await?;
    let snapshot = stored.unwrap_or_else(|| RateTableSnapshot {
        version: 0,
        table: RateTable::default().with_neutral_defaults(),
        updated_at: Utc::now(),
    });
    Ok(SharedRateTable::from_snapshot(snapshot))
}
