pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cartage_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};
use commands::earnings::EarningsArgs;
use commands::jobs::JobsCommand;
use commands::quote::TripArgs;
use commands::rates::RatesCommand;
use commands::seed::SeedAction;

#[derive(Debug, Parser)]
#[command(
    name = "cartage",
    about = "Cartage operator CLI",
    long_about = "Quote trips, administer the rate table, move jobs through their lifecycle, \
                  and report driver earnings. Every command prints one JSON document.",
    after_help = "Examples:\n  cartage migrate\n  cartage seed\n  \
                  cartage jobs feed --vehicle-type pickup\n  \
                  cartage earnings --driver driver-pickup-001 --period week"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file (default: cartage.toml or config/cartage.toml)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load, verify or clean the deterministic demo drivers and bookings")]
    Seed {
        #[arg(long, value_enum, default_value_t = SeedAction::Load)]
        action: SeedAction,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Price a trip against the installed rate table")]
    Quote(TripArgs),
    #[command(about = "Price a trip and store it as an open booking")]
    Book {
        #[arg(long)]
        customer: String,
        #[command(flatten)]
        trip: TripArgs,
    },
    #[command(subcommand, about = "Rate table administration")]
    Rates(RatesCommand),
    #[command(subcommand, about = "Job feed and lifecycle actions")]
    Jobs(JobsCommand),
    #[command(about = "Summarize a driver's completed-job earnings for a period")]
    Earnings(EarningsArgs),
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    // A config that fails to load is reported by the command itself; log with defaults.
    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match &cli.command {
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed { action } => commands::seed::run(&options, *action),
        Command::Config => commands::config::run(&options),
        Command::Quote(trip) => commands::quote::run(&options, trip),
        Command::Book { customer, trip } => commands::book::run(&options, customer, trip),
        Command::Rates(command) => commands::rates::run(&options, command),
        Command::Jobs(command) => commands::jobs::run(&options, command),
        Command::Earnings(args) => commands::earnings::run(&options, args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON document.
fn init_logging(logging: &LoggingConfig) {
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
