//! georemind - location-based reminders
//!
//! Keeps reminders in a JSON file and fires each one once when a replayed
//! position track enters its geofence.

use clap::{Args, Parser, Subcommand};
use georemind_core::config::Config;
use georemind_core::error::exit_codes;
use georemind_telemetry::TelemetryConfig;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::{add, distance, geocode, list, remove, track};

/// Location-based reminders
#[derive(Parser)]
#[command(name = "georemind")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Configuration file (defaults to .georemind.toml, georemind.toml or .config/georemind.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Location of the reminder file
#[derive(Args, Debug, Clone)]
pub struct ReminderFile {
    /// JSON file holding the reminders
    #[arg(short, long, default_value = "reminders.json", env = "GEOREMIND_REMINDERS")]
    pub reminders: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Great-circle distance between two points, in meters
    Distance {
        /// Latitude of the first point
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        /// Longitude of the first point
        #[arg(allow_negative_numbers = true)]
        lng1: f64,
        /// Latitude of the second point
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        /// Longitude of the second point
        #[arg(allow_negative_numbers = true)]
        lng2: f64,
    },

    /// Look up the coordinates of a place name
    Geocode {
        /// Place name
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Add a reminder
    Add {
        #[command(flatten)]
        file: ReminderFile,

        /// Reminder title
        #[arg(short, long)]
        title: String,

        /// Place name to look up
        #[arg(short, long, conflicts_with_all = ["lat", "lng"], required_unless_present_all = ["lat", "lng"])]
        place: Option<String>,

        /// Latitude of the geofence center
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude of the geofence center
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,

        /// Geofence radius in meters (default 100)
        #[arg(long)]
        radius: Option<String>,
    },

    /// List reminders
    List {
        #[command(flatten)]
        file: ReminderFile,
    },

    /// Remove a reminder
    Remove {
        #[command(flatten)]
        file: ReminderFile,

        /// Reminder id
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Replay a recorded position track against the reminders
    Track {
        #[command(flatten)]
        file: ReminderFile,

        /// Newline-delimited JSON fixes
        #[arg(long)]
        fixes: PathBuf,

        /// Pause between replayed fixes, in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Do not send SMS notifications
        #[arg(long)]
        no_sms: bool,
    },
}

/// Settings shared by every command
pub struct Context {
    /// Loaded configuration
    pub config: Config,
    /// Emit JSON instead of text
    pub json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let result = match Config::load(cli.config.as_deref()) {
        Ok(config) => {
            init_logging(&config, cli.verbose);
            run(cli.command, Context { config, json }).await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e, json),
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let settings = &config.schema.telemetry;
    let telemetry = TelemetryConfig {
        log_level: if verbose {
            "georemind=debug,info".to_string()
        } else {
            settings.log_level.clone()
        },
        json: settings.json,
        ..TelemetryConfig::default()
    };
    if let Err(e) = georemind_telemetry::init_with_config(telemetry) {
        eprintln!("{} {e}", "warning:".yellow().bold());
    }
}

async fn run(command: Commands, ctx: Context) -> anyhow::Result<()> {
    match command {
        Commands::Distance { lat1, lng1, lat2, lng2 } => distance::run(&ctx, (lat1, lng1), (lat2, lng2)),
        Commands::Geocode { query } => geocode::run(&ctx, &query.join(" ")).await,
        Commands::Add {
            file,
            title,
            place,
            lat,
            lng,
            radius,
        } => {
            let location = match (place, lat.zip(lng)) {
                (Some(place), _) => add::Location::Place(place),
                (None, Some((lat, lng))) => add::Location::Coordinates(lat, lng),
                (None, None) => add::Location::Missing,
            };
            add::run(&ctx, &file.reminders, &title, location, radius).await
        }
        Commands::List { file } => list::run(&ctx, &file.reminders),
        Commands::Remove { file, id, yes } => remove::run(&ctx, &file.reminders, id, yes),
        Commands::Track {
            file,
            fixes,
            interval_ms,
            no_sms,
        } => track::run(&ctx, &file.reminders, &fixes, interval_ms, !no_sms).await,
    }
}

/// Print an error and pick the exit code from its category
fn report(err: &anyhow::Error, json: bool) -> ExitCode {
    let Some(core) = err.downcast_ref::<georemind_core::Error>() else {
        eprintln!("{} {err:#}", "Error:".red().bold());
        return ExitCode::from(exit_codes::FAILURE as u8);
    };

    if json {
        match serde_json::to_string_pretty(&core.to_report()) {
            Ok(report) => eprintln!("{report}"),
            Err(_) => eprintln!("{core}"),
        }
    } else {
        eprintln!("{} {core}", "Error:".red().bold());
    }
    ExitCode::from(u8::try_from(core.exit_code()).unwrap_or(1))
}
