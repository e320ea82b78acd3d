//! Command-line front end for the race repository.
//!
//! # Responsibility
//! - Load configuration, start logging and open storage.
//! - Seed demo data (when enabled) before serving any command.
//! - Print command results as JSON on stdout.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use racing_core::db::open_configured;
use racing_core::{
    init_logging_from_config, CreateRaceRequest, GetRaceRequest, ListRacesRequest, NewRace,
    RaceListFilter, RaceRepository, RacingConfig, RacingService, SortRequest,
    SqliteRaceRepository,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "racing", about = "Query and create race records", version)]
struct Cli {
    /// TOML configuration file; ignored when missing.
    #[arg(long, default_value = "racing.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List races, optionally filtered and sorted.
    List {
        /// Restrict to a meeting; repeat for several.
        #[arg(long = "meeting-id")]
        meeting_ids: Vec<i64>,
        #[arg(long)]
        only_visible: bool,
        /// advertised_start_time | name | number
        #[arg(long)]
        sort_field: Option<String>,
        /// asc | desc
        #[arg(long)]
        sort_direction: Option<String>,
        /// Reject unknown sort values instead of defaulting them.
        #[arg(long)]
        strict: bool,
    },
    /// Fetch one race by id.
    Get { id: i64 },
    /// Create a race and print its id.
    Create {
        #[arg(long)]
        meeting_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        number: i64,
        #[arg(long)]
        hidden: bool,
        /// RFC 3339 start time, e.g. 2025-01-01T10:00:00Z
        #[arg(long)]
        start: DateTime<Utc>,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = RacingConfig::load(Some(&cli.config))?;
    init_logging_from_config(&config.logging)?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        racing_core::core_version()
    );

    let repo = Arc::new(SqliteRaceRepository::new(open_configured(&config.database)?));
    let service = RacingService::new(Arc::clone(&repo));
    if config.seed.enabled {
        service.init()?;
    }

    let output = match cli.command {
        Command::List {
            meeting_ids,
            only_visible,
            sort_field,
            sort_direction,
            strict,
        } => {
            let filter = RaceListFilter {
                meeting_ids,
                only_visible,
            };
            if strict {
                let races = repo.list_races_strict(
                    Some(&filter),
                    sort_field.as_deref().unwrap_or_default(),
                    sort_direction.as_deref().unwrap_or_default(),
                )?;
                serde_json::to_string_pretty(&races)?
            } else {
                let sort = (sort_field.is_some() || sort_direction.is_some()).then(|| SortRequest {
                    field: sort_field.unwrap_or_default(),
                    direction: sort_direction.unwrap_or_default(),
                });
                let response = service.list_races(&ListRacesRequest {
                    filter: Some(filter),
                    sort,
                })?;
                serde_json::to_string_pretty(&response.races)?
            }
        }
        Command::Get { id } => {
            let response = service.get_race(&GetRaceRequest { id })?;
            serde_json::to_string_pretty(&response.race)?
        }
        Command::Create {
            meeting_id,
            name,
            number,
            hidden,
            start,
        } => {
            let race = NewRace::new(meeting_id, name, number, start).with_visible(!hidden);
            let response = service.create_race(&CreateRaceRequest { race })?;
            serde_json::to_string_pretty(&response)?
        }
    };

    println!("{output}");
    Ok(())
}
