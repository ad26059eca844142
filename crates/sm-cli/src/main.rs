use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sm_cli::commands::{efficiency, ids, import, logs, operators, report, stats};
use sm_cli::{Cli, Commands, Config, OperatorsAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(sm_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    config.validate().context("invalid configuration")?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = sm_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Report { target }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            report::run(&db, &db, &config.policy, target)?;
        }
        Some(Commands::Import) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            import::run(&db, &config.ingest)?;
        }
        Some(Commands::Operators(action)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                OperatorsAction::Add { id, name } => operators::add(&db, id, name)?,
                OperatorsAction::List { json } => operators::list(&db, *json)?,
            }
        }
        Some(Commands::Logs {
            machines,
            lines,
            operators,
            range,
            json,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let filters = logs::Filters {
                machines: machines.clone(),
                lines: lines.clone(),
                operators: operators.clone(),
            };
            logs::run(&db, &db, &config.policy, &filters, range, *json)?;
        }
        Some(Commands::Ids { kind, range }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            ids::run(&db, (*kind).into(), range)?;
        }
        Some(Commands::Stats { range, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            stats::run(&db, range, *json)?;
        }
        Some(Commands::Efficiency { range, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            efficiency::run(&db, range, *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
