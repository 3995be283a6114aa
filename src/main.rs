//! Radtrack - Entry Point

mod cli;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use radtrack::services::{ChecklistCatalog, ProcessService};
use radtrack::utils::path::get_config_path;
use radtrack::{AppConfig, Database};

fn init_logging(level: &str) {
    // RUST_LOG går före konfigurationen
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(get_config_path);
    let mut config = AppConfig::load(&config_path)?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    init_logging(&config.log_level);
    tracing::info!("Startar Radtrack v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::open(&config.database_path)?;
    db.migrate()?;

    match cli.command {
        Command::Migrate => {
            tracing::info!("Databas klar: {}", config.database_path.display());
        }
        Command::Definitions { process_type, category } => {
            let catalog = ChecklistCatalog::new(&db);
            let definitions = catalog.definitions_for(process_type, category)?;
            let total = catalog.group_total(process_type, category)?;
            let out = json!({
                "process_type": process_type,
                "practice_category": category,
                "total": total,
                "definitions": definitions,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Show { process_id } => {
            let service = ProcessService::new(&db).with_max_assignees(config.max_assignees);
            let overview = service.overview(process_id)?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
    }

    Ok(())
}
