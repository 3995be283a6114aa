//! Kommandoradsgränssnitt för radtrack

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use radtrack::{PracticeCategory, ProcessType};

/// Radtrack - processuppföljning för strålskyddsärenden
#[derive(Debug, Parser)]
#[command(name = "radtrack", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Sökväg till config.toml (standard: plattformens konfigurationsmapp)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Databasfil, ersätter värdet i konfigurationen
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Skapa eller uppgradera databasen
    Migrate,

    /// Lista checklistdefinitioner för en processtyp som JSON
    Definitions {
        /// Processtyp, t.ex. calculo_blindajes eller asesoria
        #[arg(value_parser = parse_process_type)]
        process_type: ProcessType,

        /// Praktikkategori, t.ex. medica_cat1
        #[arg(long, value_parser = parse_category)]
        category: Option<PracticeCategory>,
    },

    /// Visa framsteg, checklista, statuslogg och anteckningar som JSON
    Show {
        process_id: i64,
    },
}

fn parse_process_type(s: &str) -> Result<ProcessType, String> {
    ProcessType::from_db_str(s).ok_or_else(|| {
        let valid: Vec<_> = ProcessType::all().iter().map(|t| t.as_str()).collect();
        format!("okänd processtyp '{}' (giltiga: {})", s, valid.join(", "))
    })
}

fn parse_category(s: &str) -> Result<PracticeCategory, String> {
    PracticeCategory::from_db_str(s).ok_or_else(|| {
        let valid: Vec<_> = PracticeCategory::all().iter().map(|c| c.as_str()).collect();
        format!("okänd kategori '{}' (giltiga: {})", s, valid.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parses_definitions_with_category() {
        let cli = Cli::parse_from(["radtrack", "definitions", "asesoria", "--category", "veterinaria"]);
        match cli.command {
            Command::Definitions { process_type, category } => {
                assert_eq!(process_type, ProcessType::Asesoria);
                assert_eq!(category, Some(PracticeCategory::Veterinaria));
            }
            _ => panic!("förväntade Definitions"),
        }
    }

    #[test]
    fn test_rejects_unknown_type() {
        assert!(Cli::try_parse_from(["radtrack", "definitions", "radiografia"]).is_err());
    }

    #[test]
    fn test_global_database_flag() {
        let cli = Cli::parse_from(["radtrack", "show", "7", "--database", "/tmp/x.db"]);
        assert!(matches!(cli.command, Command::Show { process_id: 7 }));
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }
}
