use anyhow::{bail, Result};
use rusqlite::{params, Connection};
use tracing::info;

use super::schema::{
    CREATE_TABLES, DEFAULT_CHECKLIST_DEFINITIONS, DEFAULT_EQUIPMENT_TYPES, SCHEMA_VERSION,
};

/// Kör alla nödvändiga migrationer
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_current_version(conn)?;

    if current_version == 0 {
        // Ny databas - skapa allt
        info!("Skapar ny databas med schema version {}", SCHEMA_VERSION);
        initial_setup(conn)?;
    } else if current_version > SCHEMA_VERSION {
        // Skapad av en nyare version av programmet
        bail!(
            "Databasen har schema version {}, programmet stöder högst {}",
            current_version,
            SCHEMA_VERSION
        );
    } else {
        info!("Databas är uppdaterad (version {})", current_version);
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> Result<i32> {
    // Kontrollera om schema_migrations-tabellen finns
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_migrations')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    // Hämta senaste version
    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

fn initial_setup(conn: &Connection) -> Result<()> {
    // Skapa alla tabeller
    conn.execute_batch(CREATE_TABLES)?;

    // Sätt in standarddefinitioner för checklistor
    insert_default_definitions(conn)?;

    // Sätt in utrustningstyper
    insert_default_equipment_types(conn)?;

    // Markera migration som klar
    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    info!("Initial setup klar");
    Ok(())
}

fn insert_default_definitions(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO checklist_item_definitions
         (process_type, practice_category, name, sort_order, percentage)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    let mut count = 0;
    for (process_type, category, items) in DEFAULT_CHECKLIST_DEFINITIONS {
        // Ordningen följer positionen i gruppen, med start på 1
        for (idx, (name, percentage)) in items.iter().enumerate() {
            stmt.execute(params![
                process_type,
                category,
                name,
                (idx + 1) as i32,
                percentage.to_string(),
            ])?;
            count += 1;
        }
    }

    info!("Lade till {} standarddefinitioner för checklistor", count);
    Ok(())
}

fn insert_default_equipment_types(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO equipment_types (name) VALUES (?)")?;

    for name in DEFAULT_EQUIPMENT_TYPES {
        stmt.execute([*name])?;
    }

    info!("Lade till {} utrustningstyper", DEFAULT_EQUIPMENT_TYPES.len());
    Ok(())
}
