pub mod schema;
pub mod migrations;
pub mod user_repo;
pub mod process_repo;
pub mod checklist_repo;
pub mod audit_repo;
pub mod report_repo;
pub mod equipment_repo;

use anyhow::{anyhow, Result};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use user_repo::UserRepository;
pub use process_repo::ProcessRepository;
pub use checklist_repo::ChecklistRepository;
pub use audit_repo::AuditRepository;
pub use report_repo::ReportRepository;
pub use equipment_repo::EquipmentRepository;

/// Lås anslutningen; en förgiftad mutex blir ett vanligt fel
pub(crate) fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| anyhow!("Databasanslutningen är förgiftad efter en tidigare panik"))
}

/// Huvuddatabas-wrapper med thread-safe access
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Öppna eller skapa databas
    pub fn open(path: &Path) -> Result<Self> {
        // Skapa katalog om den inte finns
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Konfigurera SQLite
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Öppna in-memory databas (för tester)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        // Krävs för CASCADE och RESTRICT
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Kör databasmigrationer
    pub fn migrate(&self) -> Result<()> {
        let conn = lock(&self.conn)?;
        migrations::run_migrations(&conn)
    }

    /// Hämta användar-repository
    pub fn users(&self) -> UserRepository {
        UserRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta process-repository
    pub fn processes(&self) -> ProcessRepository {
        ProcessRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta checklist-repository
    pub fn checklists(&self) -> ChecklistRepository {
        ChecklistRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta audit-repository
    pub fn audit(&self) -> AuditRepository {
        AuditRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta rapport-repository
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta utrustnings-repository
    pub fn equipment(&self) -> EquipmentRepository {
        EquipmentRepository::new(Arc::clone(&self.conn))
    }

    /// Direkt tillgång till connection (för avancerade operationer)
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = lock(&self.conn)?;
        f(&conn)
    }

    /// Kör `f` i en transaktion. Commit vid Ok, rollback vid Err.
    ///
    /// Repositories får inte användas inifrån `f` (mutexen är redan låst);
    /// använd deras `*_in`-funktioner som tar `&Connection`.
    pub fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
        E: From<rusqlite::Error> + From<anyhow::Error>,
    {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
