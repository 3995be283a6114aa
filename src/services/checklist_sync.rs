//! Tjänst för att skapa processens checklistpunkter från definitionerna

use rusqlite::Connection;
use tracing::debug;

use crate::db::{ChecklistRepository, Database, ProcessRepository};
use crate::models::{Process, ProcessChecklistItem};
use crate::services::checklist_catalog::ChecklistCatalog;
use crate::utils::{AppError, AppResult};

/// Resultat av synk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecklistSyncResult {
    pub created: usize,
    pub skipped: usize,
}

pub struct ChecklistSyncService<'a> {
    db: &'a Database,
}

impl<'a> ChecklistSyncService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Skapa saknade punkter för en sparad process. Befintliga punkter rörs inte.
    pub fn ensure_items(&self, process_id: i64) -> AppResult<ChecklistSyncResult> {
        self.db.transaction(|tx| -> AppResult<ChecklistSyncResult> {
            let process = ProcessRepository::find_by_id_in(tx, process_id)?
                .ok_or_else(|| AppError::not_found(format!("Process {}", process_id)))?;
            Ok(Self::ensure_items_in(tx, &process)?)
        })
    }

    pub(crate) fn ensure_items_in(conn: &Connection, process: &Process) -> anyhow::Result<ChecklistSyncResult> {
        let process_id = process
            .id
            .ok_or_else(|| anyhow::anyhow!("Process har inget ID"))?;

        let definitions = ChecklistCatalog::definitions_for_in(
            conn,
            process.process_type,
            process.effective_category(),
        )?;
        let existing = ChecklistRepository::definition_ids_for_process_in(conn, process_id)?;

        let mut result = ChecklistSyncResult::default();

        for def in definitions {
            let def_id = match def.id {
                Some(id) => id,
                None => {
                    result.skipped += 1;
                    continue;
                }
            };

            if existing.contains(&def_id) {
                result.skipped += 1;
                continue;
            }

            let mut item = ProcessChecklistItem::from_definition(process_id, def_id);
            ChecklistRepository::create_item_in(conn, &mut item)?;
            result.created += 1;
        }

        debug!(
            "Checklista för process {}: {} skapade, {} fanns redan",
            process_id, result.created, result.skipped
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PracticeCategory, ProcessType, User};
    use chrono::Utc;

    fn insert_process(db: &Database, process: &mut Process) -> i64 {
        process.fecha_inicio = Some(Utc::now());
        let id = db
            .with_connection(|conn| ProcessRepository::insert_in(conn, process))
            .unwrap();
        process.id = Some(id);
        id
    }

    #[test]
    fn test_ensure_items_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.users().create(&mut User::new("procuser")).unwrap();
        let mut process = Process::new(owner, ProcessType::Asesoria)
            .with_category(PracticeCategory::MedicaCat2);
        let id = insert_process(&db, &mut process);

        let service = ChecklistSyncService::new(&db);
        let first = service.ensure_items(id).unwrap();
        assert_eq!(first, ChecklistSyncResult { created: 19, skipped: 0 });

        let second = service.ensure_items(id).unwrap();
        assert_eq!(second, ChecklistSyncResult { created: 0, skipped: 19 });
        assert_eq!(db.checklists().count_for_process(id).unwrap(), 19);
    }

    #[test]
    fn test_ensure_items_fills_gaps_only() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.users().create(&mut User::new("procuser")).unwrap();
        let mut process = Process::new(owner, ProcessType::ControlCalidad);
        let id = insert_process(&db, &mut process);

        let service = ChecklistSyncService::new(&db);
        service.ensure_items(id).unwrap();

        let items = db.checklists().find_by_process(id).unwrap();
        let removed = items[0].id.unwrap();
        db.with_connection(|conn| {
            conn.execute("DELETE FROM process_checklist_items WHERE id = ?", [removed])?;
            Ok(())
        })
        .unwrap();

        let result = service.ensure_items(id).unwrap();
        assert_eq!(result, ChecklistSyncResult { created: 1, skipped: 3 });
    }

    #[test]
    fn test_ensure_items_missing_process() {
        let db = Database::open_in_memory().unwrap();
        let err = ChecklistSyncService::new(&db).ensure_items(42).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_other_type_has_no_items() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.users().create(&mut User::new("procuser")).unwrap();
        let mut process = Process::new(owner, ProcessType::Otro);
        let id = insert_process(&db, &mut process);

        let result = ChecklistSyncService::new(&db).ensure_items(id).unwrap();
        assert_eq!(result.created, 0);
    }
}
