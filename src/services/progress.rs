//! Framsteg för en process beräknat från checklistpunkternas status

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::db::{AuditRepository, ChecklistRepository, Database, ProcessRepository};
use crate::models::{
    ChecklistItemStatus, ChecklistItemStatusLog, ChecklistItemUpdate, ChecklistRow,
    ProcessChecklistItem,
};
use crate::utils::{AppError, AppResult};

pub struct ProgressService<'a> {
    db: &'a Database,
}

impl<'a> ProgressService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Summan av vikterna för godkända punkter, 0 utan punkter
    pub fn progress_percentage(&self, process_id: i64) -> AppResult<Decimal> {
        let total = self
            .db
            .with_connection(|conn| Self::progress_percentage_in(conn, process_id))?;
        Ok(total)
    }

    /// Nollställ alla punkter till pendiente
    pub fn reset_items(&self, process_id: i64) -> AppResult<usize> {
        self.db.transaction(|tx| -> AppResult<usize> {
            Ok(Self::reset_items_in(tx, process_id)?)
        })
    }

    /// Uppdatera en enskild punkt
    pub fn apply_item_update(
        &self,
        item_id: i64,
        status: ChecklistItemStatus,
        actor: Option<i64>,
        started_at: Option<NaiveDate>,
        completed_at: Option<NaiveDate>,
    ) -> AppResult<ProcessChecklistItem> {
        self.db.transaction(|tx| -> AppResult<ProcessChecklistItem> {
            let mut item = ChecklistRepository::find_item_in(tx, item_id)?
                .ok_or_else(|| AppError::not_found(format!("Checklistpunkt {}", item_id)))?;

            let update = ChecklistItemUpdate::new(item_id, status).dates(started_at, completed_at);
            Self::apply_item_update_in(tx, &mut item, &update, actor)?;
            Ok(item)
        })
    }

    /// Applicera ett helt progressformulär. Alla punkter måste tillhöra
    /// processen, annars avvisas hela formuläret och inget skrivs.
    pub fn apply_submission(
        &self,
        process_id: i64,
        submissions: &[ChecklistItemUpdate],
        actor: Option<i64>,
    ) -> AppResult<usize> {
        let changed = self.db.transaction(|tx| -> AppResult<usize> {
            if ProcessRepository::status_in(tx, process_id)?.is_none() {
                return Err(AppError::not_found(format!("Process {}", process_id)));
            }

            let mut items: HashMap<i64, ProcessChecklistItem> =
                ChecklistRepository::find_by_process_in(tx, process_id)?
                    .into_iter()
                    .filter_map(|item| item.id.map(|id| (id, item)))
                    .collect();

            if let Some(foreign) = submissions.iter().find(|s| !items.contains_key(&s.item_id)) {
                return Err(AppError::validation(format!(
                    "Checklistpunkt {} tillhör inte process {}",
                    foreign.item_id, process_id
                )));
            }

            let mut changed = 0;
            for update in submissions {
                if let Some(item) = items.get_mut(&update.item_id) {
                    if Self::apply_item_update_in(tx, item, update, actor)? {
                        changed += 1;
                    }
                }
            }
            Ok(changed)
        })?;

        info!(
            "Progress för process {}: {} av {} punkter bytte status",
            process_id,
            changed,
            submissions.len()
        );
        Ok(changed)
    }

    /// Skrivskyddad vy av checklistan
    pub fn checklist_view(&self, process_id: i64) -> AppResult<Vec<ChecklistRow>> {
        let rows = self
            .db
            .with_connection(|conn| ChecklistRepository::view_rows_in(conn, process_id))?;
        Ok(rows)
    }

    pub(crate) fn progress_percentage_in(conn: &Connection, process_id: i64) -> anyhow::Result<Decimal> {
        let approved = ChecklistRepository::approved_percentages_in(conn, process_id)?;
        Ok(approved.into_iter().sum())
    }

    pub(crate) fn reset_items_in(conn: &Connection, process_id: i64) -> anyhow::Result<usize> {
        let rows = ChecklistRepository::reset_for_process_in(conn, process_id)?;
        info!("Nollställde {} checklistpunkter för process {}", rows, process_id);
        Ok(rows)
    }

    /// Sätt status och datum. completed_by sätts bara när punkten blir
    /// godkänd och rensas när den lämnar godkänd. Returnerar true om
    /// statusen ändrades.
    pub(crate) fn apply_item_update_in(
        conn: &Connection,
        item: &mut ProcessChecklistItem,
        update: &ChecklistItemUpdate,
        actor: Option<i64>,
    ) -> anyhow::Result<bool> {
        let previous = item.status;
        let status_changed = previous != update.status;

        item.status = update.status;
        item.started_at = update.started_at;
        item.completed_at = update.completed_at;

        if !update.status.is_completed() {
            item.completed_by = None;
        } else if !previous.is_completed() {
            item.completed_by = actor;
        }

        ChecklistRepository::update_item_in(conn, item)?;

        if status_changed {
            let item_id = item.id.unwrap_or(update.item_id);
            let mut log = ChecklistItemStatusLog {
                id: None,
                item_id,
                estado_anterior: Some(previous),
                estado_nuevo: update.status,
                usuario_modifico: actor,
                fecha_cambio: Utc::now(),
            };
            AuditRepository::insert_item_log_in(conn, &mut log)?;
            debug!("Punkt {}: {} -> {}", item_id, previous, update.status);
        }

        Ok(status_changed)
    }
}
