//! Repository för checklistdefinitioner och processpunkter

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::lock;
use crate::models::{
    ChecklistItemDefinition, ChecklistItemStatus, ChecklistRow, PracticeCategory,
    ProcessChecklistItem, ProcessType, User,
};

/// Repository för checklistor
pub struct ChecklistRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChecklistRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    // === Definitioner ===

    /// Alla definitioner, grupperade per typ och kategori
    pub fn list_definitions(&self) -> Result<Vec<ChecklistItemDefinition>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, process_type, practice_category, name, sort_order, percentage
             FROM checklist_item_definitions
             ORDER BY process_type, COALESCE(practice_category, ''), sort_order, id",
        )?;

        let defs = stmt
            .query_map([], Self::row_to_definition)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(defs)
    }

    pub fn definitions_by_type(&self, process_type: ProcessType) -> Result<Vec<ChecklistItemDefinition>> {
        let conn = lock(&self.conn)?;
        Self::definitions_by_type_in(&conn, process_type)
    }

    /// Skapa ny definition
    pub fn create_definition(&self, def: &mut ChecklistItemDefinition) -> Result<i64> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO checklist_item_definitions
             (process_type, practice_category, name, sort_order, percentage)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                def.process_type.as_str(),
                def.practice_category.map(|c| c.as_str()),
                def.name,
                def.order,
                def.percentage.to_string(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        def.id = Some(id);
        Ok(id)
    }

    /// Definitioner för en typ, stigande ordning
    pub(crate) fn definitions_by_type_in(
        conn: &Connection,
        process_type: ProcessType,
    ) -> Result<Vec<ChecklistItemDefinition>> {
        let mut stmt = conn.prepare(
            "SELECT id, process_type, practice_category, name, sort_order, percentage
             FROM checklist_item_definitions
             WHERE process_type = ?
             ORDER BY sort_order, id",
        )?;

        let defs = stmt
            .query_map([process_type.as_str()], Self::row_to_definition)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(defs)
    }

    // === Processpunkter ===

    /// Hämta alla punkter för en process i definitionsordning
    pub fn find_by_process(&self, process_id: i64) -> Result<Vec<ProcessChecklistItem>> {
        let conn = lock(&self.conn)?;
        Self::find_by_process_in(&conn, process_id)
    }

    pub fn find_item(&self, item_id: i64) -> Result<Option<ProcessChecklistItem>> {
        let conn = lock(&self.conn)?;
        Self::find_item_in(&conn, item_id)
    }

    pub fn count_for_process(&self, process_id: i64) -> Result<usize> {
        let conn = lock(&self.conn)?;
        Self::count_for_process_in(&conn, process_id)
    }

    /// Ta bort alla punkter för en process. Används för äldre poster utan checklista.
    pub fn delete_for_process(&self, process_id: i64) -> Result<usize> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "DELETE FROM process_checklist_items WHERE process_id = ?",
            [process_id],
        )?;
        Ok(rows)
    }

    pub(crate) fn find_by_process_in(conn: &Connection, process_id: i64) -> Result<Vec<ProcessChecklistItem>> {
        let mut stmt = conn.prepare(
            "SELECT i.id, i.process_id, i.definition_id, i.status,
                    i.started_at, i.completed_at, i.completed_by
             FROM process_checklist_items i
             JOIN checklist_item_definitions d ON d.id = i.definition_id
             WHERE i.process_id = ?
             ORDER BY d.sort_order, i.id",
        )?;

        let items = stmt
            .query_map([process_id], Self::row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    pub(crate) fn find_item_in(conn: &Connection, item_id: i64) -> Result<Option<ProcessChecklistItem>> {
        let item = conn
            .query_row(
                "SELECT id, process_id, definition_id, status, started_at, completed_at, completed_by
                 FROM process_checklist_items WHERE id = ?",
                [item_id],
                Self::row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    /// Hämta vilka definitioner en process redan har punkter för
    pub(crate) fn definition_ids_for_process_in(conn: &Connection, process_id: i64) -> Result<HashSet<i64>> {
        let mut stmt = conn.prepare(
            "SELECT definition_id FROM process_checklist_items WHERE process_id = ?",
        )?;

        let ids = stmt
            .query_map([process_id], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;

        Ok(ids)
    }

    pub(crate) fn count_for_process_in(conn: &Connection, process_id: i64) -> Result<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM process_checklist_items WHERE process_id = ?",
            [process_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Skapa processpunkt
    pub(crate) fn create_item_in(conn: &Connection, item: &mut ProcessChecklistItem) -> Result<i64> {
        conn.execute(
            "INSERT INTO process_checklist_items
             (process_id, definition_id, status, started_at, completed_at, completed_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.process_id,
                item.definition_id,
                item.status.as_str(),
                item.started_at,
                item.completed_at,
                item.completed_by,
            ],
        )?;

        let id = conn.last_insert_rowid();
        item.id = Some(id);
        Ok(id)
    }

    /// Uppdatera status, datum och attribuering för en punkt
    pub(crate) fn update_item_in(conn: &Connection, item: &ProcessChecklistItem) -> Result<()> {
        let id = item.id.ok_or_else(|| anyhow!("Checklistpunkt har inget ID"))?;

        let rows = conn.execute(
            "UPDATE process_checklist_items
             SET status = ?1, started_at = ?2, completed_at = ?3, completed_by = ?4
             WHERE id = ?5",
            params![
                item.status.as_str(),
                item.started_at,
                item.completed_at,
                item.completed_by,
                id,
            ],
        )?;

        if rows == 0 {
            return Err(anyhow!("Checklistpunkt med ID {} hittades inte", id));
        }

        Ok(())
    }

    /// Nollställ alla punkter för en process. started_at lämnas orörd.
    pub(crate) fn reset_for_process_in(conn: &Connection, process_id: i64) -> Result<usize> {
        let rows = conn.execute(
            "UPDATE process_checklist_items
             SET status = ?1, completed_at = NULL, completed_by = NULL
             WHERE process_id = ?2",
            params![ChecklistItemStatus::Pendiente.as_str(), process_id],
        )?;
        Ok(rows)
    }

    /// Vikterna för godkända punkter
    pub(crate) fn approved_percentages_in(conn: &Connection, process_id: i64) -> Result<Vec<Decimal>> {
        let mut stmt = conn.prepare(
            "SELECT d.percentage
             FROM process_checklist_items i
             JOIN checklist_item_definitions d ON d.id = i.definition_id
             WHERE i.process_id = ?1 AND i.status = ?2",
        )?;

        let values = stmt
            .query_map(
                params![process_id, ChecklistItemStatus::Aprobado.as_str()],
                |row| decimal_column(row, 0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(values)
    }

    /// Rader för visning, med namn på den som godkände
    pub(crate) fn view_rows_in(conn: &Connection, process_id: i64) -> Result<Vec<ChecklistRow>> {
        let mut stmt = conn.prepare(
            "SELECT i.id, d.name, d.sort_order, d.percentage, i.status,
                    i.started_at, i.completed_at,
                    u.username, u.first_name, u.last_name, u.email
             FROM process_checklist_items i
             JOIN checklist_item_definitions d ON d.id = i.definition_id
             LEFT JOIN users u ON u.id = i.completed_by
             WHERE i.process_id = ?
             ORDER BY d.sort_order, i.id",
        )?;

        let rows = stmt
            .query_map([process_id], |row| {
                let status: String = row.get(4)?;
                let status = ChecklistItemStatus::from_db_str(&status).unwrap_or_default();
                let username: Option<String> = row.get(7)?;
                let completed_by = match username {
                    Some(username) => {
                        let user = User {
                            username,
                            first_name: row.get(8)?,
                            last_name: row.get(9)?,
                            email: row.get(10)?,
                            ..Default::default()
                        };
                        Some(user.display_name())
                    }
                    None => None,
                };

                Ok(ChecklistRow {
                    item_id: row.get(0)?,
                    name: row.get(1)?,
                    order: row.get(2)?,
                    percentage: decimal_column(row, 3)?,
                    status,
                    is_completed: status.is_completed(),
                    started_at: row.get(5)?,
                    completed_at: row.get(6)?,
                    completed_by,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    fn row_to_definition(row: &Row) -> rusqlite::Result<ChecklistItemDefinition> {
        let process_type: String = row.get(1)?;
        let category: Option<String> = row.get(2)?;

        Ok(ChecklistItemDefinition {
            id: Some(row.get(0)?),
            process_type: ProcessType::from_db_str(&process_type).unwrap_or_default(),
            practice_category: category.as_deref().and_then(PracticeCategory::from_db_str),
            name: row.get(3)?,
            order: row.get(4)?,
            percentage: decimal_column(row, 5)?,
        })
    }

    fn row_to_item(row: &Row) -> rusqlite::Result<ProcessChecklistItem> {
        let status: String = row.get(3)?;

        Ok(ProcessChecklistItem {
            id: Some(row.get(0)?),
            process_id: row.get(1)?,
            definition_id: row.get(2)?,
            status: ChecklistItemStatus::from_db_str(&status).unwrap_or_default(),
            started_at: row.get(4)?,
            completed_at: row.get(5)?,
            completed_by: row.get(6)?,
        })
    }
}

/// Procentsatser lagras som TEXT
fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
