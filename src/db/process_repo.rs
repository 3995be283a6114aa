use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{PracticeCategory, Process, ProcessStatus, ProcessType};

const SELECT_PROCESS: &str = "SELECT id, user_id, process_type, practice_category, estado,
        fecha_inicio, fecha_final, fecha_asignacion
 FROM processes";

pub struct ProcessRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcessRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Process>> {
        let conn = lock(&self.conn)?;
        Self::find_by_id_in(&conn, id)
    }

    /// Alla processer för en kund, nyast först
    pub fn find_by_user(&self, user_id: i64) -> Result<Vec<Process>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ? ORDER BY fecha_inicio DESC, id DESC",
            SELECT_PROCESS
        ))?;

        let mut processes = stmt
            .query_map([user_id], Self::row_to_process)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for process in &mut processes {
            process.assigned_to = Self::assignees_in(&conn, process.id.unwrap_or_default())?;
        }

        Ok(processes)
    }

    pub fn find_all(&self) -> Result<Vec<Process>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_PROCESS))?;

        let mut processes = stmt
            .query_map([], Self::row_to_process)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for process in &mut processes {
            process.assigned_to = Self::assignees_in(&conn, process.id.unwrap_or_default())?;
        }

        Ok(processes)
    }

    /// Ta bort process. Misslyckas om rapporter refererar till den.
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM processes WHERE id = ?", [id])?;

        if rows == 0 {
            return Err(anyhow!("Process med ID {} hittades inte", id));
        }

        Ok(())
    }

    pub(crate) fn find_by_id_in(conn: &Connection, id: i64) -> Result<Option<Process>> {
        let process = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_PROCESS),
                [id],
                Self::row_to_process,
            )
            .optional()?;

        match process {
            Some(mut process) => {
                process.assigned_to = Self::assignees_in(conn, id)?;
                Ok(Some(process))
            }
            None => Ok(None),
        }
    }

    /// Lagrad status, None om processen inte finns
    pub(crate) fn status_in(conn: &Connection, id: i64) -> Result<Option<ProcessStatus>> {
        let estado: Option<String> = conn
            .query_row("SELECT estado FROM processes WHERE id = ?", [id], |row| row.get(0))
            .optional()?;

        Ok(estado.map(|s| ProcessStatus::from_db_str(&s).unwrap_or_default()))
    }

    /// Infoga process med tilldelningar. fecha_inicio måste vara satt.
    pub(crate) fn insert_in(conn: &Connection, process: &Process) -> Result<i64> {
        let fecha_inicio = process
            .fecha_inicio
            .ok_or_else(|| anyhow!("Process saknar fecha_inicio"))?;

        conn.execute(
            "INSERT INTO processes
             (user_id, process_type, practice_category, estado, fecha_inicio, fecha_final, fecha_asignacion)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                process.user_id,
                process.process_type.as_str(),
                process.practice_category.map(|c| c.as_str()),
                process.estado.as_str(),
                fecha_inicio,
                process.fecha_final,
                process.fecha_asignacion,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::replace_assignments_in(conn, id, &process.assigned_to)?;
        Ok(id)
    }

    /// Uppdatera process och tilldelningar. fecha_inicio skrivs aldrig om.
    pub(crate) fn update_in(conn: &Connection, process: &Process) -> Result<()> {
        let id = process.id.ok_or_else(|| anyhow!("Process har inget ID"))?;

        let rows = conn.execute(
            "UPDATE processes SET
                user_id = ?1, process_type = ?2, practice_category = ?3, estado = ?4,
                fecha_final = ?5, fecha_asignacion = ?6
             WHERE id = ?7",
            params![
                process.user_id,
                process.process_type.as_str(),
                process.practice_category.map(|c| c.as_str()),
                process.estado.as_str(),
                process.fecha_final,
                process.fecha_asignacion,
                id,
            ],
        )?;

        if rows == 0 {
            return Err(anyhow!("Process med ID {} hittades inte", id));
        }

        Self::replace_assignments_in(conn, id, &process.assigned_to)?;
        Ok(())
    }

    pub(crate) fn assignees_in(conn: &Connection, process_id: i64) -> Result<BTreeSet<i64>> {
        let mut stmt =
            conn.prepare("SELECT user_id FROM process_assignments WHERE process_id = ?")?;
        let ids = stmt
            .query_map([process_id], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<i64>>>()?;
        Ok(ids)
    }

    pub(crate) fn add_assignment_in(conn: &Connection, process_id: i64, user_id: i64) -> Result<bool> {
        let rows = conn.execute(
            "INSERT OR IGNORE INTO process_assignments (process_id, user_id) VALUES (?1, ?2)",
            params![process_id, user_id],
        )?;
        Ok(rows > 0)
    }

    pub(crate) fn remove_assignment_in(conn: &Connection, process_id: i64, user_id: i64) -> Result<bool> {
        let rows = conn.execute(
            "DELETE FROM process_assignments WHERE process_id = ?1 AND user_id = ?2",
            params![process_id, user_id],
        )?;
        Ok(rows > 0)
    }

    /// Sätt fecha_asignacion om den saknas. Returnerar true om den sattes nu.
    pub(crate) fn stamp_assignment_date_in(
        conn: &Connection,
        process_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let rows = conn.execute(
            "UPDATE processes SET fecha_asignacion = ?1
             WHERE id = ?2 AND fecha_asignacion IS NULL",
            params![at, process_id],
        )?;
        Ok(rows > 0)
    }

    fn replace_assignments_in(conn: &Connection, process_id: i64, users: &BTreeSet<i64>) -> Result<()> {
        conn.execute(
            "DELETE FROM process_assignments WHERE process_id = ?",
            [process_id],
        )?;
        for user_id in users {
            Self::add_assignment_in(conn, process_id, *user_id)?;
        }
        Ok(())
    }

    fn row_to_process(row: &Row) -> rusqlite::Result<Process> {
        let process_type: String = row.get(2)?;
        let category: Option<String> = row.get(3)?;
        let estado: String = row.get(4)?;

        Ok(Process {
            id: Some(row.get(0)?),
            user_id: row.get(1)?,
            process_type: ProcessType::from_db_str(&process_type).unwrap_or_default(),
            practice_category: category.as_deref().and_then(PracticeCategory::from_db_str),
            estado: ProcessStatus::from_db_str(&estado).unwrap_or_default(),
            fecha_inicio: row.get(5)?,
            fecha_final: row.get(6)?,
            fecha_asignacion: row.get(7)?,
            assigned_to: BTreeSet::new(),
        })
    }
}
