use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{Report, ReportStatus};

const SELECT_REPORT: &str = "SELECT id, user_id, process_id, title, description, pdf_file,
        estado_reporte, created_at
 FROM reports";

pub struct ReportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReportRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Report>> {
        let conn = lock(&self.conn)?;
        Self::find_by_id_in(&conn, id)
    }

    pub fn find_by_process(&self, process_id: i64) -> Result<Vec<Report>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE process_id = ? ORDER BY created_at DESC, id DESC",
            SELECT_REPORT
        ))?;

        let reports = stmt
            .query_map([process_id], Self::row_to_report)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(reports)
    }

    pub fn find_by_user(&self, user_id: i64) -> Result<Vec<Report>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            SELECT_REPORT
        ))?;

        let reports = stmt
            .query_map([user_id], Self::row_to_report)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(reports)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM reports WHERE id = ?", [id])?;

        if rows == 0 {
            return Err(anyhow!("Rapport med ID {} hittades inte", id));
        }

        Ok(())
    }

    pub(crate) fn count_for_process_in(conn: &Connection, process_id: i64) -> Result<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE process_id = ?",
            [process_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub(crate) fn find_by_id_in(conn: &Connection, id: i64) -> Result<Option<Report>> {
        let report = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_REPORT),
                [id],
                Self::row_to_report,
            )
            .optional()?;
        Ok(report)
    }

    /// Infoga rapport. created_at måste vara satt.
    pub(crate) fn insert_in(conn: &Connection, report: &Report) -> Result<i64> {
        let created_at = report
            .created_at
            .ok_or_else(|| anyhow!("Rapport saknar created_at"))?;

        conn.execute(
            "INSERT INTO reports
             (user_id, process_id, title, description, pdf_file, estado_reporte, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                report.user_id,
                report.process_id,
                report.title,
                report.description,
                report.pdf_file,
                report.estado_reporte.as_str(),
                created_at,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub(crate) fn update_in(conn: &Connection, report: &Report) -> Result<()> {
        let id = report.id.ok_or_else(|| anyhow!("Rapport har inget ID"))?;

        let rows = conn.execute(
            "UPDATE reports SET
                user_id = ?1, process_id = ?2, title = ?3, description = ?4,
                pdf_file = ?5, estado_reporte = ?6
             WHERE id = ?7",
            params![
                report.user_id,
                report.process_id,
                report.title,
                report.description,
                report.pdf_file,
                report.estado_reporte.as_str(),
                id,
            ],
        )?;

        if rows == 0 {
            return Err(anyhow!("Rapport med ID {} hittades inte", id));
        }

        Ok(())
    }

    fn row_to_report(row: &Row) -> rusqlite::Result<Report> {
        let estado: String = row.get(6)?;

        Ok(Report {
            id: Some(row.get(0)?),
            user_id: row.get(1)?,
            process_id: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            pdf_file: row.get(5)?,
            estado_reporte: ReportStatus::from_db_str(&estado).unwrap_or_default(),
            created_at: row.get(7)?,
        })
    }
}
