//! Append-only historik: statuslogg, punktlogg och anteckningar

use std::sync::{Arc, Mutex};

use anyhow::Result;
use rusqlite::{params, Connection, Row};

use super::lock;
use crate::models::{Anotacion, ChecklistItemStatus, ChecklistItemStatusLog, ProcessStatus, ProcessStatusLog};

pub struct AuditRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Statuslogg för en process, nyast först
    pub fn status_logs_for_process(&self, process_id: i64) -> Result<Vec<ProcessStatusLog>> {
        let conn = lock(&self.conn)?;
        Self::status_logs_for_process_in(&conn, process_id)
    }

    pub fn item_logs_for_item(&self, item_id: i64) -> Result<Vec<ChecklistItemStatusLog>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, item_id, estado_anterior, estado_nuevo, usuario_modifico, fecha_cambio
             FROM checklist_item_status_logs
             WHERE item_id = ?
             ORDER BY fecha_cambio DESC, id DESC",
        )?;

        let logs = stmt
            .query_map([item_id], |row| {
                let anterior: Option<String> = row.get(2)?;
                let nuevo: String = row.get(3)?;
                Ok(ChecklistItemStatusLog {
                    id: Some(row.get(0)?),
                    item_id: row.get(1)?,
                    estado_anterior: anterior.as_deref().and_then(ChecklistItemStatus::from_db_str),
                    estado_nuevo: ChecklistItemStatus::from_db_str(&nuevo).unwrap_or_default(),
                    usuario_modifico: row.get(4)?,
                    fecha_cambio: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(logs)
    }

    /// Anteckningar för en process, nyast först
    pub fn annotations_for_process(&self, process_id: i64) -> Result<Vec<Anotacion>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, proceso_id, usuario, contenido, fecha_creacion
             FROM anotaciones
             WHERE proceso_id = ?
             ORDER BY fecha_creacion DESC, id DESC",
        )?;

        let notes = stmt
            .query_map([process_id], |row| {
                Ok(Anotacion {
                    id: Some(row.get(0)?),
                    proceso_id: row.get(1)?,
                    usuario: row.get(2)?,
                    contenido: row.get(3)?,
                    fecha_creacion: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(notes)
    }

    pub(crate) fn status_logs_for_process_in(conn: &Connection, process_id: i64) -> Result<Vec<ProcessStatusLog>> {
        let mut stmt = conn.prepare(
            "SELECT id, proceso_id, estado_anterior, estado_nuevo, usuario_modifico, fecha_cambio
             FROM process_status_logs
             WHERE proceso_id = ?
             ORDER BY fecha_cambio DESC, id DESC",
        )?;

        let logs = stmt
            .query_map([process_id], Self::row_to_status_log)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(logs)
    }

    pub(crate) fn insert_status_log_in(conn: &Connection, log: &mut ProcessStatusLog) -> Result<i64> {
        conn.execute(
            "INSERT INTO process_status_logs
             (proceso_id, estado_anterior, estado_nuevo, usuario_modifico, fecha_cambio)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                log.proceso_id,
                log.estado_anterior.map(|e| e.as_str()),
                log.estado_nuevo.as_str(),
                log.usuario_modifico,
                log.fecha_cambio,
            ],
        )?;

        let id = conn.last_insert_rowid();
        log.id = Some(id);
        Ok(id)
    }

    pub(crate) fn insert_item_log_in(conn: &Connection, log: &mut ChecklistItemStatusLog) -> Result<i64> {
        conn.execute(
            "INSERT INTO checklist_item_status_logs
             (item_id, estado_anterior, estado_nuevo, usuario_modifico, fecha_cambio)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                log.item_id,
                log.estado_anterior.map(|e| e.as_str()),
                log.estado_nuevo.as_str(),
                log.usuario_modifico,
                log.fecha_cambio,
            ],
        )?;

        let id = conn.last_insert_rowid();
        log.id = Some(id);
        Ok(id)
    }

    pub(crate) fn insert_annotation_in(conn: &Connection, note: &mut Anotacion) -> Result<i64> {
        conn.execute(
            "INSERT INTO anotaciones (proceso_id, usuario, contenido, fecha_creacion)
             VALUES (?1, ?2, ?3, ?4)",
            params![note.proceso_id, note.usuario, note.contenido, note.fecha_creacion],
        )?;

        let id = conn.last_insert_rowid();
        note.id = Some(id);
        Ok(id)
    }

    fn row_to_status_log(row: &Row) -> rusqlite::Result<ProcessStatusLog> {
        let anterior: Option<String> = row.get(2)?;
        let nuevo: String = row.get(3)?;

        Ok(ProcessStatusLog {
            id: Some(row.get(0)?),
            proceso_id: row.get(1)?,
            estado_anterior: anterior.as_deref().and_then(ProcessStatus::from_db_str),
            estado_nuevo: ProcessStatus::from_db_str(&nuevo).unwrap_or_default(),
            usuario_modifico: row.get(4)?,
            fecha_cambio: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, ProcessRepository};
    use crate::models::{Process, ProcessType, User};
    use chrono::{Duration, Utc};

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let owner = db.users().create(&mut User::new("loguser")).unwrap();
        let mut process = Process::new(owner, ProcessType::Otro);
        process.fecha_inicio = Some(Utc::now());
        let id = db
            .with_connection(|conn| ProcessRepository::insert_in(conn, &process))
            .unwrap();
        (db, id)
    }

    #[test]
    fn test_status_logs_newest_first() {
        let (db, process_id) = setup();

        let mut first = ProcessStatusLog::new(process_id, None, ProcessStatus::EnProgreso, None);
        first.fecha_cambio = Utc::now() - Duration::minutes(5);
        let mut second = ProcessStatusLog::new(
            process_id,
            Some(ProcessStatus::EnProgreso),
            ProcessStatus::EnRevision,
            None,
        );

        db.with_connection(|conn| {
            AuditRepository::insert_status_log_in(conn, &mut first)?;
            AuditRepository::insert_status_log_in(conn, &mut second)
        })
        .unwrap();

        let logs = db.audit().status_logs_for_process(process_id).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].estado_nuevo, ProcessStatus::EnRevision);
        assert_eq!(logs[0].estado_anterior, Some(ProcessStatus::EnProgreso));
        assert_eq!(logs[1].estado_anterior, None);
    }

    #[test]
    fn test_annotations_cascade_with_process() {
        let (db, process_id) = setup();
        let mut note = Anotacion::new(process_id, None, "Nota de prueba");
        db.with_connection(|conn| AuditRepository::insert_annotation_in(conn, &mut note))
            .unwrap();
        assert_eq!(db.audit().annotations_for_process(process_id).unwrap().len(), 1);

        db.processes().delete(process_id).unwrap();
        assert!(db.audit().annotations_for_process(process_id).unwrap().is_empty());
    }
}
