//! Sparande av processer med statuslogg, checklistunderhåll och tilldelning
//!
//! `save_process` kör i en transaktion i ordningen: validera, jämför status
//! mot lagrad, spara, logga, underhåll checklistan.

use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{
    AuditRepository, ChecklistRepository, Database, EquipmentRepository, ProcessRepository,
    ReportRepository, UserRepository,
};
use crate::models::{
    Anotacion, ChecklistRow, Equipment, Process, ProcessStatus, ProcessStatusLog, ProcessValidationError,
    DEFAULT_MAX_ASSIGNEES,
};
use crate::services::checklist_sync::ChecklistSyncService;
use crate::services::progress::ProgressService;
use crate::utils::{AppError, AppResult};

/// Samlad detaljvy för en process
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOverview {
    pub process: Process,
    pub summary: String,
    pub progress: Decimal,
    pub checklist: Vec<ChecklistRow>,
    pub status_log: Vec<String>,
    pub annotations: Vec<Anotacion>,
    pub equipment: Vec<Equipment>,
}

pub struct ProcessService<'a> {
    db: &'a Database,
    max_assignees: usize,
}

impl<'a> ProcessService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            max_assignees: DEFAULT_MAX_ASSIGNEES,
        }
    }

    pub fn with_max_assignees(mut self, max: usize) -> Self {
        self.max_assignees = max;
        self
    }

    /// Spara ny eller befintlig process.
    ///
    /// Valideringsfel returneras innan något skrivs. Statusändringar (och
    /// skapandet) loggas alltid; `modified_by` styr bara attribueringen.
    /// `fecha_inicio` och `fecha_asignacion` härleds här; anroparens värden
    /// för dem ignoreras.
    pub fn save_process(&self, process: &mut Process, modified_by: Option<i64>) -> AppResult<i64> {
        let max = self.max_assignees;
        let mut record = process.clone();
        if !record.process_type.uses_practice_category() {
            record.practice_category = None;
        }

        let (id, previous) = self.db.transaction(|tx| -> AppResult<(i64, Option<ProcessStatus>)> {
            let stored = match record.id {
                Some(id) => Some(
                    ProcessRepository::find_by_id_in(tx, id)?
                        .ok_or_else(|| AppError::not_found(format!("Process {}", id)))?,
                ),
                None => None,
            };
            let previous = stored.as_ref().map(|p| p.estado);

            let now = Utc::now();
            record.fecha_inicio = stored.as_ref().and_then(|p| p.fecha_inicio).or(Some(now));
            // fecha_asignacion sätts bara en gång
            record.fecha_asignacion = stored.as_ref().and_then(|p| p.fecha_asignacion);
            if record.fecha_asignacion.is_none() && !record.assigned_to.is_empty() {
                record.fecha_asignacion = Some(now);
            }

            record.validate(max)?;

            if !UserRepository::exists_in(tx, record.user_id)? {
                return Err(AppError::not_found(format!("Användare {}", record.user_id)));
            }
            for user_id in &record.assigned_to {
                Self::require_staff_in(tx, *user_id)?;
            }

            let id = match record.id {
                Some(id) => {
                    ProcessRepository::update_in(tx, &record)?;
                    id
                }
                None => ProcessRepository::insert_in(tx, &record)?,
            };
            record.id = Some(id);

            let status_changed = previous != Some(record.estado);
            if status_changed {
                let mut log = ProcessStatusLog::new(id, previous, record.estado, modified_by);
                AuditRepository::insert_status_log_in(tx, &mut log)?;
            }

            if previous.is_none() {
                ChecklistSyncService::ensure_items_in(tx, &record)?;
            } else if status_changed {
                if ChecklistRepository::count_for_process_in(tx, id)? == 0 {
                    let result = ChecklistSyncService::ensure_items_in(tx, &record)?;
                    info!("Återskapade {} checklistpunkter för process {}", result.created, id);
                } else if record.estado.is_rework() {
                    ProgressService::reset_items_in(tx, id)?;
                }
            }

            Ok((id, previous))
        })?;

        match previous {
            None => info!("Skapade process {} ({})", id, record.process_type),
            Some(old) if old != record.estado => {
                info!("Process {}: {} -> {}", id, old, record.estado)
            }
            Some(_) => debug!("Sparade process {}", id),
        }

        *process = record;
        Ok(id)
    }

    pub fn find(&self, process_id: i64) -> AppResult<Process> {
        self.db
            .processes()
            .find_by_id(process_id)?
            .ok_or_else(|| AppError::not_found(format!("Process {}", process_id)))
    }

    /// Tilldela personal. Redan tilldelad är en no-op.
    pub fn assign_user(&self, process_id: i64, user_id: i64) -> AppResult<Process> {
        let max = self.max_assignees;

        self.db.transaction(|tx| -> AppResult<Process> {
            let mut process = ProcessRepository::find_by_id_in(tx, process_id)?
                .ok_or_else(|| AppError::not_found(format!("Process {}", process_id)))?;

            if process.assigned_to.contains(&user_id) {
                return Ok(process);
            }
            if process.assigned_to.len() >= max {
                return Err(ProcessValidationError::TooManyAssignees {
                    max,
                    got: process.assigned_to.len() + 1,
                }
                .into());
            }
            Self::require_staff_in(tx, user_id)?;

            ProcessRepository::add_assignment_in(tx, process_id, user_id)?;
            let now = Utc::now();
            if ProcessRepository::stamp_assignment_date_in(tx, process_id, now)? {
                info!("Process {} tilldelades för första gången", process_id);
                process.fecha_asignacion = Some(now);
            }
            process.assigned_to.insert(user_id);
            Ok(process)
        })
    }

    /// Bara intern personal kan tilldelas
    fn require_staff_in(conn: &Connection, user_id: i64) -> AppResult<()> {
        let user = UserRepository::find_by_id_in(conn, user_id)?
            .ok_or_else(|| AppError::not_found(format!("Användare {}", user_id)))?;
        if !user.is_internal() {
            return Err(ProcessValidationError::NotStaff(user_id).into());
        }
        Ok(())
    }

    /// Ta bort en tilldelning. fecha_asignacion lämnas orörd.
    pub fn unassign_user(&self, process_id: i64, user_id: i64) -> AppResult<Process> {
        self.db.transaction(|tx| -> AppResult<Process> {
            let mut process = ProcessRepository::find_by_id_in(tx, process_id)?
                .ok_or_else(|| AppError::not_found(format!("Process {}", process_id)))?;

            if ProcessRepository::remove_assignment_in(tx, process_id, user_id)? {
                process.assigned_to.remove(&user_id);
            }
            Ok(process)
        })
    }

    pub fn add_annotation(
        &self,
        process_id: i64,
        user_id: Option<i64>,
        contenido: &str,
    ) -> AppResult<Anotacion> {
        let contenido = contenido.trim();
        if contenido.is_empty() {
            return Err(AppError::validation("Anteckningen får inte vara tom"));
        }

        let mut note = Anotacion::new(process_id, user_id, contenido);
        self.db.transaction(|tx| -> AppResult<()> {
            if ProcessRepository::status_in(tx, process_id)?.is_none() {
                return Err(AppError::not_found(format!("Process {}", process_id)));
            }
            AuditRepository::insert_annotation_in(tx, &mut note)?;
            Ok(())
        })?;

        debug!("Anteckning {:?} på process {}", note.id, process_id);
        Ok(note)
    }

    /// Statuslogg, nyast först
    pub fn status_logs(&self, process_id: i64) -> AppResult<Vec<ProcessStatusLog>> {
        Ok(self.db.audit().status_logs_for_process(process_id)?)
    }

    /// Statusloggen som visningstext, nyast först
    pub fn status_log_lines(&self, process_id: i64) -> AppResult<Vec<String>> {
        let process = self.find(process_id)?;
        let logs = self.status_logs(process_id)?;

        self.db
            .with_connection(|conn| {
                let mut lines = Vec::with_capacity(logs.len());
                for log in &logs {
                    let username = match log.usuario_modifico {
                        Some(user_id) => UserRepository::find_by_id_in(conn, user_id)?.map(|u| u.username),
                        None => None,
                    };
                    lines.push(log.describe(process.process_type, username.as_deref()));
                }
                Ok(lines)
            })
            .map_err(AppError::from)
    }

    /// Anteckningar, nyast först
    pub fn annotations(&self, process_id: i64) -> AppResult<Vec<Anotacion>> {
        Ok(self.db.audit().annotations_for_process(process_id)?)
    }

    /// "<typ> for <användarnamn> - Status: <status>"
    pub fn summary(&self, process_id: i64) -> AppResult<String> {
        let process = self.find(process_id)?;
        let owner = self
            .db
            .users()
            .find_by_id(process.user_id)?
            .ok_or_else(|| AppError::not_found(format!("Användare {}", process.user_id)))?;
        Ok(process.summary(&owner.username))
    }

    pub fn overview(&self, process_id: i64) -> AppResult<ProcessOverview> {
        let process = self.find(process_id)?;
        let progress = ProgressService::new(self.db);

        Ok(ProcessOverview {
            summary: self.summary(process_id)?,
            progress: progress.progress_percentage(process_id)?,
            checklist: progress.checklist_view(process_id)?,
            status_log: self.status_log_lines(process_id)?,
            annotations: self.annotations(process_id)?,
            equipment: self.db.equipment().find_by_process(process_id)?,
            process,
        })
    }

    /// Ta bort process. Processer med rapporter eller utrustning kan inte tas bort.
    pub fn delete_process(&self, process_id: i64) -> AppResult<()> {
        let (reports, equipment) = self.db.with_connection(|conn| {
            Ok((
                ReportRepository::count_for_process_in(conn, process_id)?,
                EquipmentRepository::count_for_process_in(conn, process_id)?,
            ))
        })?;

        if reports > 0 || equipment > 0 {
            warn!(
                "Process {} har {} rapporter och {} utrustningar och tas inte bort",
                process_id, reports, equipment
            );
            return Err(AppError::validation(format!(
                "Process {} har {} rapporter och {} utrustningar",
                process_id, reports, equipment
            )));
        }

        self.db.processes().delete(process_id)?;
        info!("Tog bort process {}", process_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChecklistItemStatus, ChecklistItemUpdate, PracticeCategory, ProcessType, Role, User,
    };
    use crate::services::EquipmentService;
    use chrono::{Duration, TimeZone};

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let owner = db.users().create(&mut User::new("procuser")).unwrap();
        (db, owner)
    }

    fn staff(db: &Database, name: &str) -> i64 {
        db.users()
            .create(&mut User::new(name).with_role(Role::PersonalTecnicoApoyo))
            .unwrap()
    }

    #[test]
    fn test_create_logs_and_instantiates() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);

        let mut process = Process::new(owner, ProcessType::CalculoBlindajes);
        let id = service.save_process(&mut process, None).unwrap();

        assert_eq!(process.id, Some(id));
        assert!(process.fecha_inicio.is_some());
        assert_eq!(db.checklists().count_for_process(id).unwrap(), 4);

        let logs = service.status_logs(id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].estado_anterior, None);
        assert_eq!(logs[0].estado_nuevo, ProcessStatus::EnProgreso);
        assert_eq!(logs[0].usuario_modifico, None);
    }

    #[test]
    fn test_status_changes_append_logs() {
        let (db, owner) = setup();
        let editor = staff(&db, "loguser2");
        let service = ProcessService::new(&db);

        let mut process = Process::new(owner, ProcessType::Otro);
        let id = service.save_process(&mut process, Some(editor)).unwrap();

        process.estado = ProcessStatus::EnRevision;
        service.save_process(&mut process, Some(editor)).unwrap();
        // samma status: ingen ny rad
        service.save_process(&mut process, Some(editor)).unwrap();
        process.estado = ProcessStatus::Finalizado;
        service.save_process(&mut process, None).unwrap();

        let logs = service.status_logs(id).unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].estado_anterior, Some(ProcessStatus::EnRevision));
        assert_eq!(logs[0].estado_nuevo, ProcessStatus::Finalizado);
        assert_eq!(logs[0].usuario_modifico, None);
        assert_eq!(logs[1].usuario_modifico, Some(editor));

        let lines = service.status_log_lines(id).unwrap();
        assert!(lines[1].starts_with("Proceso Otro ("));
        assert!(lines[1].contains("En Progreso -> En Revisión por loguser2"));
        assert!(lines[0].contains("por Sistema"));
    }

    #[test]
    fn test_category_dropped_for_plain_type() {
        let (db, owner) = setup();
        let mut process = Process::new(owner, ProcessType::ControlCalidad)
            .with_category(PracticeCategory::Veterinaria);
        let id = ProcessService::new(&db).save_process(&mut process, None).unwrap();

        assert_eq!(process.practice_category, None);
        assert_eq!(db.processes().find_by_id(id).unwrap().unwrap().practice_category, None);
    }

    #[test]
    fn test_rework_resets_only_on_entry() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);
        let progress = ProgressService::new(&db);

        let mut process = Process::new(owner, ProcessType::ControlCalidad);
        let id = service.save_process(&mut process, None).unwrap();
        let first = db.checklists().find_by_process(id).unwrap()[0].id.unwrap();

        progress
            .apply_submission(id, &[ChecklistItemUpdate::new(first, ChecklistItemStatus::Aprobado)], Some(owner))
            .unwrap();

        process.estado = ProcessStatus::EnRevision;
        service.save_process(&mut process, None).unwrap();
        assert_eq!(progress.progress_percentage(id).unwrap(), Decimal::from(30));

        process.estado = ProcessStatus::EnModificacion;
        service.save_process(&mut process, None).unwrap();
        assert_eq!(progress.progress_percentage(id).unwrap(), Decimal::ZERO);

        // arbete under omarbetning nollställs inte av ett nytt sparande
        progress
            .apply_submission(id, &[ChecklistItemUpdate::new(first, ChecklistItemStatus::Aprobado)], Some(owner))
            .unwrap();
        service.save_process(&mut process, None).unwrap();
        assert_eq!(progress.progress_percentage(id).unwrap(), Decimal::from(30));
    }

    #[test]
    fn test_backfill_on_status_change() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);

        let mut process = Process::new(owner, ProcessType::Asesoria)
            .with_category(PracticeCategory::Veterinaria);
        let id = service.save_process(&mut process, None).unwrap();
        db.checklists().delete_for_process(id).unwrap();

        // utan statusändring sker ingen återfyllnad
        service.save_process(&mut process, None).unwrap();
        assert_eq!(db.checklists().count_for_process(id).unwrap(), 0);

        process.estado = ProcessStatus::Radicado;
        service.save_process(&mut process, None).unwrap();
        assert_eq!(db.checklists().count_for_process(id).unwrap(), 17);
        assert_eq!(ProgressService::new(&db).progress_percentage(id).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_validation_precedes_side_effects() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);

        let mut process = Process::new(owner, ProcessType::ControlCalidad);
        for name in ["s1", "s2", "s3", "s4"] {
            process.assigned_to.insert(staff(&db, name));
        }

        let err = service.save_process(&mut process, None).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidProcess(ProcessValidationError::TooManyAssignees { max: 3, got: 4 })
        ));
        assert!(process.id.is_none());
        assert!(db.processes().find_all().unwrap().is_empty());
    }

    #[test]
    fn test_assignment_cap_and_timestamp() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);
        let mut process = Process::new(owner, ProcessType::Otro);
        let id = service.save_process(&mut process, None).unwrap();
        assert!(process.fecha_asignacion.is_none());

        let users: Vec<i64> = ["s1", "s2", "s3", "s4"].iter().map(|n| staff(&db, n)).collect();

        let assigned = service.assign_user(id, users[0]).unwrap();
        let stamped = assigned.fecha_asignacion;
        assert!(stamped.is_some());

        service.assign_user(id, users[1]).unwrap();
        service.assign_user(id, users[2]).unwrap();
        // redan tilldelad: no-op
        service.assign_user(id, users[2]).unwrap();

        let err = service.assign_user(id, users[3]).unwrap_err();
        assert!(err.is_validation());

        let after = service.find(id).unwrap();
        assert_eq!(after.assigned_to.len(), 3);
        assert_eq!(after.fecha_asignacion, stamped);

        service.unassign_user(id, users[0]).unwrap();
        service.assign_user(id, users[3]).unwrap();
        assert_eq!(service.find(id).unwrap().fecha_asignacion, stamped);
    }

    #[test]
    fn test_assignment_timestamp_via_save() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);
        let first = staff(&db, "s1");
        let second = staff(&db, "s2");

        let mut process = Process::new(owner, ProcessType::Otro);
        process.assigned_to.insert(first);
        service.save_process(&mut process, None).unwrap();
        let stamped = process.fecha_asignacion;
        assert!(stamped.is_some());

        process.assigned_to.clear();
        process.fecha_asignacion = None;
        service.save_process(&mut process, None).unwrap();
        process.assigned_to.insert(second);
        service.save_process(&mut process, None).unwrap();

        assert_eq!(process.fecha_asignacion, stamped);
    }

    #[test]
    fn test_final_date_checked_against_derived_start() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);

        let mut process = Process::new(owner, ProcessType::Otro);
        process.fecha_final = Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());

        let err = service.save_process(&mut process, None).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidProcess(ProcessValidationError::FinalBeforeStart)
        ));
        assert!(process.id.is_none());
        assert!(db.processes().find_all().unwrap().is_empty());

        // vid uppdatering jämförs mot det lagrade startdatumet
        process.fecha_final = None;
        let id = service.save_process(&mut process, None).unwrap();
        let stored_start = process.fecha_inicio.unwrap();

        process.fecha_inicio = None;
        process.fecha_final = Some(stored_start - Duration::days(1));
        assert!(service.save_process(&mut process, None).unwrap_err().is_validation());

        let stored = service.find(id).unwrap();
        assert_eq!(stored.fecha_inicio, Some(stored_start));
        assert!(stored.fecha_final.is_none());
        assert!(stored.validate(DEFAULT_MAX_ASSIGNEES).is_ok());
    }

    #[test]
    fn test_client_cannot_be_assigned() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);
        let client = db
            .users()
            .create(&mut User::new("otrocliente").with_role(Role::Cliente))
            .unwrap();

        let mut process = Process::new(owner, ProcessType::Otro);
        let id = service.save_process(&mut process, None).unwrap();

        let err = service.assign_user(id, client).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidProcess(ProcessValidationError::NotStaff(user)) if user == client
        ));

        let after = service.find(id).unwrap();
        assert!(after.assigned_to.is_empty());
        assert!(after.fecha_asignacion.is_none());

        process.assigned_to.insert(client);
        let err = service.save_process(&mut process, None).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("(assigned_to)"));
        assert!(service.find(id).unwrap().fecha_asignacion.is_none());

        // is_staff räcker även utan intern roll
        let mut admin = User::new("admin");
        admin.is_staff = true;
        let admin = db.users().create(&mut admin).unwrap();
        assert!(service.assign_user(id, admin).unwrap().fecha_asignacion.is_some());
    }

    #[test]
    fn test_caller_assignment_date_ignored() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);

        let mut process = Process::new(owner, ProcessType::Otro);
        process.fecha_asignacion = Some(Utc.with_ymd_and_hms(2020, 5, 5, 0, 0, 0).unwrap());
        let id = service.save_process(&mut process, None).unwrap();

        assert!(process.fecha_asignacion.is_none());
        assert!(service.find(id).unwrap().fecha_asignacion.is_none());

        let before = Utc::now();
        process.fecha_asignacion = Some(Utc.with_ymd_and_hms(2020, 5, 5, 0, 0, 0).unwrap());
        process.assigned_to.insert(staff(&db, "s1"));
        service.save_process(&mut process, None).unwrap();

        let stamped = service.find(id).unwrap().fecha_asignacion.unwrap();
        assert!(stamped >= before);
    }

    #[test]
    fn test_delete_refused_while_equipment_linked() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);
        let equipment = EquipmentService::new(&db);

        let mut process = Process::new(owner, ProcessType::ControlCalidad);
        let id = service.save_process(&mut process, None).unwrap();
        let equipment_id = equipment
            .save_equipment(&mut Equipment::new("Equipo Rayos X").owned_by(owner).for_process(id))
            .unwrap();

        assert!(service.delete_process(id).unwrap_err().is_validation());
        assert_eq!(service.overview(id).unwrap().equipment.len(), 1);

        equipment.delete_equipment(equipment_id).unwrap();
        service.delete_process(id).unwrap();
        assert!(matches!(service.find(id).unwrap_err(), AppError::NotFound(_)));
    }

    #[test]
    fn test_annotations_newest_first() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);
        let mut process = Process::new(owner, ProcessType::Otro);
        let id = service.save_process(&mut process, None).unwrap();

        assert!(service.add_annotation(id, Some(owner), "   ").unwrap_err().is_validation());
        service.add_annotation(id, Some(owner), "Primera nota").unwrap();
        service.add_annotation(id, None, "Segunda nota").unwrap();

        let notes = service.annotations(id).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].contenido, "Segunda nota");

        assert!(matches!(
            service.add_annotation(999, None, "x").unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_overview_and_summary() {
        let (db, owner) = setup();
        let service = ProcessService::new(&db);
        let mut process = Process::new(owner, ProcessType::NivelesDeReferencia);
        let id = service.save_process(&mut process, None).unwrap();

        let overview = service.overview(id).unwrap();
        assert_eq!(overview.summary, "Niveles de Referencia for procuser - Status: En Progreso");
        assert_eq!(overview.checklist.len(), 4);
        assert_eq!(overview.status_log.len(), 1);
        assert_eq!(overview.progress, Decimal::ZERO);
    }
}
