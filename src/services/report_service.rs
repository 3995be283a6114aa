//! Rapporter och systemanteckningar när den bifogade filen ändras

use chrono::Utc;
use tracing::{debug, info};

use crate::db::{AuditRepository, Database, ProcessRepository, ReportRepository, UserRepository};
use crate::models::{Anotacion, FileChange, Report};
use crate::utils::{AppError, AppResult};

pub struct ReportService<'a> {
    db: &'a Database,
}

impl<'a> ReportService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Spara ny eller befintlig rapport.
    ///
    /// Vid uppdatering jämförs filnamnet mot det lagrade. En ändring ger en
    /// anteckning på rapportens process, attribuerad till `actor`. Nya
    /// rapporter ger aldrig någon anteckning.
    pub fn save_report(&self, report: &mut Report, actor: Option<i64>) -> AppResult<i64> {
        report.validate()?;

        let mut record = report.clone();
        if record.created_at.is_none() {
            record.created_at = Some(Utc::now());
        }

        let (id, change) = self.db.transaction(|tx| -> AppResult<(i64, Option<FileChange>)> {
            if !UserRepository::exists_in(tx, record.user_id)? {
                return Err(AppError::not_found(format!("Användare {}", record.user_id)));
            }
            if let Some(process_id) = record.process_id {
                if ProcessRepository::status_in(tx, process_id)?.is_none() {
                    return Err(AppError::not_found(format!("Process {}", process_id)));
                }
            }

            let Some(id) = record.id else {
                let id = ReportRepository::insert_in(tx, &record)?;
                return Ok((id, None));
            };

            let previous = ReportRepository::find_by_id_in(tx, id)?
                .ok_or_else(|| AppError::not_found(format!("Rapport {}", id)))?;
            record.created_at = previous.created_at;
            ReportRepository::update_in(tx, &record)?;

            let change = FileChange::detect(previous.pdf_file.as_deref(), record.pdf_file.as_deref());
            if let (Some(change), Some(process_id)) = (&change, record.process_id) {
                let mut note = Anotacion::new(process_id, actor, change.annotation_text(&record.title));
                AuditRepository::insert_annotation_in(tx, &mut note)?;
            }

            Ok((id, change))
        })?;

        match &change {
            Some(change) => info!("Rapport {}: fil ändrad ({:?})", id, change),
            None => debug!("Sparade rapport {}", id),
        }

        record.id = Some(id);
        *report = record;
        Ok(id)
    }

    pub fn find(&self, report_id: i64) -> AppResult<Report> {
        self.db
            .reports()
            .find_by_id(report_id)?
            .ok_or_else(|| AppError::not_found(format!("Rapport {}", report_id)))
    }

    pub fn reports_for_process(&self, process_id: i64) -> AppResult<Vec<Report>> {
        Ok(self.db.reports().find_by_process(process_id)?)
    }

    pub fn delete_report(&self, report_id: i64) -> AppResult<()> {
        self.find(report_id)?;
        self.db.reports().delete(report_id)?;
        info!("Tog bort rapport {}", report_id);
        Ok(())
    }
}
