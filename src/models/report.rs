use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TITLE_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    EnGeneracion,
    Revisado,
    Aprobado,
}

impl ReportStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EnGeneracion => "En Generación",
            Self::Revisado => "Revisado",
            Self::Aprobado => "Aprobado",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnGeneracion => "en_generacion",
            Self::Revisado => "revisado",
            Self::Aprobado => "aprobado",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "en_generacion" => Some(Self::EnGeneracion),
            "revisado" => Some(Self::Revisado),
            "aprobado" => Some(Self::Aprobado),
            _ => None,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rapport med en valfri bifogad PDF. Endast filnamnet spåras här.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Option<i64>,
    pub user_id: i64,
    pub process_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub pdf_file: Option<String>,
    pub estado_reporte: ReportStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn new(user_id: i64, title: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id,
            process_id: None,
            title: title.into(),
            description: None,
            pdf_file: None,
            estado_reporte: ReportStatus::default(),
            created_at: None,
        }
    }

    pub fn for_process(mut self, process_id: i64) -> Self {
        self.process_id = Some(process_id);
        self
    }

    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.pdf_file = Some(file_name.into());
        self
    }

    pub fn validate(&self) -> Result<(), ReportValidationError> {
        if self.title.trim().is_empty() {
            return Err(ReportValidationError::EmptyTitle);
        }
        if self.title.chars().count() > TITLE_MAX_LEN {
            return Err(ReportValidationError::TitleTooLong);
        }
        if let Some(desc) = &self.description {
            if desc.chars().count() > DESCRIPTION_MAX_LEN {
                return Err(ReportValidationError::DescriptionTooLong);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportValidationError {
    #[error("Titel krävs")]
    EmptyTitle,
    #[error("Titeln får vara högst {max} tecken", max = TITLE_MAX_LEN)]
    TitleTooLong,
    #[error("Beskrivningen får vara högst {max} tecken", max = DESCRIPTION_MAX_LEN)]
    DescriptionTooLong,
}

/// Hur den bifogade filen ändrades mellan två sparningar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Added(String),
    Updated(String),
    Removed(String),
}

impl FileChange {
    pub fn detect(previous: Option<&str>, current: Option<&str>) -> Option<Self> {
        match (previous, current) {
            (None, Some(new)) => Some(Self::Added(new.to_string())),
            (Some(old), Some(new)) if old != new => Some(Self::Updated(new.to_string())),
            (Some(old), None) => Some(Self::Removed(old.to_string())),
            _ => None,
        }
    }

    /// Systemtext för anteckningen
    pub fn annotation_text(&self, report_title: &str) -> String {
        match self {
            Self::Added(name) => format!(
                "Se agregó el archivo '{}' al reporte '{}'.",
                name, report_title
            ),
            Self::Updated(name) => format!(
                "Se actualizó el archivo del reporte '{}' a '{}'.",
                report_title, name
            ),
            Self::Removed(name) => format!(
                "Se eliminó el archivo '{}' del reporte '{}'.",
                name, report_title
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_file_change() {
        assert_eq!(FileChange::detect(None, None), None);
        assert_eq!(FileChange::detect(Some("a.pdf"), Some("a.pdf")), None);
        assert_eq!(
            FileChange::detect(None, Some("a.pdf")),
            Some(FileChange::Added("a.pdf".into()))
        );
        assert_eq!(
            FileChange::detect(Some("a.pdf"), Some("b.pdf")),
            Some(FileChange::Updated("b.pdf".into()))
        );
        assert_eq!(
            FileChange::detect(Some("a.pdf"), None),
            Some(FileChange::Removed("a.pdf".into()))
        );
    }

    #[test]
    fn test_annotation_text_names_file() {
        let text = FileChange::Updated("file2.pdf".into()).annotation_text("Informe");
        assert!(text.contains("file2.pdf"));
        assert!(text.contains("actualizó"));
        assert!(!text.contains("agregó"));
    }

    #[test]
    fn test_validation() {
        let report = Report::new(1, "Informe de prueba");
        assert!(report.validate().is_ok());

        let long = Report::new(1, "x".repeat(TITLE_MAX_LEN + 1));
        assert_eq!(long.validate(), Err(ReportValidationError::TitleTooLong));

        let empty = Report::new(1, "");
        assert_eq!(empty.validate(), Err(ReportValidationError::EmptyTitle));
    }
}
