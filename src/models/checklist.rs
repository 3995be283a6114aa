use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::process::{PracticeCategory, ProcessType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistItemStatus {
    #[default]
    Pendiente,
    EnProgreso,
    EnRevision,
    Aprobado,
}

impl ChecklistItemStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pendiente => "Pendiente",
            Self::EnProgreso => "En Progreso",
            Self::EnRevision => "En Revisión",
            Self::Aprobado => "Aprobado",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::EnProgreso => "en_progreso",
            Self::EnRevision => "en_revision",
            Self::Aprobado => "aprobado",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pendiente" => Some(Self::Pendiente),
            "en_progreso" => Some(Self::EnProgreso),
            "en_revision" => Some(Self::EnRevision),
            "aprobado" => Some(Self::Aprobado),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Aprobado)
    }

    pub fn all() -> &'static [Self] {
        &[Self::Pendiente, Self::EnProgreso, Self::EnRevision, Self::Aprobado]
    }
}

impl fmt::Display for ChecklistItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mall för ett viktat checklist-steg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItemDefinition {
    pub id: Option<i64>,
    pub process_type: ProcessType,
    pub practice_category: Option<PracticeCategory>,
    pub name: String,
    pub order: i32,
    /// Vikt i procent, två decimaler
    pub percentage: Decimal,
}

impl ChecklistItemDefinition {
    pub fn new(process_type: ProcessType, name: impl Into<String>, order: i32, percentage: Decimal) -> Self {
        Self {
            id: None,
            process_type,
            practice_category: None,
            name: name.into(),
            order,
            percentage: percentage.round_dp(2),
        }
    }

    pub fn with_category(mut self, category: PracticeCategory) -> Self {
        self.practice_category = Some(category);
        self
    }

    pub fn validate(&self) -> Result<(), DefinitionValidationError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionValidationError::EmptyName);
        }
        if self.percentage < Decimal::ZERO || self.percentage > Decimal::ONE_HUNDRED {
            return Err(DefinitionValidationError::PercentageOutOfRange(self.percentage));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionValidationError {
    #[error("Namn får inte vara tomt")]
    EmptyName,
    #[error("Procentsats måste ligga mellan 0 och 100 (fick {0})")]
    PercentageOutOfRange(Decimal),
}

/// En processpecifik instans av en checklistdefinition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessChecklistItem {
    pub id: Option<i64>,
    pub process_id: i64,
    pub definition_id: i64,
    pub status: ChecklistItemStatus,
    pub started_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
    pub completed_by: Option<i64>,
}

impl ProcessChecklistItem {
    pub fn from_definition(process_id: i64, definition_id: i64) -> Self {
        Self {
            id: None,
            process_id,
            definition_id,
            status: ChecklistItemStatus::Pendiente,
            started_at: None,
            completed_at: None,
            completed_by: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// Ändring av en checklistpunkt från progressformuläret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItemUpdate {
    pub item_id: i64,
    pub status: ChecklistItemStatus,
    pub started_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
}

impl ChecklistItemUpdate {
    pub fn new(item_id: i64, status: ChecklistItemStatus) -> Self {
        Self {
            item_id,
            status,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn dates(mut self, started_at: Option<NaiveDate>, completed_at: Option<NaiveDate>) -> Self {
        self.started_at = started_at;
        self.completed_at = completed_at;
        self
    }
}

/// Historik över statusändringar på en checklistpunkt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItemStatusLog {
    pub id: Option<i64>,
    pub item_id: i64,
    pub estado_anterior: Option<ChecklistItemStatus>,
    pub estado_nuevo: ChecklistItemStatus,
    pub usuario_modifico: Option<i64>,
    pub fecha_cambio: DateTime<Utc>,
}

/// Rad för skrivskyddad visning av checklistan
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistRow {
    pub item_id: i64,
    pub name: String,
    pub order: i32,
    pub percentage: Decimal,
    pub status: ChecklistItemStatus,
    pub is_completed: bool,
    pub started_at: Option<NaiveDate>,
    pub completed_at: Option<NaiveDate>,
    pub completed_by: Option<String>,
}
