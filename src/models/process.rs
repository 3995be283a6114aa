use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Högsta antal personal som får tilldelas en process
pub const DEFAULT_MAX_ASSIGNEES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    CalculoBlindajes,
    ControlCalidad,
    EstudioAmbiental,
    NivelesDeReferencia,
    Asesoria,
    #[default]
    Otro,
}

impl ProcessType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CalculoBlindajes => "Cálculo de Blindajes",
            Self::ControlCalidad => "Control de Calidad",
            Self::EstudioAmbiental => "Estudio Ambiental",
            Self::NivelesDeReferencia => "Niveles de Referencia",
            Self::Asesoria => "Asesoría",
            Self::Otro => "Otro",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalculoBlindajes => "calculo_blindajes",
            Self::ControlCalidad => "control_calidad",
            Self::EstudioAmbiental => "estudio_ambiental",
            Self::NivelesDeReferencia => "niveles_de_referencia",
            Self::Asesoria => "asesoria",
            Self::Otro => "otro",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "calculo_blindajes" => Some(Self::CalculoBlindajes),
            "control_calidad" => Some(Self::ControlCalidad),
            "estudio_ambiental" => Some(Self::EstudioAmbiental),
            "niveles_de_referencia" => Some(Self::NivelesDeReferencia),
            "asesoria" => Some(Self::Asesoria),
            "otro" => Some(Self::Otro),
            _ => None,
        }
    }

    /// Typer där practice_category har betydelse
    pub fn uses_practice_category(&self) -> bool {
        matches!(self, Self::EstudioAmbiental | Self::Asesoria)
    }

    /// Typen vars checklistdefinitioner används för den här typen.
    ///
    /// Niveles de referencia har inga egna definitioner utan lånar hela
    /// uppsättningen från cálculo de blindajes.
    pub fn checklist_source(&self) -> Self {
        match self {
            Self::NivelesDeReferencia => Self::CalculoBlindajes,
            other => *other,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::CalculoBlindajes,
            Self::ControlCalidad,
            Self::EstudioAmbiental,
            Self::NivelesDeReferencia,
            Self::Asesoria,
            Self::Otro,
        ]
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeCategory {
    MedicaCat1,
    MedicaCat2,
    Veterinaria,
    Industrial,
    Investigacion,
}

impl PracticeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MedicaCat1 => "Médica Categoría 1",
            Self::MedicaCat2 => "Médica Categoría 2",
            Self::Veterinaria => "Veterinaria",
            Self::Industrial => "Industrial",
            Self::Investigacion => "Investigación",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedicaCat1 => "medica_cat1",
            Self::MedicaCat2 => "medica_cat2",
            Self::Veterinaria => "veterinaria",
            Self::Industrial => "industrial",
            Self::Investigacion => "investigacion",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "medica_cat1" => Some(Self::MedicaCat1),
            "medica_cat2" => Some(Self::MedicaCat2),
            "veterinaria" => Some(Self::Veterinaria),
            "industrial" => Some(Self::Industrial),
            "investigacion" => Some(Self::Investigacion),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::MedicaCat1,
            Self::MedicaCat2,
            Self::Veterinaria,
            Self::Industrial,
            Self::Investigacion,
        ]
    }
}

impl fmt::Display for PracticeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    #[default]
    EnProgreso,
    EnRevision,
    Radicado,
    Finalizado,
    /// Omarbetning: alla checklistpunkter nollställs när processen går in hit
    EnModificacion,
}

impl ProcessStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EnProgreso => "En Progreso",
            Self::EnRevision => "En Revisión",
            Self::Radicado => "Radicado",
            Self::Finalizado => "Finalizado",
            Self::EnModificacion => "En Modificación",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnProgreso => "en_progreso",
            Self::EnRevision => "en_revision",
            Self::Radicado => "radicado",
            Self::Finalizado => "finalizado",
            Self::EnModificacion => "en_modificacion",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "en_progreso" => Some(Self::EnProgreso),
            "en_revision" => Some(Self::EnRevision),
            "radicado" => Some(Self::Radicado),
            "finalizado" => Some(Self::Finalizado),
            "en_modificacion" => Some(Self::EnModificacion),
            _ => None,
        }
    }

    pub fn is_rework(&self) -> bool {
        matches!(self, Self::EnModificacion)
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::EnProgreso,
            Self::EnRevision,
            Self::Radicado,
            Self::Finalizado,
            Self::EnModificacion,
        ]
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// En arbetsorder som ägs av en kund
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: Option<i64>,
    /// Kunden som äger processen
    pub user_id: i64,
    pub process_type: ProcessType,
    pub practice_category: Option<PracticeCategory>,
    pub estado: ProcessStatus,
    pub fecha_inicio: Option<DateTime<Utc>>,
    pub fecha_final: Option<DateTime<Utc>>,
    pub fecha_asignacion: Option<DateTime<Utc>>,
    pub assigned_to: BTreeSet<i64>,
}

impl Process {
    pub fn new(user_id: i64, process_type: ProcessType) -> Self {
        Self {
            id: None,
            user_id,
            process_type,
            practice_category: None,
            estado: ProcessStatus::default(),
            fecha_inicio: None,
            fecha_final: None,
            fecha_asignacion: None,
            assigned_to: BTreeSet::new(),
        }
    }

    pub fn with_category(mut self, category: PracticeCategory) -> Self {
        self.practice_category = Some(category);
        self
    }

    /// Kategorin som faktiskt gäller för checklistan
    pub fn effective_category(&self) -> Option<PracticeCategory> {
        if self.process_type.uses_practice_category() {
            self.practice_category
        } else {
            None
        }
    }

    pub fn summary(&self, owner_username: &str) -> String {
        format!(
            "{} for {} - Status: {}",
            self.process_type.label(),
            owner_username,
            self.estado.label()
        )
    }

    pub fn validate(&self, max_assignees: usize) -> Result<(), ProcessValidationError> {
        if self.user_id <= 0 {
            return Err(ProcessValidationError::MissingOwner);
        }

        if self.assigned_to.len() > max_assignees {
            return Err(ProcessValidationError::TooManyAssignees {
                max: max_assignees,
                got: self.assigned_to.len(),
            });
        }

        if let (Some(start), Some(end)) = (self.fecha_inicio, self.fecha_final) {
            if end < start {
                return Err(ProcessValidationError::FinalBeforeStart);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessValidationError {
    #[error("Processen måste tillhöra en kund")]
    MissingOwner,
    #[error("Högst {max} användare kan tilldelas en process (fick {got})")]
    TooManyAssignees { max: usize, got: usize },
    #[error("Slutdatum kan inte vara före startdatum")]
    FinalBeforeStart,
    #[error("Användare {0} är inte intern personal och kan inte tilldelas")]
    NotStaff(i64),
}

impl ProcessValidationError {
    /// Fältet som felet gäller
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingOwner => "user",
            Self::TooManyAssignees { .. } | Self::NotStaff(_) => "assigned_to",
            Self::FinalBeforeStart => "fecha_final",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_keys() {
        for status in ProcessStatus::all() {
            assert_eq!(ProcessStatus::from_db_str(status.as_str()), Some(*status));
        }
        assert_eq!(ProcessStatus::from_db_str("estado_invalido"), None);
    }

    #[test]
    fn test_reference_levels_borrow_shielding_checklist() {
        assert_eq!(
            ProcessType::NivelesDeReferencia.checklist_source(),
            ProcessType::CalculoBlindajes
        );
        assert_eq!(
            ProcessType::ControlCalidad.checklist_source(),
            ProcessType::ControlCalidad
        );
    }

    #[test]
    fn test_effective_category_ignored_for_plain_types() {
        let asesoria = Process::new(1, ProcessType::Asesoria).with_category(PracticeCategory::Veterinaria);
        assert_eq!(asesoria.effective_category(), Some(PracticeCategory::Veterinaria));

        let control = Process::new(1, ProcessType::ControlCalidad).with_category(PracticeCategory::Veterinaria);
        assert_eq!(control.effective_category(), None);
    }

    #[test]
    fn test_validation() {
        let mut process = Process::new(1, ProcessType::Otro);
        assert!(process.validate(DEFAULT_MAX_ASSIGNEES).is_ok());

        process.assigned_to.extend([10, 11, 12, 13]);
        let err = process.validate(DEFAULT_MAX_ASSIGNEES).unwrap_err();
        assert_eq!(err, ProcessValidationError::TooManyAssignees { max: 3, got: 4 });
        assert_eq!(err.field(), "assigned_to");

        let orphan = Process::new(0, ProcessType::Otro);
        assert!(matches!(
            orphan.validate(DEFAULT_MAX_ASSIGNEES),
            Err(ProcessValidationError::MissingOwner)
        ));
    }

    #[test]
    fn test_summary() {
        let process = Process::new(1, ProcessType::Asesoria);
        assert_eq!(
            process.summary("procuser"),
            "Asesoría for procuser - Status: En Progreso"
        );
    }
}
