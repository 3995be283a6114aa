use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::process::{ProcessStatus, ProcessType};

/// Append-only rad för en statusändring på en process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStatusLog {
    pub id: Option<i64>,
    pub proceso_id: i64,
    pub estado_anterior: Option<ProcessStatus>,
    pub estado_nuevo: ProcessStatus,
    pub usuario_modifico: Option<i64>,
    pub fecha_cambio: DateTime<Utc>,
}

impl ProcessStatusLog {
    pub fn new(
        proceso_id: i64,
        estado_anterior: Option<ProcessStatus>,
        estado_nuevo: ProcessStatus,
        usuario_modifico: Option<i64>,
    ) -> Self {
        Self {
            id: None,
            proceso_id,
            estado_anterior,
            estado_nuevo,
            usuario_modifico,
            fecha_cambio: Utc::now(),
        }
    }

    /// Visningstext, t.ex. "Proceso Asesoría (4): En Progreso -> En Revisión por ana el 2024-01-02 10:00"
    pub fn describe(&self, process_type: ProcessType, username: Option<&str>) -> String {
        let anterior = self
            .estado_anterior
            .map(|e| e.label())
            .unwrap_or("N/A");

        format!(
            "Proceso {} ({}): {} -> {} por {} el {}",
            process_type.label(),
            self.proceso_id,
            anterior,
            self.estado_nuevo.label(),
            username.unwrap_or("Sistema"),
            self.fecha_cambio.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Fritextanteckning på en process (användare eller system)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anotacion {
    pub id: Option<i64>,
    pub proceso_id: i64,
    pub usuario: Option<i64>,
    pub contenido: String,
    pub fecha_creacion: DateTime<Utc>,
}

impl Anotacion {
    pub fn new(proceso_id: i64, usuario: Option<i64>, contenido: impl Into<String>) -> Self {
        Self {
            id: None,
            proceso_id,
            usuario,
            contenido: contenido.into(),
            fecha_creacion: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_describe_with_user() {
        let mut log = ProcessStatusLog::new(
            4,
            Some(ProcessStatus::EnProgreso),
            ProcessStatus::EnRevision,
            Some(2),
        );
        log.fecha_cambio = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();

        assert_eq!(
            log.describe(ProcessType::Asesoria, Some("loguser2")),
            "Proceso Asesoría (4): En Progreso -> En Revisión por loguser2 el 2024-01-02 10:00"
        );
    }

    #[test]
    fn test_describe_system_without_prior_status() {
        let mut log = ProcessStatusLog::new(4, None, ProcessStatus::Finalizado, None);
        log.fecha_cambio = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 0).unwrap();

        assert_eq!(
            log.describe(ProcessType::Asesoria, None),
            "Proceso Asesoría (4): N/A -> Finalizado por Sistema el 2024-05-06 07:08"
        );
    }
}
