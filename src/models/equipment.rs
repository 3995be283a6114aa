use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PracticeCategory, Process, ProcessType};

pub const REPORT_TITLE_CONTROL_CALIDAD: &str = "Informes de Control de Calidad";
pub const REPORT_TITLE_ESTUDIO_AMBIENTAL: &str = "Informes de Estudio Ambiental";

/// Typ av utrustning, t.ex. "RX CONVENCIONAL"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentType {
    pub id: Option<i64>,
    pub name: String,
}

impl EquipmentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), EquipmentValidationError> {
        if self.name.trim().is_empty() {
            return Err(EquipmentValidationError::EmptyTypeName);
        }
        Ok(())
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EstadoEquipo {
    #[default]
    EnUso,
    DadoDeBaja,
}

impl EstadoEquipo {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EnUso => "En Uso",
            Self::DadoDeBaja => "Dado de Baja",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnUso => "en_uso",
            Self::DadoDeBaja => "dado_de_baja",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "en_uso" => Some(Self::EnUso),
            "dado_de_baja" => Some(Self::DadoDeBaja),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::EnUso, Self::DadoDeBaja]
    }
}

impl fmt::Display for EstadoEquipo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strålningsutrustning hos en kund, valfritt kopplad till en process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: Option<i64>,
    pub equipment_type_id: Option<i64>,
    /// Fritt namn. Kan vara tomt när typen räcker som beskrivning.
    pub nombre: String,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    /// Unikt när det är satt
    pub serial: Option<String>,
    pub user_id: Option<i64>,
    pub process_id: Option<i64>,
    pub sede: Option<String>,
    pub estado_actual: EstadoEquipo,
    pub fecha_adquisicion: Option<NaiveDate>,
    pub fecha_vigencia_licencia: Option<NaiveDate>,
    pub fecha_ultimo_control_calidad: Option<NaiveDate>,
    pub fecha_vencimiento_control_calidad: Option<NaiveDate>,
}

impl Equipment {
    pub fn new(nombre: impl Into<String>) -> Self {
        Self {
            id: None,
            equipment_type_id: None,
            nombre: nombre.into(),
            marca: None,
            modelo: None,
            serial: None,
            user_id: None,
            process_id: None,
            sede: None,
            estado_actual: EstadoEquipo::default(),
            fecha_adquisicion: None,
            fecha_vigencia_licencia: None,
            fecha_ultimo_control_calidad: None,
            fecha_vencimiento_control_calidad: None,
        }
    }

    pub fn with_type(mut self, equipment_type_id: i64) -> Self {
        self.equipment_type_id = Some(equipment_type_id);
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    pub fn owned_by(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn for_process(mut self, process_id: i64) -> Self {
        self.process_id = Some(process_id);
        self
    }

    /// Tomma serienummer lagras som NULL så att unikheten bara gäller riktiga värden
    pub fn normalize(&mut self) {
        self.nombre = self.nombre.trim().to_string();
        if self.serial.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.serial = None;
        }
        if let Some(serial) = self.serial.as_mut() {
            *serial = serial.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), EquipmentValidationError> {
        if self.nombre.trim().is_empty() && self.equipment_type_id.is_none() {
            return Err(EquipmentValidationError::MissingName);
        }
        Ok(())
    }

    /// "<typ> (<serienummer>) - Owner: <användarnamn>"
    pub fn describe(&self, type_name: Option<&str>, owner_username: Option<&str>) -> String {
        let name = type_name.unwrap_or(&self.nombre);
        format!(
            "{} ({}) - Owner: {}",
            name,
            self.serial.as_deref().unwrap_or("None"),
            owner_username.unwrap_or("None")
        )
    }
}

/// Rubrik för utrustningens rapporter.
///
/// Miljöstudier, och praktiker där rapporterna är miljöstudier, får
/// "Informes de Estudio Ambiental". Allt annat, även utrustning utan
/// process, får kvalitetskontroll.
pub fn report_title(process: Option<&Process>) -> &'static str {
    let Some(process) = process else {
        return REPORT_TITLE_CONTROL_CALIDAD;
    };

    let environmental_category = matches!(
        process.practice_category,
        Some(PracticeCategory::Veterinaria | PracticeCategory::Industrial | PracticeCategory::Investigacion)
    );

    if process.process_type == ProcessType::EstudioAmbiental || environmental_category {
        REPORT_TITLE_ESTUDIO_AMBIENTAL
    } else {
        REPORT_TITLE_CONTROL_CALIDAD
    }
}

/// Ett byte av röntgenrör på en utrustning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XRayTube {
    pub id: Option<i64>,
    pub equipment_id: i64,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub serial: Option<String>,
    pub fecha_cambio: NaiveDate,
}

impl XRayTube {
    pub fn new(equipment_id: i64, fecha_cambio: NaiveDate) -> Self {
        Self {
            id: None,
            equipment_id,
            marca: None,
            modelo: None,
            serial: None,
            fecha_cambio,
        }
    }

    pub fn with_details(
        mut self,
        marca: impl Into<String>,
        modelo: impl Into<String>,
        serial: impl Into<String>,
    ) -> Self {
        self.marca = Some(marca.into());
        self.modelo = Some(modelo.into());
        self.serial = Some(serial.into());
        self
    }

    /// "Tubo para <utrustning> - <serienummer> (<datum>)"
    pub fn describe(&self, equipment_nombre: &str) -> String {
        format!(
            "Tubo para {} - {} ({})",
            equipment_nombre,
            self.serial.as_deref().unwrap_or(""),
            self.fecha_cambio
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EquipmentValidationError {
    #[error("Utrustningen behöver ett namn eller en typ")]
    MissingName,
    #[error("Typnamn krävs")]
    EmptyTypeName,
    #[error("Serienumret '{0}' används redan")]
    DuplicateSerial(String),
}

impl EquipmentValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingName => "nombre",
            Self::EmptyTypeName => "name",
            Self::DuplicateSerial(_) => "serial",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_title_by_category() {
        let quality = Process::new(1, ProcessType::ControlCalidad);
        assert_eq!(report_title(Some(&quality)), REPORT_TITLE_CONTROL_CALIDAD);

        for category in [
            PracticeCategory::Veterinaria,
            PracticeCategory::Industrial,
            PracticeCategory::Investigacion,
        ] {
            let process = Process::new(1, ProcessType::Asesoria).with_category(category);
            assert_eq!(report_title(Some(&process)), REPORT_TITLE_ESTUDIO_AMBIENTAL);
        }

        let medical = Process::new(1, ProcessType::Asesoria).with_category(PracticeCategory::MedicaCat1);
        assert_eq!(report_title(Some(&medical)), REPORT_TITLE_CONTROL_CALIDAD);

        let study = Process::new(1, ProcessType::EstudioAmbiental);
        assert_eq!(report_title(Some(&study)), REPORT_TITLE_ESTUDIO_AMBIENTAL);

        assert_eq!(report_title(None), REPORT_TITLE_CONTROL_CALIDAD);
    }

    #[test]
    fn test_describe() {
        let equipment = Equipment::new("Equipo A").with_serial("SERA");
        assert_eq!(
            equipment.describe(Some("RX VETERINARIO"), Some("equipuser")),
            "RX VETERINARIO (SERA) - Owner: equipuser"
        );

        let no_owner = Equipment::new("Equipo B").with_serial("SER456");
        assert_eq!(no_owner.describe(None, None), "Equipo B (SER456) - Owner: None");

        let tube = XRayTube::new(1, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .with_details("Marca 2", "Modelo 2", "Serial 2");
        assert_eq!(tube.describe("Equipo A"), "Tubo para Equipo A - Serial 2 (2024-06-01)");
    }

    #[test]
    fn test_normalize_and_validate() {
        let mut equipment = Equipment::new("  ").with_serial("   ");
        equipment.normalize();
        assert!(equipment.serial.is_none());
        assert_eq!(equipment.validate(), Err(EquipmentValidationError::MissingName));

        // typen räcker som namn
        let typed = Equipment::new("").with_type(3);
        assert!(typed.validate().is_ok());

        assert_eq!(
            EquipmentType::new(" ").validate(),
            Err(EquipmentValidationError::EmptyTypeName)
        );
    }

    #[test]
    fn test_estado_keys() {
        for estado in EstadoEquipo::all() {
            assert_eq!(EstadoEquipo::from_db_str(estado.as_str()), Some(*estado));
        }
    }
}
