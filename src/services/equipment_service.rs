//! Utrustning, utrustningstyper och byten av röntgenrör

use tracing::{debug, info};

use crate::db::{Database, EquipmentRepository, ProcessRepository, UserRepository};
use crate::models::{
    report_title, Equipment, EquipmentType, EquipmentValidationError, Process, XRayTube,
};
use crate::utils::{AppError, AppResult};

pub struct EquipmentService<'a> {
    db: &'a Database,
}

impl<'a> EquipmentService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Spara ny eller befintlig utrustning.
    ///
    /// Typ, ägare och process måste finnas. Ett satt serienummer får inte
    /// användas av någon annan utrustning.
    pub fn save_equipment(&self, equipment: &mut Equipment) -> AppResult<i64> {
        let mut record = equipment.clone();
        record.normalize();
        record.validate()?;

        let id = self.db.transaction(|tx| -> AppResult<i64> {
            if let Some(type_id) = record.equipment_type_id {
                if EquipmentRepository::find_type_in(tx, type_id)?.is_none() {
                    return Err(AppError::not_found(format!("Utrustningstyp {}", type_id)));
                }
            }
            if let Some(user_id) = record.user_id {
                if !UserRepository::exists_in(tx, user_id)? {
                    return Err(AppError::not_found(format!("Användare {}", user_id)));
                }
            }
            if let Some(process_id) = record.process_id {
                if ProcessRepository::status_in(tx, process_id)?.is_none() {
                    return Err(AppError::not_found(format!("Process {}", process_id)));
                }
            }
            if let Some(serial) = record.serial.as_deref() {
                if EquipmentRepository::serial_taken_in(tx, serial, record.id)? {
                    return Err(EquipmentValidationError::DuplicateSerial(serial.to_string()).into());
                }
            }

            match record.id {
                Some(id) => {
                    if EquipmentRepository::find_by_id_in(tx, id)?.is_none() {
                        return Err(AppError::not_found(format!("Utrustning {}", id)));
                    }
                    EquipmentRepository::update_in(tx, &record)?;
                    Ok(id)
                }
                None => Ok(EquipmentRepository::insert_in(tx, &record)?),
            }
        })?;

        if record.id.is_none() {
            info!("Skapade utrustning {} ({})", id, record.nombre);
        } else {
            debug!("Sparade utrustning {}", id);
        }

        record.id = Some(id);
        *equipment = record;
        Ok(id)
    }

    pub fn find(&self, equipment_id: i64) -> AppResult<Equipment> {
        self.db
            .equipment()
            .find_by_id(equipment_id)?
            .ok_or_else(|| AppError::not_found(format!("Utrustning {}", equipment_id)))
    }

    pub fn equipment_for_process(&self, process_id: i64) -> AppResult<Vec<Equipment>> {
        Ok(self.db.equipment().find_by_process(process_id)?)
    }

    pub fn equipment_for_user(&self, user_id: i64) -> AppResult<Vec<Equipment>> {
        Ok(self.db.equipment().find_by_user(user_id)?)
    }

    pub fn delete_equipment(&self, equipment_id: i64) -> AppResult<()> {
        self.db.equipment().delete(equipment_id)?;
        info!("Tog bort utrustning {}", equipment_id);
        Ok(())
    }

    // === Typer ===

    pub fn list_types(&self) -> AppResult<Vec<EquipmentType>> {
        Ok(self.db.equipment().list_types()?)
    }

    /// Lägg till en typ i katalogen. Namnet måste vara unikt.
    pub fn create_type(&self, equipment_type: &mut EquipmentType) -> AppResult<i64> {
        equipment_type.name = equipment_type.name.trim().to_string();
        equipment_type.validate()?;

        let id = self.db.transaction(|tx| -> AppResult<i64> {
            if EquipmentRepository::find_type_by_name_in(tx, &equipment_type.name)?.is_some() {
                return Err(AppError::validation(format!(
                    "Utrustningstypen '{}' finns redan",
                    equipment_type.name
                )));
            }
            Ok(EquipmentRepository::create_type_in(tx, equipment_type)?)
        })?;

        info!("Ny utrustningstyp {}: {}", id, equipment_type.name);
        Ok(id)
    }

    // === Röntgenrör ===

    /// Registrera ett rörbyte
    pub fn record_tube_change(&self, tube: &mut XRayTube) -> AppResult<i64> {
        let id = self.db.transaction(|tx| -> AppResult<i64> {
            if EquipmentRepository::find_by_id_in(tx, tube.equipment_id)?.is_none() {
                return Err(AppError::not_found(format!("Utrustning {}", tube.equipment_id)));
            }
            Ok(EquipmentRepository::insert_tube_in(tx, tube)?)
        })?;

        debug!("Rörbyte {} på utrustning {}", id, tube.equipment_id);
        Ok(id)
    }

    /// Rörhistorik, senaste bytet först
    pub fn tube_history(&self, equipment_id: i64) -> AppResult<Vec<XRayTube>> {
        self.find(equipment_id)?;
        Ok(self.db.equipment().tube_history(equipment_id)?)
    }

    pub fn current_tube(&self, equipment_id: i64) -> AppResult<Option<XRayTube>> {
        self.find(equipment_id)?;
        Ok(self.db.equipment().current_tube(equipment_id)?)
    }

    // === Visning ===

    pub fn report_title(&self, equipment_id: i64) -> AppResult<&'static str> {
        let equipment = self.find(equipment_id)?;
        let process = self.linked_process(&equipment)?;
        Ok(report_title(process.as_ref()))
    }

    /// "<typ> (<serienummer>) - Owner: <användarnamn>"
    pub fn describe(&self, equipment_id: i64) -> AppResult<String> {
        let equipment = self.find(equipment_id)?;

        self.db
            .with_connection(|conn| {
                let type_name = match equipment.equipment_type_id {
                    Some(type_id) => EquipmentRepository::find_type_in(conn, type_id)?.map(|t| t.name),
                    None => None,
                };
                let owner = match equipment.user_id {
                    Some(user_id) => UserRepository::find_by_id_in(conn, user_id)?.map(|u| u.username),
                    None => None,
                };
                Ok(equipment.describe(type_name.as_deref(), owner.as_deref()))
            })
            .map_err(AppError::from)
    }

    fn linked_process(&self, equipment: &Equipment) -> AppResult<Option<Process>> {
        match equipment.process_id {
            Some(process_id) => Ok(self.db.processes().find_by_id(process_id)?),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EstadoEquipo, PracticeCategory, ProcessType, Role, User, REPORT_TITLE_CONTROL_CALIDAD,
        REPORT_TITLE_ESTUDIO_AMBIENTAL,
    };
    use crate::services::ProcessService;
    use chrono::NaiveDate;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let owner = db
            .users()
            .create(&mut User::new("equipuser").with_role(Role::Cliente))
            .unwrap();
        (db, owner)
    }

    #[test]
    fn test_save_and_update() {
        let (db, owner) = setup();
        let service = EquipmentService::new(&db);
        let rx = db.equipment().find_type_by_name("RX CONVENCIONAL").unwrap().unwrap();

        let mut equipment = Equipment::new("Equipo Alfa")
            .with_type(rx.id.unwrap())
            .with_serial(" SN-ALPHA-001 ")
            .owned_by(owner);
        equipment.fecha_adquisicion = NaiveDate::from_ymd_opt(2023, 1, 15);
        let id = service.save_equipment(&mut equipment).unwrap();

        assert_eq!(equipment.id, Some(id));
        assert_eq!(equipment.serial.as_deref(), Some("SN-ALPHA-001"));
        assert_eq!(service.equipment_for_user(owner).unwrap().len(), 1);

        equipment.nombre = "Equipo Actualizado".into();
        equipment.estado_actual = EstadoEquipo::DadoDeBaja;
        // oförändrat serienummer krockar inte med sig självt
        service.save_equipment(&mut equipment).unwrap();

        let found = service.find(id).unwrap();
        assert_eq!(found.nombre, "Equipo Actualizado");
        assert_eq!(found.estado_actual, EstadoEquipo::DadoDeBaja);
        assert_eq!(found.fecha_adquisicion, NaiveDate::from_ymd_opt(2023, 1, 15));
        assert_eq!(
            service.describe(id).unwrap(),
            "RX CONVENCIONAL (SN-ALPHA-001) - Owner: equipuser"
        );
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let (db, _) = setup();
        let service = EquipmentService::new(&db);

        service
            .save_equipment(&mut Equipment::new("Equipo Original").with_serial("UNIQUE123"))
            .unwrap();

        let mut duplicate = Equipment::new("Equipo Duplicado").with_serial("UNIQUE123");
        let err = service.save_equipment(&mut duplicate).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("(serial)"));
        assert!(duplicate.id.is_none());

        // blanka serienummer räknas som saknade
        service.save_equipment(&mut Equipment::new("Sin serial 1").with_serial("")).unwrap();
        service.save_equipment(&mut Equipment::new("Sin serial 2").with_serial("  ")).unwrap();
    }

    #[test]
    fn test_missing_references() {
        let (db, owner) = setup();
        let service = EquipmentService::new(&db);

        let err = service
            .save_equipment(&mut Equipment::new("Equipo").for_process(999))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service
            .save_equipment(&mut Equipment::new("Equipo").owned_by(owner).with_type(999))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(service.save_equipment(&mut Equipment::new(" ")).unwrap_err().is_validation());
    }

    #[test]
    fn test_report_title_follows_process() {
        let (db, owner) = setup();
        let service = EquipmentService::new(&db);
        let processes = ProcessService::new(&db);

        let mut advisory = Process::new(owner, ProcessType::Asesoria).with_category(PracticeCategory::Industrial);
        let advisory_id = processes.save_process(&mut advisory, None).unwrap();
        let mut quality = Process::new(owner, ProcessType::ControlCalidad);
        let quality_id = processes.save_process(&mut quality, None).unwrap();

        let industrial = service
            .save_equipment(&mut Equipment::new("Equipo Industrial").for_process(advisory_id))
            .unwrap();
        let rx = service
            .save_equipment(&mut Equipment::new("Equipo Rayos X").for_process(quality_id))
            .unwrap();
        let loose = service.save_equipment(&mut Equipment::new("Equipo Sin Proceso")).unwrap();

        assert_eq!(service.report_title(industrial).unwrap(), REPORT_TITLE_ESTUDIO_AMBIENTAL);
        assert_eq!(service.report_title(rx).unwrap(), REPORT_TITLE_CONTROL_CALIDAD);
        assert_eq!(service.report_title(loose).unwrap(), REPORT_TITLE_CONTROL_CALIDAD);
        assert_eq!(service.equipment_for_process(advisory_id).unwrap().len(), 1);
    }

    #[test]
    fn test_current_tube() {
        let (db, _) = setup();
        let service = EquipmentService::new(&db);
        let id = service.save_equipment(&mut Equipment::new("Test Equipment")).unwrap();
        assert!(service.current_tube(id).unwrap().is_none());

        let mut first = XRayTube::new(id, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_details("Marca 1", "Modelo 1", "Serial 1");
        service.record_tube_change(&mut first).unwrap();
        assert_eq!(service.current_tube(id).unwrap().unwrap().id, first.id);

        let mut newer = XRayTube::new(id, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .with_details("Marca 2", "Modelo 2", "Serial 2");
        service.record_tube_change(&mut newer).unwrap();

        // ett äldre byte registrerat i efterhand blir inte aktuellt
        let mut older = XRayTube::new(id, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
            .with_details("Marca 0", "Modelo 0", "Serial 0");
        service.record_tube_change(&mut older).unwrap();

        assert_eq!(service.current_tube(id).unwrap().unwrap().id, newer.id);
        assert_eq!(service.tube_history(id).unwrap().len(), 3);

        let mut orphan = XRayTube::new(999, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(matches!(
            service.record_tube_change(&mut orphan).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_create_type() {
        let (db, _) = setup();
        let service = EquipmentService::new(&db);
        let before = service.list_types().unwrap().len();

        let mut custom = EquipmentType::new(" TEST TYPE ");
        service.create_type(&mut custom).unwrap();
        assert_eq!(custom.name, "TEST TYPE");
        assert_eq!(service.list_types().unwrap().len(), before + 1);

        assert!(service
            .create_type(&mut EquipmentType::new("RX INDUSTRIAL"))
            .unwrap_err()
            .is_validation());
        assert!(service.create_type(&mut EquipmentType::new("")).unwrap_err().is_validation());
    }
}
