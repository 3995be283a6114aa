//! Repository för utrustning, utrustningstyper och röntgenrörshistorik

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{Equipment, EquipmentType, EstadoEquipo, XRayTube};

const SELECT_EQUIPMENT: &str = "SELECT id, equipment_type_id, nombre, marca, modelo, serial,
        user_id, process_id, sede, estado_actual, fecha_adquisicion,
        fecha_vigencia_licencia, fecha_ultimo_control_calidad,
        fecha_vencimiento_control_calidad
 FROM equipment";

const SELECT_TUBE: &str = "SELECT id, equipment_id, marca, modelo, serial, fecha_cambio
 FROM xray_tube_history";

pub struct EquipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EquipmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    // === Typer ===

    /// Alla utrustningstyper i namnordning
    pub fn list_types(&self) -> Result<Vec<EquipmentType>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT id, name FROM equipment_types ORDER BY name")?;

        let types = stmt
            .query_map([], Self::row_to_type)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(types)
    }

    pub fn find_type_by_name(&self, name: &str) -> Result<Option<EquipmentType>> {
        let conn = lock(&self.conn)?;
        Self::find_type_by_name_in(&conn, name)
    }

    pub(crate) fn find_type_in(conn: &Connection, id: i64) -> Result<Option<EquipmentType>> {
        let found = conn
            .query_row(
                "SELECT id, name FROM equipment_types WHERE id = ?",
                [id],
                Self::row_to_type,
            )
            .optional()?;
        Ok(found)
    }

    pub(crate) fn find_type_by_name_in(conn: &Connection, name: &str) -> Result<Option<EquipmentType>> {
        let found = conn
            .query_row(
                "SELECT id, name FROM equipment_types WHERE name = ?",
                [name],
                Self::row_to_type,
            )
            .optional()?;
        Ok(found)
    }

    pub(crate) fn create_type_in(conn: &Connection, equipment_type: &mut EquipmentType) -> Result<i64> {
        conn.execute(
            "INSERT INTO equipment_types (name) VALUES (?)",
            [&equipment_type.name],
        )?;

        let id = conn.last_insert_rowid();
        equipment_type.id = Some(id);
        Ok(id)
    }

    // === Utrustning ===

    pub fn find_by_id(&self, id: i64) -> Result<Option<Equipment>> {
        let conn = lock(&self.conn)?;
        Self::find_by_id_in(&conn, id)
    }

    pub fn find_by_process(&self, process_id: i64) -> Result<Vec<Equipment>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE process_id = ? ORDER BY nombre, id",
            SELECT_EQUIPMENT
        ))?;

        let equipment = stmt
            .query_map([process_id], Self::row_to_equipment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(equipment)
    }

    pub fn find_by_user(&self, user_id: i64) -> Result<Vec<Equipment>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ? ORDER BY nombre, id",
            SELECT_EQUIPMENT
        ))?;

        let equipment = stmt
            .query_map([user_id], Self::row_to_equipment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(equipment)
    }

    /// Ta bort utrustning. Röntgenrörshistoriken följer med.
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM equipment WHERE id = ?", [id])?;

        if rows == 0 {
            return Err(anyhow!("Utrustning med ID {} hittades inte", id));
        }

        Ok(())
    }

    pub(crate) fn find_by_id_in(conn: &Connection, id: i64) -> Result<Option<Equipment>> {
        let equipment = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_EQUIPMENT),
                [id],
                Self::row_to_equipment,
            )
            .optional()?;
        Ok(equipment)
    }

    pub(crate) fn count_for_process_in(conn: &Connection, process_id: i64) -> Result<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM equipment WHERE process_id = ?",
            [process_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Används serienumret av någon annan utrustning än `exclude_id`?
    pub(crate) fn serial_taken_in(conn: &Connection, serial: &str, exclude_id: Option<i64>) -> Result<bool> {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM equipment WHERE serial = ?1 AND id IS NOT ?2)",
            params![serial, exclude_id],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    pub(crate) fn insert_in(conn: &Connection, equipment: &Equipment) -> Result<i64> {
        conn.execute(
            "INSERT INTO equipment
             (equipment_type_id, nombre, marca, modelo, serial, user_id, process_id, sede,
              estado_actual, fecha_adquisicion, fecha_vigencia_licencia,
              fecha_ultimo_control_calidad, fecha_vencimiento_control_calidad)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                equipment.equipment_type_id,
                equipment.nombre,
                equipment.marca,
                equipment.modelo,
                equipment.serial,
                equipment.user_id,
                equipment.process_id,
                equipment.sede,
                equipment.estado_actual.as_str(),
                equipment.fecha_adquisicion,
                equipment.fecha_vigencia_licencia,
                equipment.fecha_ultimo_control_calidad,
                equipment.fecha_vencimiento_control_calidad,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub(crate) fn update_in(conn: &Connection, equipment: &Equipment) -> Result<()> {
        let id = equipment.id.ok_or_else(|| anyhow!("Utrustning har inget ID"))?;

        let rows = conn.execute(
            "UPDATE equipment SET
                equipment_type_id = ?1, nombre = ?2, marca = ?3, modelo = ?4, serial = ?5,
                user_id = ?6, process_id = ?7, sede = ?8, estado_actual = ?9,
                fecha_adquisicion = ?10, fecha_vigencia_licencia = ?11,
                fecha_ultimo_control_calidad = ?12, fecha_vencimiento_control_calidad = ?13
             WHERE id = ?14",
            params![
                equipment.equipment_type_id,
                equipment.nombre,
                equipment.marca,
                equipment.modelo,
                equipment.serial,
                equipment.user_id,
                equipment.process_id,
                equipment.sede,
                equipment.estado_actual.as_str(),
                equipment.fecha_adquisicion,
                equipment.fecha_vigencia_licencia,
                equipment.fecha_ultimo_control_calidad,
                equipment.fecha_vencimiento_control_calidad,
                id,
            ],
        )?;

        if rows == 0 {
            return Err(anyhow!("Utrustning med ID {} hittades inte", id));
        }

        Ok(())
    }

    // === Röntgenrör ===

    /// Rörhistorik, senaste bytet först
    pub fn tube_history(&self, equipment_id: i64) -> Result<Vec<XRayTube>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE equipment_id = ? ORDER BY fecha_cambio DESC, id DESC",
            SELECT_TUBE
        ))?;

        let tubes = stmt
            .query_map([equipment_id], Self::row_to_tube)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tubes)
    }

    /// Röret med senast fecha_cambio
    pub fn current_tube(&self, equipment_id: i64) -> Result<Option<XRayTube>> {
        let conn = lock(&self.conn)?;
        let tube = conn
            .query_row(
                &format!(
                    "{} WHERE equipment_id = ? ORDER BY fecha_cambio DESC, id DESC LIMIT 1",
                    SELECT_TUBE
                ),
                [equipment_id],
                Self::row_to_tube,
            )
            .optional()?;
        Ok(tube)
    }

    pub(crate) fn insert_tube_in(conn: &Connection, tube: &mut XRayTube) -> Result<i64> {
        conn.execute(
            "INSERT INTO xray_tube_history (equipment_id, marca, modelo, serial, fecha_cambio)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tube.equipment_id,
                tube.marca,
                tube.modelo,
                tube.serial,
                tube.fecha_cambio,
            ],
        )?;

        let id = conn.last_insert_rowid();
        tube.id = Some(id);
        Ok(id)
    }

    fn row_to_type(row: &Row) -> rusqlite::Result<EquipmentType> {
        Ok(EquipmentType {
            id: Some(row.get(0)?),
            name: row.get(1)?,
        })
    }

    fn row_to_equipment(row: &Row) -> rusqlite::Result<Equipment> {
        let estado: String = row.get(9)?;

        Ok(Equipment {
            id: Some(row.get(0)?),
            equipment_type_id: row.get(1)?,
            nombre: row.get(2)?,
            marca: row.get(3)?,
            modelo: row.get(4)?,
            serial: row.get(5)?,
            user_id: row.get(6)?,
            process_id: row.get(7)?,
            sede: row.get(8)?,
            estado_actual: EstadoEquipo::from_db_str(&estado).unwrap_or_default(),
            fecha_adquisicion: row.get(10)?,
            fecha_vigencia_licencia: row.get(11)?,
            fecha_ultimo_control_calidad: row.get(12)?,
            fecha_vencimiento_control_calidad: row.get(13)?,
        })
    }

    fn row_to_tube(row: &Row) -> rusqlite::Result<XRayTube> {
        Ok(XRayTube {
            id: Some(row.get(0)?),
            equipment_id: row.get(1)?,
            marca: row.get(2)?,
            modelo: row.get(3)?,
            serial: row.get(4)?,
            fecha_cambio: row.get(5)?,
        })
    }
}
