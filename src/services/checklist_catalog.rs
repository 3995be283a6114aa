//! Uppslag av checklistdefinitioner per processtyp och kategori

use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::info;

use crate::db::{ChecklistRepository, Database};
use crate::models::{ChecklistItemDefinition, PracticeCategory, ProcessType};
use crate::utils::{AppError, AppResult};

pub struct ChecklistCatalog<'a> {
    db: &'a Database,
}

impl<'a> ChecklistCatalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Definitioner som gäller för en process av given typ, stigande ordning
    pub fn definitions_for(
        &self,
        process_type: ProcessType,
        category: Option<PracticeCategory>,
    ) -> AppResult<Vec<ChecklistItemDefinition>> {
        let defs = self
            .db
            .with_connection(|conn| Self::definitions_for_in(conn, process_type, category))?;
        Ok(defs)
    }

    pub fn list_definitions(&self) -> AppResult<Vec<ChecklistItemDefinition>> {
        Ok(self.db.checklists().list_definitions()?)
    }

    pub fn create_definition(&self, def: &mut ChecklistItemDefinition) -> AppResult<i64> {
        def.validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        if !def.process_type.uses_practice_category() {
            def.practice_category = None;
        }

        let id = self.db.checklists().create_definition(def)?;
        info!(
            "Skapade checklistdefinition '{}' för {} ({})",
            def.name,
            def.process_type,
            def.practice_category.map(|c| c.as_str()).unwrap_or("-")
        );
        Ok(id)
    }

    /// Summan av vikterna i en grupp. Ska vara 100 för en komplett grupp.
    pub fn group_total(
        &self,
        process_type: ProcessType,
        category: Option<PracticeCategory>,
    ) -> AppResult<Decimal> {
        let defs = self.definitions_for(process_type, category)?;
        Ok(defs.iter().map(|d| d.percentage).sum())
    }

    /// Regler: typen kan låna en annan typs definitioner, och kategorin
    /// filtrerar bara för typer som använder kategorier.
    pub(crate) fn definitions_for_in(
        conn: &Connection,
        process_type: ProcessType,
        category: Option<PracticeCategory>,
    ) -> anyhow::Result<Vec<ChecklistItemDefinition>> {
        let source = process_type.checklist_source();
        let defs = ChecklistRepository::definitions_by_type_in(conn, source)?;

        if !source.uses_practice_category() {
            return Ok(defs);
        }

        Ok(defs
            .into_iter()
            .filter(|d| d.practice_category == category)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_levels_alias_shielding() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ChecklistCatalog::new(&db);

        let shielding = catalog.definitions_for(ProcessType::CalculoBlindajes, None).unwrap();
        let reference = catalog.definitions_for(ProcessType::NivelesDeReferencia, None).unwrap();

        assert_eq!(shielding.len(), 4);
        let names = |defs: &[ChecklistItemDefinition]| defs.iter().map(|d| d.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&shielding), names(&reference));
    }

    #[test]
    fn test_category_filter_for_advisory() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ChecklistCatalog::new(&db);

        let cat1 = catalog
            .definitions_for(ProcessType::Asesoria, Some(PracticeCategory::MedicaCat1))
            .unwrap();
        let cat2 = catalog
            .definitions_for(ProcessType::Asesoria, Some(PracticeCategory::MedicaCat2))
            .unwrap();
        let vet = catalog
            .definitions_for(ProcessType::Asesoria, Some(PracticeCategory::Veterinaria))
            .unwrap();
        let none = catalog.definitions_for(ProcessType::Asesoria, None).unwrap();

        assert_eq!(cat1.len(), 16);
        assert_eq!(cat2.len(), 19);
        assert_eq!(vet.len(), 17);
        assert!(none.is_empty());
        assert!(cat1.windows(2).all(|w| w[0].order < w[1].order));
    }

    #[test]
    fn test_category_ignored_for_plain_types() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ChecklistCatalog::new(&db);

        let defs = catalog
            .definitions_for(ProcessType::ControlCalidad, Some(PracticeCategory::Veterinaria))
            .unwrap();
        assert_eq!(defs.len(), 4);
    }

    #[test]
    fn test_seeded_groups_total_hundred() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ChecklistCatalog::new(&db);

        let groups = [
            (ProcessType::CalculoBlindajes, None),
            (ProcessType::ControlCalidad, None),
            (ProcessType::NivelesDeReferencia, None),
            (ProcessType::Asesoria, Some(PracticeCategory::MedicaCat1)),
            (ProcessType::Asesoria, Some(PracticeCategory::MedicaCat2)),
            (ProcessType::Asesoria, Some(PracticeCategory::Veterinaria)),
        ];

        for (process_type, category) in groups {
            assert_eq!(
                catalog.group_total(process_type, category).unwrap(),
                Decimal::ONE_HUNDRED,
                "{} / {:?}",
                process_type,
                category
            );
        }
    }

    #[test]
    fn test_create_definition_validates() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ChecklistCatalog::new(&db);

        let mut bad = ChecklistItemDefinition::new(ProcessType::Otro, "", 1, Decimal::from(10));
        let err = catalog.create_definition(&mut bad).unwrap_err();
        assert!(err.is_validation());

        let mut ok = ChecklistItemDefinition::new(ProcessType::Otro, "Visita técnica", 1, Decimal::from(100))
            .with_category(PracticeCategory::Industrial);
        catalog.create_definition(&mut ok).unwrap();
        assert_eq!(ok.practice_category, None);
        assert_eq!(catalog.group_total(ProcessType::Otro, None).unwrap(), Decimal::ONE_HUNDRED);
    }
}
