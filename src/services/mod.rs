//! Tjänster för Radtrack
//!
//! Affärslogik ovanpå repositories: checklistor, framsteg, statuslogg,
//! tilldelning, rapporter, utrustning och behörighet.

pub mod authorization;
pub mod checklist_catalog;
pub mod checklist_sync;
pub mod equipment_service;
pub mod process_service;
pub mod progress;
pub mod report_service;

pub use authorization::Authorizer;
pub use checklist_catalog::ChecklistCatalog;
pub use checklist_sync::{ChecklistSyncResult, ChecklistSyncService};
pub use equipment_service::EquipmentService;
pub use process_service::{ProcessOverview, ProcessService};
pub use progress::ProgressService;
pub use report_service::ReportService;
