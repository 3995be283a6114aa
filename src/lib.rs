//! Radtrack - processuppföljning för strålskyddsärenden
//!
//! Checklistor med viktade steg, framsteg, statushistorik, tilldelning
//! rapporter och utrustning ovanpå en lokal SQLite-databas.

pub mod models;
pub mod db;
pub mod services;
pub mod utils;

// Re-exports
pub use db::Database;
pub use models::*;
pub use utils::{AppError, AppResult};
