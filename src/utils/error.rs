use thiserror::Error;

use crate::models::{
    EquipmentValidationError, ProcessValidationError, ReportValidationError, UserValidationError,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Databasfel: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Ogiltig process ({field}): {0}", field = .0.field())]
    InvalidProcess(#[from] ProcessValidationError),

    #[error("Ogiltig rapport: {0}")]
    InvalidReport(#[from] ReportValidationError),

    #[error("Ogiltig utrustning ({field}): {0}", field = .0.field())]
    InvalidEquipment(#[from] EquipmentValidationError),

    #[error("Ogiltig användare: {0}")]
    InvalidUser(#[from] UserValidationError),

    #[error("Valideringsfel: {0}")]
    Validation(String),

    #[error("Hittades inte: {0}")]
    NotFound(String),

    #[error("Saknar behörighet: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Fel som ska visas som fältfel i formuläret
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidProcess(_)
                | Self::InvalidReport(_)
                | Self::InvalidEquipment(_)
                | Self::InvalidUser(_)
                | Self::Validation(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_names_field() {
        let err: AppError = ProcessValidationError::TooManyAssignees { max: 3, got: 4 }.into();
        assert!(err.is_validation());
        assert!(err.to_string().contains("(assigned_to)"));
    }

    #[test]
    fn test_internal_is_not_validation() {
        let err: AppError = anyhow::anyhow!("trasig").into();
        assert!(!err.is_validation());
        assert!(!AppError::not_found("Process 1").is_validation());
    }
}
