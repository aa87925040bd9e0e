use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadsiftError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Missing or malformed tenant identity")]
    Unauthenticated,
    #[error("Contacts have active workflow states: {}", contact_ids.join(", "))]
    DependencyConflict { contact_ids: Vec<String> },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, LeadsiftError>;

impl LeadsiftError {
    /// Stable machine-readable code, used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::DependencyConflict { .. } => "DEPENDENCY_CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            Self::Store(_) => "STORE_ERROR",
            Self::Lock(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures the caller caused and may see verbatim.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Unauthenticated
                | Self::DependencyConflict { .. }
                | Self::NotFound(_)
                | Self::ConstraintViolation(_)
        )
    }
}

// Helper conversions
impl From<rusqlite::Error> for LeadsiftError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Self::ConstraintViolation(
                    "the operation would orphan dependent records".to_string(),
                )
            }
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound("no matching record".to_string()),
            _ => Self::Store(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for LeadsiftError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for LeadsiftError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Lock(e.to_string())
    }
}
