use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("'{name}' is already present")]
    AlreadyExists { name: String },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to launch lock overlay: {0}")]
    OverlayLaunch(String),

    #[error("System service unavailable: {0}")]
    SystemService(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check if a rusqlite error is a UNIQUE constraint violation
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _)
        if err.code == rusqlite::ffi::ErrorCode::ConstraintViolation)
}
