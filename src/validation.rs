use crate::constants::*;
use crate::error::AppError;

/// Validate a package name before it enters the locked or excluded sets.
/// Returns the trimmed name if valid.
pub fn validate_package_name(package: &str) -> Result<&str, AppError> {
    let package = package.trim();
    if package.is_empty() {
        return Err(AppError::InvalidInput {
            field: "package",
            reason: "cannot be empty".into(),
        });
    }
    if package.len() > MAX_PACKAGE_NAME_LEN {
        return Err(AppError::InvalidInput {
            field: "package",
            reason: format!("cannot exceed {} characters", MAX_PACKAGE_NAME_LEN),
        });
    }
    if package.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidInput {
            field: "package",
            reason: "cannot contain whitespace".into(),
        });
    }
    Ok(package)
}

/// Validate the unlock duration setting (minutes; 0 means re-lock immediately).
pub fn validate_unlock_duration(minutes: i64) -> Result<(), AppError> {
    if minutes < 0 {
        return Err(AppError::InvalidInput {
            field: "unlock_duration",
            reason: "cannot be negative".into(),
        });
    }
    if minutes > MAX_UNLOCK_DURATION_MINUTES {
        return Err(AppError::InvalidInput {
            field: "unlock_duration",
            reason: format!("cannot exceed {} minutes", MAX_UNLOCK_DURATION_MINUTES),
        });
    }
    Ok(())
}
