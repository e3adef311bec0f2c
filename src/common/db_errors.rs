//! Database error categorization
//!
//! Maps `sea_orm::DbErr` onto a small set of kinds so that store-enforced
//! constraints (unique indexes, foreign keys) surface to callers as
//! [`CoreErrorKind::ConstraintViolation`] instead of opaque internal errors.
//!
//! # Examples
//!
//! ```
//! use release_tracker::common::db_errors::DbErrorKind;
//! use sea_orm::DbErr;
//!
//! let err = DbErr::RecordNotFound("Release not found".to_string());
//! assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
//! ```

use sea_orm::{DbErr, SqlErr};

use crate::errors::{CoreError, CoreErrorKind};

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Record not found (query returned no results)
    NotFound,

    /// Unique constraint violation
    UniqueViolation,

    /// Foreign key constraint violation
    ForeignKeyViolation,

    /// Database connection error
    ConnectionError,

    /// Query timeout or a lock that could not be acquired in time
    Timeout,

    /// Unknown/other database error
    Unknown,
}

impl DbErrorKind {
    /// Categorize a sea_orm database error
    pub fn from_db_err(err: &DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::ForeignKeyViolation,
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(_) => Self::NotFound,
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::ConnectionError,
            _ => Self::from_message(&err.to_string()),
        }
    }

    /// Fallback used when the driver does not expose a structured error code.
    fn from_message(message: &str) -> Self {
        let msg_lower = message.to_lowercase();
        if msg_lower.contains("unique") || msg_lower.contains("duplicate") {
            Self::UniqueViolation
        } else if msg_lower.contains("foreign key") {
            Self::ForeignKeyViolation
        } else if msg_lower.contains("timeout") || msg_lower.contains("database is locked") {
            Self::Timeout
        } else {
            Self::Unknown
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation | Self::ForeignKeyViolation)
    }
}

/// Format database error with operation context
///
/// ```
/// use release_tracker::common::db_errors::{format_db_error, DbErrorKind};
/// use sea_orm::DbErr;
///
/// let err = DbErr::RecordNotFound("gone".to_string());
/// let (kind, message) = format_db_error("load release", &err);
/// assert_eq!(kind, DbErrorKind::NotFound);
/// assert!(message.starts_with("Failed to load release"));
/// ```
pub fn format_db_error(operation: &str, err: &DbErr) -> (DbErrorKind, String) {
    let kind = DbErrorKind::from_db_err(err);
    let detail = match kind {
        DbErrorKind::UniqueViolation => "record already exists",
        DbErrorKind::ForeignKeyViolation => "referenced record is missing or still in use",
        DbErrorKind::NotFound => "record not found",
        DbErrorKind::ConnectionError => "database connection failed",
        DbErrorKind::Timeout => "database timed out",
        DbErrorKind::Unknown => "database error",
    };
    (kind, format!("Failed to {}: {} ({})", operation, detail, err))
}

impl From<DbErr> for CoreError {
    fn from(err: DbErr) -> Self {
        let (kind, message) = format_db_error("access store", &err);
        let core_kind = match kind {
            DbErrorKind::UniqueViolation | DbErrorKind::ForeignKeyViolation => {
                CoreErrorKind::ConstraintViolation
            }
            DbErrorKind::NotFound => CoreErrorKind::NotFound,
            _ => CoreErrorKind::Internal,
        };
        CoreError::new(core_kind, message).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_fallback_detects_sqlite_unique_failure() {
        assert_eq!(
            DbErrorKind::from_message(
                "UNIQUE constraint failed: step_templates.release_id, step_templates.category"
            ),
            DbErrorKind::UniqueViolation
        );
        assert_eq!(
            DbErrorKind::from_message("FOREIGN KEY constraint failed"),
            DbErrorKind::ForeignKeyViolation
        );
        assert_eq!(
            DbErrorKind::from_message("database is locked"),
            DbErrorKind::Timeout
        );
        assert_eq!(DbErrorKind::from_message("syntax error"), DbErrorKind::Unknown);
    }

    #[test]
    fn test_record_not_found_maps_to_core_not_found() {
        let err: CoreError = DbErr::RecordNotFound("missing".to_string()).into();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }

    #[test]
    fn test_custom_error_maps_to_internal() {
        let err: CoreError = DbErr::Custom("boom".to_string()).into();
        assert_eq!(err.kind(), CoreErrorKind::Internal);
        assert!(err.message().contains("boom"));
    }

    #[test]
    fn test_constraint_kinds() {
        assert!(DbErrorKind::UniqueViolation.is_constraint_violation());
        assert!(DbErrorKind::ForeignKeyViolation.is_constraint_violation());
        assert!(!DbErrorKind::Timeout.is_constraint_violation());
    }
}
