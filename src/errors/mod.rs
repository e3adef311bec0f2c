//! Error types shared by every service.
//!
//! Every core operation returns [`CoreResult`]. The error carries a
//! [`CoreErrorKind`] that callers branch on, a developer-facing message and
//! optional structured fields (`entity`, `id`, ...). Store failures are
//! folded in through `From<sea_orm::DbErr>`, see [`crate::common::db_errors`].
//!
//! ```rust
//! use release_tracker::errors::{CoreError, CoreErrorKind};
//!
//! let err = CoreError::not_found("Release", 42);
//! assert_eq!(err.kind(), CoreErrorKind::NotFound);
//! ```

pub mod core_error;

pub use core_error::{CoreError, CoreErrorKind};

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
