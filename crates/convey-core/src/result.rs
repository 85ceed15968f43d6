//! Convenience result type alias for convey.

use crate::error::AppError;

/// A specialized `Result` type for convey operations.
pub type AppResult<T> = Result<T, AppError>;
