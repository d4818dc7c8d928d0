use thiserror::Error;

/// Centralized error types for the application
///
/// Failures crossing the storage boundary are converted to this enum for
/// consistent error handling. Uses `thiserror` for automatic error
/// conversion and display formatting.
///
/// # Example
///
/// ```no_run
/// use domofon::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
