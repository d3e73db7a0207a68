/// Result type alias for warehouse operations.
pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Transient uniqueness/concurrency conflict during dimension resolution.
    /// Expected under concurrent writers; retried as a lookup, not surfaced.
    #[error("Load conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LoadError {
    /// Classify a sqlx error: unique violations become retryable conflicts.
    pub(crate) fn from_sqlx(e: sqlx::Error, context: &str) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return LoadError::Conflict(format!("{context}: {db}"));
            }
        }
        LoadError::Database(e)
    }
}
