/// Errors that can occur within the storage layer.
///
/// Store methods return `anyhow::Result`; the variants below are constructed
/// wherever the error class matters to callers. The REST layer classifies
/// `NotFound` and `NonUnique` by downcast, so those two must wrap any lookup
/// that can fail that way.
///
/// # Examples
///
/// ```rust
/// use oxiam_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "user",
///     id: "1973435098".to_string(),
/// };
/// assert!(err.to_string().contains("user"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// A lookup expected at most one row but matched several.
    #[error("Storage: non-unique {entity} result for {criteria}")]
    NonUnique {
        entity: &'static str,
        criteria: String,
    },

    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
