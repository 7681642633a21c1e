use thiserror::Error;

use tracedeck_core::error::CoreError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Run not found: {id}")]
    NotFound { id: String },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored value could not be decoded: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl StoreError {
    /// True for the distinct "unknown identity" case; everything else is an
    /// internal failure that callers surface opaquely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
