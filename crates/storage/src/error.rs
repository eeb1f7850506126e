use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("buyer not found: {0}")]
    NotFound(String),

    /// A conditional update found a different `updated_at` than expected.
    #[error("buyer {buyer_id} was modified concurrently")]
    Conflict { buyer_id: String },

    #[error("buyer collision: {buyer_id}")]
    BuyerCollision { buyer_id: String },

    #[error("core error: {0}")]
    Core(#[from] leadbook_core::CoreError),
}
