use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(String),

    #[error("broken history trail: {0}")]
    BrokenTrail(String),
}
