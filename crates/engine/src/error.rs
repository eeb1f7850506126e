use leadbook_core::{BuyerId, FieldErrors, UserId};
use leadbook_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    ValidationFailed(FieldErrors),

    #[error("buyer not found: {0}")]
    NotFound(BuyerId),

    #[error("user {user} does not own buyer {buyer_id}")]
    Forbidden { buyer_id: BuyerId, user: UserId },

    /// The caller's `updated_at` token is stale; refetch and retry.
    #[error("buyer {0} was modified since it was read")]
    Conflict(BuyerId),

    #[error("import has {rows} rows, at most {max} are accepted")]
    RowLimitExceeded { rows: usize, max: usize },

    #[error("no signed-in user")]
    Unauthenticated,

    #[error("cancelled before any write was issued")]
    Cancelled,

    #[error("invalid request: {0}")]
    InvalidRequest(FieldErrors),

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("export failed: {0}")]
    Export(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Stable, transport-independent classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ValidationFailed,
    NotFound,
    Forbidden,
    Conflict,
    RowLimitExceeded,
    StorageError,
    Unauthenticated,
    Cancelled,
    InvalidRequest,
    MalformedCsv,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "ValidationFailed",
            Self::NotFound => "NotFound",
            Self::Forbidden => "Forbidden",
            Self::Conflict => "Conflict",
            Self::RowLimitExceeded => "RowLimitExceeded",
            Self::StorageError => "StorageError",
            Self::Unauthenticated => "Unauthenticated",
            Self::Cancelled => "Cancelled",
            Self::InvalidRequest => "InvalidRequest",
            Self::MalformedCsv => "MalformedCsv",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationFailed => 400,
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::Conflict => 409,
            Self::RowLimitExceeded => 413,
            Self::StorageError => 500,
            Self::Unauthenticated => 401,
            Self::Cancelled => 499,
            Self::InvalidRequest => 400,
            Self::MalformedCsv => 400,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::RowLimitExceeded { .. } => ErrorKind::RowLimitExceeded,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Csv(_) => ErrorKind::MalformedCsv,
            Self::Export(_) | Self::Storage(_) => ErrorKind::StorageError,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::ValidationFailed(errors) | Self::InvalidRequest(errors) => Some(errors),
            _ => None,
        }
    }
}
