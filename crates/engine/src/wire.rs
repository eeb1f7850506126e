//! Response bodies for a transport layer to serialize.

use serde::Serialize;

use leadbook_core::{BuyerRecord, FieldErrors, HistoryEntry, Pagination};

use crate::error::{EngineError, ErrorKind};

/// A record and its most recent history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerView {
    pub record: BuyerRecord,
    pub recent_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerPage {
    pub records: Vec<BuyerRecord>,
    pub pagination: Pagination,
}

/// `{"kind": ..., "message": ..., "errors": {...}}`; `errors` only for
/// field-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        let kind = err.kind();
        // Storage faults are logged where they happen; callers get a generic message.
        let message = match kind {
            ErrorKind::StorageError => "internal storage failure".to_string(),
            _ => err.to_string(),
        };
        Self {
            kind: kind.as_str(),
            message,
            errors: err.field_errors().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadbook_core::BuyerId;
    use leadbook_storage::StorageError;

    #[test]
    fn validation_body_carries_field_errors() {
        let mut errors = FieldErrors::new();
        errors.add("phone", "Phone must be 10 to 15 digits");
        let body = ErrorBody::from(&EngineError::ValidationFailed(errors));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "ValidationFailed");
        assert_eq!(json["errors"]["phone"][0], "Phone must be 10 to 15 digits");
    }

    #[test]
    fn conflict_body_has_no_field_errors() {
        let body = ErrorBody::from(&EngineError::Conflict(BuyerId::new()));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["kind"], "Conflict");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn storage_details_are_not_exposed() {
        let err = EngineError::Storage(StorageError::Serialization("tags blob".into()));
        let body = ErrorBody::from(&err);
        assert_eq!(body.kind, "StorageError");
        assert!(!body.message.contains("tags blob"));
    }
}
