pub mod buyer;
pub mod clock;
pub mod diff;
pub mod error;
pub mod field_value;
pub mod history;
pub mod ids;
pub mod query;
pub mod validate;

pub use buyer::{
    Bhk, BuyerFields, BuyerRecord, City, FIELD_NAMES, PropertyType, Purpose, Source, Status,
    Timeline,
};
pub use clock::{MonotonicClock, Timestamp};
pub use diff::{FieldChange, FieldDiff, diff};
pub use error::CoreError;
pub use field_value::FieldValue;
pub use history::{HistoryDiff, HistoryEntry, replay};
pub use ids::*;
pub use query::{BuyerFilter, Column, PageRequest, Pagination, Predicate};
pub use validate::{FieldErrors, RawInput, validate};
