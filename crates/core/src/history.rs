//! Append-only audit entries and trail replay.

use serde::{Deserialize, Serialize};

use crate::buyer::*;
use crate::clock::Timestamp;
use crate::diff::FieldDiff;
use crate::error::CoreError;
use crate::field_value::FieldValue;
use crate::ids::{BuyerId, HistoryId, UserId};
use crate::validate::{ParsedField, parse_field};

/// What a history entry records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryDiff {
    /// The full initial field set of a new record.
    Created(BuyerFields),
    /// Per-field changes of one update; may be empty.
    Updated(FieldDiff),
}

impl HistoryDiff {
    pub fn is_created(&self) -> bool {
        matches!(self, HistoryDiff::Created(_))
    }

    pub fn changes(&self) -> Option<&FieldDiff> {
        match self {
            HistoryDiff::Updated(changes) => Some(changes),
            HistoryDiff::Created(_) => None,
        }
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, CoreError> {
        rmp_serde::to_vec_named(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, CoreError> {
        rmp_serde::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub buyer_id: BuyerId,
    pub changed_by: UserId,
    pub changed_at: Timestamp,
    pub diff: HistoryDiff,
}

impl HistoryEntry {
    pub fn created(buyer_id: BuyerId, changed_by: UserId, changed_at: Timestamp, fields: BuyerFields) -> Self {
        Self {
            id: HistoryId::new(),
            buyer_id,
            changed_by,
            changed_at,
            diff: HistoryDiff::Created(fields),
        }
    }

    pub fn updated(buyer_id: BuyerId, changed_by: UserId, changed_at: Timestamp, changes: FieldDiff) -> Self {
        Self {
            id: HistoryId::new(),
            buyer_id,
            changed_by,
            changed_at,
            diff: HistoryDiff::Updated(changes),
        }
    }
}

/// Fold an ascending trail into the field state it describes.
///
/// The first entry must be `Created`; later `Created` entries are rejected.
pub fn replay(entries: &[HistoryEntry]) -> Result<BuyerFields, CoreError> {
    let (first, rest) = entries
        .split_first()
        .ok_or_else(|| CoreError::BrokenTrail("empty trail".into()))?;
    let HistoryDiff::Created(initial) = &first.diff else {
        return Err(CoreError::BrokenTrail(format!(
            "trail for {} does not start with a created entry",
            first.buyer_id
        )));
    };

    let mut state = initial.clone();
    for entry in rest {
        if entry.buyer_id != first.buyer_id {
            return Err(CoreError::BrokenTrail(format!(
                "entry {} belongs to {}, not {}",
                entry.id, entry.buyer_id, first.buyer_id
            )));
        }
        let HistoryDiff::Updated(changes) = &entry.diff else {
            return Err(CoreError::BrokenTrail(format!(
                "second created entry {} for {}",
                entry.id, entry.buyer_id
            )));
        };
        for (field, change) in changes {
            apply_value(&mut state, field, &change.to)?;
        }
    }
    Ok(state)
}

fn apply_value(state: &mut BuyerFields, field: &str, value: &FieldValue) -> Result<(), CoreError> {
    let parsed = parse_field(field, Some(value))
        .map_err(|msg| CoreError::BrokenTrail(format!("{field}: {msg}")))?;
    match parsed {
        ParsedField::Text(s) if field == FULL_NAME => state.full_name = s,
        ParsedField::Text(s) if field == PHONE => state.phone = s,
        ParsedField::OptionalText(s) if field == EMAIL => state.email = s,
        ParsedField::OptionalText(s) if field == NOTES => state.notes = s,
        ParsedField::Integer(n) if field == BUDGET_MIN => state.budget_min = n,
        ParsedField::Integer(n) if field == BUDGET_MAX => state.budget_max = n,
        ParsedField::City(c) => state.city = c,
        ParsedField::PropertyType(p) => state.property_type = p,
        ParsedField::Bhk(b) => state.bhk = b,
        ParsedField::Purpose(p) => state.purpose = p,
        ParsedField::Timeline(t) => state.timeline = t,
        ParsedField::Source(s) => state.source = s,
        ParsedField::Status(s) => state.status = s,
        ParsedField::Tags(t) => state.tags = t,
        other => {
            return Err(CoreError::BrokenTrail(format!(
                "cannot apply {other:?} to {field}"
            )));
        }
    }
    Ok(())
}
