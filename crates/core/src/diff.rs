//! Field-level before/after diffs between two buyer snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buyer::{BuyerFields, FIELD_NAMES};
use crate::field_value::FieldValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: FieldValue,
    pub to: FieldValue,
}

/// Changed fields keyed by field name. Empty when nothing changed.
pub type FieldDiff = BTreeMap<String, FieldChange>;

/// Compare every schema field of `after` against `before`.
///
/// Absent (`Null`) and empty text are different values. Tags are kept in
/// display order, so reordering them is a change.
pub fn diff(before: &BuyerFields, after: &BuyerFields) -> FieldDiff {
    let mut changes = FieldDiff::new();
    for name in FIELD_NAMES {
        let (Some(from), Some(to)) = (before.field_value(name), after.field_value(name)) else {
            continue;
        };
        if from != to {
            changes.insert(name.to_string(), FieldChange { from, to });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buyer::*;

    fn base() -> BuyerFields {
        BuyerFields {
            full_name: "John Smith".into(),
            email: None,
            phone: "9876543210".into(),
            city: City::Mohali,
            property_type: PropertyType::Plot,
            bhk: None,
            purpose: Purpose::Buy,
            budget_min: Some(1_000_000),
            budget_max: None,
            timeline: Timeline::Exploring,
            source: Source::Referral,
            notes: None,
            tags: vec!["hot".into(), "nri".into()],
            status: Status::New,
        }
    }

    #[test]
    fn identical_snapshots_have_empty_diff() {
        assert!(diff(&base(), &base()).is_empty());
    }

    #[test]
    fn changed_fields_carry_from_and_to() {
        let mut after = base();
        after.status = Status::Contacted;
        after.budget_max = Some(2_000_000);
        let changes = diff(&base(), &after);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[STATUS],
            FieldChange {
                from: FieldValue::text("New"),
                to: FieldValue::text("Contacted"),
            }
        );
        assert_eq!(changes[BUDGET_MAX].from, FieldValue::Null);
        assert_eq!(changes[BUDGET_MAX].to, FieldValue::Integer(2_000_000));
    }

    #[test]
    fn absent_and_empty_notes_differ() {
        let mut after = base();
        after.notes = Some(String::new());
        let changes = diff(&base(), &after);
        assert_eq!(changes[NOTES].from, FieldValue::Null);
        assert_eq!(changes[NOTES].to, FieldValue::text(""));
    }

    #[test]
    fn tag_reorder_is_recorded() {
        let mut after = base();
        after.tags.reverse();
        let changes = diff(&base(), &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[TAGS].from, FieldValue::text_list(["hot", "nri"]));
        assert_eq!(changes[TAGS].to, FieldValue::text_list(["nri", "hot"]));

        after.tags.push("urgent".into());
        let changes = diff(&base(), &after);
        assert_eq!(changes[TAGS].to, FieldValue::text_list(["nri", "hot", "urgent"]));
    }
}
