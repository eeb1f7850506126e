//! Buyer lead domain types.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::field_value::FieldValue;
use crate::ids::{BuyerId, UserId};

macro_rules! label_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($label => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// `'A' | 'B' | ...`, as listed in enum membership errors.
            pub fn expected() -> String {
                Self::ALL
                    .iter()
                    .map(|v| format!("'{}'", v.as_str()))
                    .collect::<Vec<_>>()
                    .join(" | ")
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum!(City {
    Chandigarh => "Chandigarh",
    Mohali => "Mohali",
    Zirakpur => "Zirakpur",
    Panchkula => "Panchkula",
    Other => "Other",
});

label_enum!(PropertyType {
    Apartment => "Apartment",
    Villa => "Villa",
    Plot => "Plot",
    Office => "Office",
    Retail => "Retail",
});

label_enum!(Bhk {
    One => "1",
    Two => "2",
    Three => "3",
    Four => "4",
    Studio => "Studio",
});

label_enum!(Purpose {
    Buy => "Buy",
    Rent => "Rent",
});

label_enum!(Timeline {
    ZeroToThreeMonths => "0-3m",
    ThreeToSixMonths => "3-6m",
    MoreThanSixMonths => ">6m",
    Exploring => "Exploring",
});

label_enum!(Source {
    Website => "Website",
    Referral => "Referral",
    WalkIn => "Walk-in",
    Call => "Call",
    Other => "Other",
});

label_enum!(Status {
    New => "New",
    Qualified => "Qualified",
    Contacted => "Contacted",
    Visited => "Visited",
    Negotiation => "Negotiation",
    Converted => "Converted",
    Dropped => "Dropped",
});

impl PropertyType {
    /// Apartments and villas are sized by bedroom count; other kinds are not.
    pub fn requires_bhk(&self) -> bool {
        matches!(self, PropertyType::Apartment | PropertyType::Villa)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::New
    }
}

pub const FULL_NAME: &str = "fullName";
pub const EMAIL: &str = "email";
pub const PHONE: &str = "phone";
pub const CITY: &str = "city";
pub const PROPERTY_TYPE: &str = "propertyType";
pub const BHK: &str = "bhk";
pub const PURPOSE: &str = "purpose";
pub const BUDGET_MIN: &str = "budgetMin";
pub const BUDGET_MAX: &str = "budgetMax";
pub const TIMELINE: &str = "timeline";
pub const SOURCE: &str = "source";
pub const NOTES: &str = "notes";
pub const TAGS: &str = "tags";
pub const STATUS: &str = "status";

/// Every user-editable field, in declaration order.
pub const FIELD_NAMES: [&str; 14] = [
    FULL_NAME,
    EMAIL,
    PHONE,
    CITY,
    PROPERTY_TYPE,
    BHK,
    PURPOSE,
    BUDGET_MIN,
    BUDGET_MAX,
    TIMELINE,
    SOURCE,
    NOTES,
    TAGS,
    STATUS,
];

/// A validated set of buyer fields: every invariant of the schema holds.
///
/// Only [`crate::validate::validate`] produces one from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerFields {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub city: City,
    pub property_type: PropertyType,
    pub bhk: Option<Bhk>,
    pub purpose: Purpose,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub timeline: Timeline,
    pub source: Source,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub status: Status,
}

impl BuyerFields {
    /// Current value of a named field, or `None` for an unknown name.
    pub fn field_value(&self, field: &str) -> Option<FieldValue> {
        let value = match field {
            FULL_NAME => FieldValue::text(&*self.full_name),
            EMAIL => FieldValue::from_option(self.email.clone()),
            PHONE => FieldValue::text(&*self.phone),
            CITY => FieldValue::text(self.city.as_str()),
            PROPERTY_TYPE => FieldValue::text(self.property_type.as_str()),
            BHK => FieldValue::from_option(self.bhk.map(|b| b.as_str())),
            PURPOSE => FieldValue::text(self.purpose.as_str()),
            BUDGET_MIN => FieldValue::from_option(self.budget_min),
            BUDGET_MAX => FieldValue::from_option(self.budget_max),
            TIMELINE => FieldValue::text(self.timeline.as_str()),
            SOURCE => FieldValue::text(self.source.as_str()),
            NOTES => FieldValue::from_option(self.notes.clone()),
            TAGS => FieldValue::text_list(self.tags.iter().cloned()),
            STATUS => FieldValue::text(self.status.as_str()),
            _ => return None,
        };
        Some(value)
    }

    /// All fields as `(name, value)` pairs in declaration order.
    pub fn field_values(&self) -> Vec<(&'static str, FieldValue)> {
        FIELD_NAMES
            .iter()
            .filter_map(|name| self.field_value(name).map(|v| (*name, v)))
            .collect()
    }

    /// Loosely typed copy, suitable for editing and re-validating.
    pub fn to_raw(&self) -> crate::validate::RawInput {
        let mut raw = crate::validate::RawInput::new();
        for (name, value) in self.field_values() {
            if !value.is_null() {
                raw.insert(name, value);
            }
        }
        raw
    }
}

/// A persisted buyer lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRecord {
    pub id: BuyerId,
    pub owner_id: UserId,
    pub updated_at: Timestamp,
    #[serde(flatten)]
    pub fields: BuyerFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_back() {
        for t in Timeline::ALL {
            assert_eq!(Timeline::parse(t.as_str()), Some(*t));
        }
        assert_eq!(Source::parse("Walk-in"), Some(Source::WalkIn));
        assert_eq!(Bhk::parse("Studio"), Some(Bhk::Studio));
        assert_eq!(City::parse("mohali"), None);
    }

    #[test]
    fn expected_lists_every_label() {
        assert_eq!(Purpose::expected(), "'Buy' | 'Rent'");
    }

    #[test]
    fn serde_uses_labels() {
        let json = serde_json::to_string(&Timeline::MoreThanSixMonths).unwrap();
        assert_eq!(json, "\">6m\"");
    }

    #[test]
    fn only_apartments_and_villas_need_bhk() {
        let needing: Vec<_> = PropertyType::ALL
            .iter()
            .filter(|p| p.requires_bhk())
            .collect();
        assert_eq!(needing, vec![&PropertyType::Apartment, &PropertyType::Villa]);
    }
}
