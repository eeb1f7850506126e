//! Schema validation for buyer input.
//!
//! [`validate`] is pure and collects every violation in one pass. Checks run
//! per field in the order type/format, enum membership, length bounds, phone
//! pattern; the cross-field rules (bhk requiredness, then budget ordering)
//! run last and only against fields that parsed cleanly.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::buyer::*;
use crate::field_value::FieldValue;

pub const FULL_NAME_MIN: usize = 2;
pub const FULL_NAME_MAX: usize = 80;
pub const NOTES_MAX: usize = 1000;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,15}$").expect("valid phone regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
        .expect("valid email regex")
});

/// Untyped field bag as received from a form, JSON body or CSV row.
///
/// Keys outside the buyer schema are carried but never inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: BTreeMap<String, FieldValue>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, FieldErrors> {
        match value {
            serde_json::Value::Object(map) => Ok(Self {
                fields: map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            }),
            other => {
                let received = FieldValue::from(other).type_name();
                Err(FieldErrors::single(
                    "",
                    format!("Expected object, received {received}"),
                ))
            }
        }
    }
}

/// Validation failures keyed by field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                if field.is_empty() {
                    write!(f, "{message}")?;
                } else {
                    write!(f, "{field}: {message}")?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Validate a raw record against the buyer schema.
pub fn validate(raw: &RawInput) -> Result<BuyerFields, FieldErrors> {
    let mut errors = FieldErrors::new();

    let full_name = check(&mut errors, FULL_NAME, parse_field(FULL_NAME, raw.get(FULL_NAME)));
    let email = check(&mut errors, EMAIL, parse_field(EMAIL, raw.get(EMAIL)));
    let phone = check(&mut errors, PHONE, parse_field(PHONE, raw.get(PHONE)));
    let city = check(&mut errors, CITY, parse_field(CITY, raw.get(CITY)));
    let property_type = check(
        &mut errors,
        PROPERTY_TYPE,
        parse_field(PROPERTY_TYPE, raw.get(PROPERTY_TYPE)),
    );
    let bhk = check(&mut errors, BHK, parse_field(BHK, raw.get(BHK)));
    let purpose = check(&mut errors, PURPOSE, parse_field(PURPOSE, raw.get(PURPOSE)));
    let budget_min = check(
        &mut errors,
        BUDGET_MIN,
        parse_field(BUDGET_MIN, raw.get(BUDGET_MIN)),
    );
    let budget_max = check(
        &mut errors,
        BUDGET_MAX,
        parse_field(BUDGET_MAX, raw.get(BUDGET_MAX)),
    );
    let timeline = check(&mut errors, TIMELINE, parse_field(TIMELINE, raw.get(TIMELINE)));
    let source = check(&mut errors, SOURCE, parse_field(SOURCE, raw.get(SOURCE)));
    let notes = check(&mut errors, NOTES, parse_field(NOTES, raw.get(NOTES)));
    let tags = check(&mut errors, TAGS, parse_field(TAGS, raw.get(TAGS)));
    let status = check(&mut errors, STATUS, parse_field(STATUS, raw.get(STATUS)));

    let property_type = property_type.and_then(ParsedField::into_property_type);
    let bhk = bhk.and_then(ParsedField::into_bhk);
    if let (Some(pt), Some(None)) = (property_type, bhk)
        && pt.requires_bhk()
    {
        errors.add(BHK, "BHK is required for Apartment or Villa");
    }

    let budget_min = budget_min.and_then(ParsedField::into_integer);
    let budget_max = budget_max.and_then(ParsedField::into_integer);
    if let (Some(Some(min)), Some(Some(max))) = (budget_min, budget_max)
        && max < min
    {
        errors.add(BUDGET_MAX, "budgetMax must be >= budgetMin");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // Every check above passed, so each slot holds a value.
    let property_type = property_type.ok_or_else(|| missing(PROPERTY_TYPE))?;
    let bhk = if property_type.requires_bhk() {
        bhk.flatten()
    } else {
        None
    };

    Ok(BuyerFields {
        full_name: full_name.and_then(ParsedField::into_text).ok_or_else(|| missing(FULL_NAME))?,
        email: email.and_then(ParsedField::into_optional_text).ok_or_else(|| missing(EMAIL))?,
        phone: phone.and_then(ParsedField::into_text).ok_or_else(|| missing(PHONE))?,
        city: city.and_then(ParsedField::into_city).ok_or_else(|| missing(CITY))?,
        property_type,
        bhk,
        purpose: purpose.and_then(ParsedField::into_purpose).ok_or_else(|| missing(PURPOSE))?,
        budget_min: budget_min.ok_or_else(|| missing(BUDGET_MIN))?,
        budget_max: budget_max.ok_or_else(|| missing(BUDGET_MAX))?,
        timeline: timeline.and_then(ParsedField::into_timeline).ok_or_else(|| missing(TIMELINE))?,
        source: source.and_then(ParsedField::into_source).ok_or_else(|| missing(SOURCE))?,
        notes: notes.and_then(ParsedField::into_optional_text).ok_or_else(|| missing(NOTES))?,
        tags: tags.and_then(ParsedField::into_tags).ok_or_else(|| missing(TAGS))?,
        status: status.and_then(ParsedField::into_status).ok_or_else(|| missing(STATUS))?,
    })
}

fn missing(field: &str) -> FieldErrors {
    FieldErrors::single(field, "Required")
}

fn check(errors: &mut FieldErrors, field: &str, result: Result<ParsedField, String>) -> Option<ParsedField> {
    match result {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

/// A single field after its own (non-cross-field) checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedField {
    Text(String),
    OptionalText(Option<String>),
    Integer(Option<i64>),
    City(City),
    PropertyType(PropertyType),
    Bhk(Option<Bhk>),
    Purpose(Purpose),
    Timeline(Timeline),
    Source(Source),
    Status(Status),
    Tags(Vec<String>),
}

impl ParsedField {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn into_optional_text(self) -> Option<Option<String>> {
        match self {
            Self::OptionalText(s) => Some(s),
            _ => None,
        }
    }

    fn into_integer(self) -> Option<Option<i64>> {
        match self {
            Self::Integer(n) => Some(n),
            _ => None,
        }
    }

    fn into_city(self) -> Option<City> {
        match self {
            Self::City(c) => Some(c),
            _ => None,
        }
    }

    fn into_property_type(self) -> Option<PropertyType> {
        match self {
            Self::PropertyType(p) => Some(p),
            _ => None,
        }
    }

    fn into_bhk(self) -> Option<Option<Bhk>> {
        match self {
            Self::Bhk(b) => Some(b),
            _ => None,
        }
    }

    fn into_purpose(self) -> Option<Purpose> {
        match self {
            Self::Purpose(p) => Some(p),
            _ => None,
        }
    }

    fn into_timeline(self) -> Option<Timeline> {
        match self {
            Self::Timeline(t) => Some(t),
            _ => None,
        }
    }

    fn into_source(self) -> Option<Source> {
        match self {
            Self::Source(s) => Some(s),
            _ => None,
        }
    }

    fn into_status(self) -> Option<Status> {
        match self {
            Self::Status(s) => Some(s),
            _ => None,
        }
    }

    fn into_tags(self) -> Option<Vec<String>> {
        match self {
            Self::Tags(t) => Some(t),
            _ => None,
        }
    }
}

/// Run the single-field checks for `field`. `value` is `None` when the key
/// is absent. Unknown field names are an error.
pub fn parse_field(field: &str, value: Option<&FieldValue>) -> Result<ParsedField, String> {
    // An explicit null on an optional field reads as absent.
    let value = value.filter(|v| !v.is_null());
    match field {
        FULL_NAME => {
            let s = required_text(value)?;
            check_length(s, FULL_NAME_MIN, FULL_NAME_MAX)?;
            Ok(ParsedField::Text(s.to_string()))
        }
        EMAIL => match value {
            None => Ok(ParsedField::OptionalText(None)),
            Some(v) => {
                let s = expect_text(v)?;
                if !is_email(s) {
                    return Err("Invalid email".to_string());
                }
                Ok(ParsedField::OptionalText(Some(s.to_string())))
            }
        },
        PHONE => {
            let s = required_text(value)?;
            if !PHONE_RE.is_match(s) {
                return Err("Phone must be 10 to 15 digits".to_string());
            }
            Ok(ParsedField::Text(s.to_string()))
        }
        CITY => required_label(value, City::parse, City::expected).map(ParsedField::City),
        PROPERTY_TYPE => required_label(value, PropertyType::parse, PropertyType::expected)
            .map(ParsedField::PropertyType),
        BHK => match value {
            None => Ok(ParsedField::Bhk(None)),
            Some(v) => label(v, Bhk::parse, Bhk::expected).map(|b| ParsedField::Bhk(Some(b))),
        },
        PURPOSE => required_label(value, Purpose::parse, Purpose::expected).map(ParsedField::Purpose),
        BUDGET_MIN | BUDGET_MAX => match value {
            None => Ok(ParsedField::Integer(None)),
            Some(v) => positive_integer(v).map(|n| ParsedField::Integer(Some(n))),
        },
        TIMELINE => {
            required_label(value, Timeline::parse, Timeline::expected).map(ParsedField::Timeline)
        }
        SOURCE => required_label(value, Source::parse, Source::expected).map(ParsedField::Source),
        NOTES => match value {
            None => Ok(ParsedField::OptionalText(None)),
            Some(v) => {
                let s = expect_text(v)?;
                check_length(s, 0, NOTES_MAX)?;
                Ok(ParsedField::OptionalText(Some(s.to_string())))
            }
        },
        TAGS => match value {
            None => Ok(ParsedField::Tags(Vec::new())),
            Some(v) => tags(v).map(ParsedField::Tags),
        },
        STATUS => match value {
            None => Ok(ParsedField::Status(Status::default())),
            Some(v) => label(v, Status::parse, Status::expected).map(ParsedField::Status),
        },
        other => Err(format!("Unknown field '{other}'")),
    }
}

fn required_text(value: Option<&FieldValue>) -> Result<&str, String> {
    match value {
        None => Err("Required".to_string()),
        Some(v) => expect_text(v),
    }
}

fn expect_text(value: &FieldValue) -> Result<&str, String> {
    value
        .as_text()
        .ok_or_else(|| format!("Expected string, received {}", value.type_name()))
}

fn check_length(s: &str, min: usize, max: usize) -> Result<(), String> {
    let len = s.chars().count();
    if len < min {
        return Err(format!("String must contain at least {min} character(s)"));
    }
    if len > max {
        return Err(format!("String must contain at most {max} character(s)"));
    }
    Ok(())
}

fn required_label<T>(
    value: Option<&FieldValue>,
    parse: fn(&str) -> Option<T>,
    expected: fn() -> String,
) -> Result<T, String> {
    match value {
        None => Err("Required".to_string()),
        Some(v) => label(v, parse, expected),
    }
}

fn label<T>(
    value: &FieldValue,
    parse: fn(&str) -> Option<T>,
    expected: fn() -> String,
) -> Result<T, String> {
    let s = expect_text(value)?;
    parse(s).ok_or_else(|| {
        format!(
            "Invalid enum value. Expected {}, received '{s}'",
            expected()
        )
    })
}

fn positive_integer(value: &FieldValue) -> Result<i64, String> {
    let n = match value {
        FieldValue::Integer(n) => *n,
        FieldValue::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            *f as i64
        }
        FieldValue::Float(_) => return Err("Expected integer, received float".to_string()),
        other => return Err(format!("Expected number, received {}", other.type_name())),
    };
    if n <= 0 {
        return Err("Number must be greater than 0".to_string());
    }
    Ok(n)
}

fn tags(value: &FieldValue) -> Result<Vec<String>, String> {
    let items = value
        .as_list()
        .ok_or_else(|| format!("Expected array, received {}", value.type_name()))?;
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let s = item
            .as_text()
            .ok_or_else(|| format!("Expected string at index {idx}, received {}", item.type_name()))?;
        if !out.iter().any(|t| t == s) {
            out.push(s.to_string());
        }
    }
    Ok(out)
}

fn is_email(s: &str) -> bool {
    !s.starts_with('.') && !s.contains("..") && EMAIL_RE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apartment() -> RawInput {
        RawInput::new()
            .with(FULL_NAME, "Asha Verma")
            .with(EMAIL, "asha@example.com")
            .with(PHONE, "9876543210")
            .with(CITY, "Mohali")
            .with(PROPERTY_TYPE, "Apartment")
            .with(BHK, "2")
            .with(PURPOSE, "Buy")
            .with(TIMELINE, "0-3m")
            .with(SOURCE, "Website")
    }

    #[test]
    fn minimal_apartment_gets_defaults() {
        let fields = validate(&apartment()).unwrap();
        assert_eq!(fields.status, Status::New);
        assert!(fields.tags.is_empty());
        assert_eq!(fields.bhk, Some(Bhk::Two));
        assert_eq!(fields.budget_min, None);
    }

    #[test]
    fn every_bad_field_reported_in_one_pass() {
        let raw = RawInput::new()
            .with(FULL_NAME, "A")
            .with(EMAIL, "not-an-email")
            .with(PHONE, "12345")
            .with(CITY, "Delhi")
            .with(PROPERTY_TYPE, "Villa")
            .with(PURPOSE, "Lease")
            .with(BUDGET_MIN, 900_i64)
            .with(BUDGET_MAX, 100_i64)
            .with(TIMELINE, "soon")
            .with(SOURCE, 7_i64);
        let errors = validate(&raw).unwrap_err();
        for field in [
            FULL_NAME, EMAIL, PHONE, CITY, BHK, PURPOSE, BUDGET_MAX, TIMELINE, SOURCE,
        ] {
            assert!(errors.contains(field), "missing error for {field}: {errors}");
        }
        assert_eq!(errors.get(SOURCE), ["Expected string, received number"]);
        assert_eq!(errors.get(BHK), ["BHK is required for Apartment or Villa"]);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let raw = apartment().with("favouriteColour", "teal").with("updatedAt", "x");
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn bhk_ignored_for_plot() {
        let raw = apartment().with(PROPERTY_TYPE, "Plot");
        let fields = validate(&raw).unwrap();
        assert_eq!(fields.bhk, None);
    }

    #[test]
    fn bhk_enum_still_checked_for_plot() {
        let raw = apartment().with(PROPERTY_TYPE, "Plot").with(BHK, "7");
        let errors = validate(&raw).unwrap_err();
        assert!(errors.contains(BHK));
    }

    #[test]
    fn bad_property_type_skips_bhk_rule() {
        let mut raw = apartment().with(PROPERTY_TYPE, "Castle");
        raw.remove(BHK);
        let errors = validate(&raw).unwrap_err();
        assert!(errors.contains(PROPERTY_TYPE));
        assert!(!errors.contains(BHK));
    }

    #[test]
    fn equal_budgets_are_valid() {
        let raw = apartment()
            .with(BUDGET_MIN, 5_000_000_i64)
            .with(BUDGET_MAX, 5_000_000_i64);
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn budget_must_be_positive_integer() {
        let errors = validate(&apartment().with(BUDGET_MIN, 0_i64)).unwrap_err();
        assert_eq!(errors.get(BUDGET_MIN), ["Number must be greater than 0"]);

        let raw = apartment().with(BUDGET_MIN, FieldValue::Float(10.5));
        let errors = validate(&raw).unwrap_err();
        assert_eq!(errors.get(BUDGET_MIN), ["Expected integer, received float"]);

        let raw = apartment().with(BUDGET_MIN, FieldValue::Float(10.0));
        assert_eq!(validate(&raw).unwrap().budget_min, Some(10));
    }

    #[test]
    fn phone_rejects_non_ascii_digits() {
        let raw = apartment().with(PHONE, "٩٨٧٦٥٤٣٢١٠");
        assert!(validate(&raw).unwrap_err().contains(PHONE));
    }

    #[test]
    fn phone_length_bounds() {
        assert!(validate(&apartment().with(PHONE, "123456789012345")).is_ok());
        assert!(validate(&apartment().with(PHONE, "1234567890123456")).is_err());
        assert!(validate(&apartment().with(PHONE, "123456789")).is_err());
    }

    #[test]
    fn full_name_bounds_count_characters() {
        let eighty = "é".repeat(80);
        assert!(validate(&apartment().with(FULL_NAME, eighty.as_str())).is_ok());
        let eighty_one = "é".repeat(81);
        assert!(validate(&apartment().with(FULL_NAME, eighty_one.as_str())).is_err());
    }

    #[test]
    fn notes_cap() {
        let long = "n".repeat(NOTES_MAX + 1);
        let errors = validate(&apartment().with(NOTES, long.as_str())).unwrap_err();
        assert_eq!(errors.get(NOTES), ["String must contain at most 1000 character(s)"]);
        assert!(validate(&apartment().with(NOTES, "")).is_ok());
    }

    #[test]
    fn null_optional_reads_as_absent() {
        let raw = apartment().with(EMAIL, FieldValue::Null);
        assert_eq!(validate(&raw).unwrap().email, None);
    }

    #[test]
    fn empty_email_is_invalid() {
        let errors = validate(&apartment().with(EMAIL, "")).unwrap_err();
        assert_eq!(errors.get(EMAIL), ["Invalid email"]);
    }

    #[test]
    fn email_shapes() {
        for ok in ["a@b.co", "first.last+tag@mail.example.org", "o'neil@x.in"] {
            assert!(is_email(ok), "{ok}");
        }
        for bad in [".a@b.co", "a..b@c.com", "a@b", "a b@c.com", "@c.com"] {
            assert!(!is_email(bad), "{bad}");
        }
    }

    #[test]
    fn tags_deduplicate_in_order() {
        let raw = apartment().with(TAGS, FieldValue::text_list(["hot", "nri", "hot"]));
        assert_eq!(validate(&raw).unwrap().tags, vec!["hot", "nri"]);

        let raw = apartment().with(TAGS, "hot,nri");
        assert_eq!(validate(&raw).unwrap_err().get(TAGS), ["Expected array, received string"]);
    }

    #[test]
    fn from_json_rejects_non_objects() {
        let errors = RawInput::from_json(serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(errors.get(""), ["Expected object, received array"]);
    }

    #[test]
    fn from_json_object_validates() {
        let raw = RawInput::from_json(serde_json::json!({
            "fullName": "Ravi Kumar",
            "phone": "9999999999",
            "city": "Chandigarh",
            "propertyType": "Office",
            "purpose": "Rent",
            "budgetMin": 20000,
            "budgetMax": 40000,
            "timeline": "Exploring",
            "source": "Walk-in",
            "tags": ["corner"],
            "status": "Qualified"
        }))
        .unwrap();
        let fields = validate(&raw).unwrap();
        assert_eq!(fields.source, Source::WalkIn);
        assert_eq!(fields.budget_max, Some(40000));
        assert_eq!(fields.status, Status::Qualified);
    }

    #[test]
    fn to_raw_revalidates_to_same_fields() {
        let fields = validate(&apartment().with(NOTES, "call after 6pm")).unwrap();
        assert_eq!(validate(&fields.to_raw()).unwrap(), fields);
    }

    #[test]
    fn display_joins_messages() {
        let mut errors = FieldErrors::new();
        errors.add(PHONE, "bad");
        errors.add(CITY, "worse");
        assert_eq!(errors.to_string(), "city: worse; phone: bad");
    }
}
