//! Filter and pagination parameters, and the predicate they compile to.

use serde::{Deserialize, Serialize};

use crate::buyer::{
    BuyerRecord, CITY, City, PROPERTY_TYPE, PropertyType, STATUS, Status, TIMELINE, Timeline,
};
use crate::validate::FieldErrors;

pub const SEARCH: &str = "search";
pub const PAGE: &str = "page";
pub const PAGE_SIZE: &str = "pageSize";

/// Columns a predicate may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    FullName,
    Email,
    Phone,
    City,
    PropertyType,
    Status,
    Timeline,
}

/// Store-independent row predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every row.
    All,
    Equals(Column, String),
    /// Substring match after [`fold_case`] on both sides.
    Contains(Column, String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Evaluate against a record in memory. Stores must agree with this.
    pub fn matches(&self, record: &BuyerRecord) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Equals(column, value) => {
                column_value(record, *column).is_some_and(|v| v == value.as_str())
            }
            Predicate::Contains(column, needle) => column_value(record, *column)
                .is_some_and(|v| fold_case(v).contains(&fold_case(needle))),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(record)),
        }
    }
}

/// Case folding shared by in-memory matching and store-side search.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

fn column_value(record: &BuyerRecord, column: Column) -> Option<&str> {
    let f = &record.fields;
    match column {
        Column::FullName => Some(&f.full_name),
        Column::Email => f.email.as_deref(),
        Column::Phone => Some(&f.phone),
        Column::City => Some(f.city.as_str()),
        Column::PropertyType => Some(f.property_type.as_str()),
        Column::Status => Some(f.status.as_str()),
        Column::Timeline => Some(f.timeline.as_str()),
    }
}

/// Optional equality filters plus free-text search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerFilter {
    pub city: Option<City>,
    pub property_type: Option<PropertyType>,
    pub status: Option<Status>,
    pub timeline: Option<Timeline>,
    pub search: Option<String>,
}

impl BuyerFilter {
    pub fn city(mut self, city: City) -> Self {
        self.city = Some(city);
        self
    }

    pub fn property_type(mut self, property_type: PropertyType) -> Self {
        self.property_type = Some(property_type);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Parse flat request parameters. Empty values are absent and unknown
    /// keys are ignored.
    pub fn from_params<'a, I>(params: I) -> Result<Self, FieldErrors>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::default();
        let mut errors = FieldErrors::new();
        for (key, value) in params {
            if value.is_empty() {
                continue;
            }
            match key {
                CITY => filter.city = parse_param(&mut errors, key, value, City::parse, City::expected),
                PROPERTY_TYPE => {
                    filter.property_type = parse_param(
                        &mut errors,
                        key,
                        value,
                        PropertyType::parse,
                        PropertyType::expected,
                    )
                }
                STATUS => {
                    filter.status =
                        parse_param(&mut errors, key, value, Status::parse, Status::expected)
                }
                TIMELINE => {
                    filter.timeline =
                        parse_param(&mut errors, key, value, Timeline::parse, Timeline::expected)
                }
                SEARCH => filter.search = Some(value.to_string()),
                _ => {}
            }
        }
        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(errors)
        }
    }

    /// AND of the provided equality filters, plus an OR of substring matches
    /// on name, email and phone when a non-blank search is given.
    pub fn to_predicate(&self) -> Predicate {
        let mut parts = Vec::new();
        if let Some(city) = self.city {
            parts.push(Predicate::Equals(Column::City, city.as_str().into()));
        }
        if let Some(property_type) = self.property_type {
            parts.push(Predicate::Equals(
                Column::PropertyType,
                property_type.as_str().into(),
            ));
        }
        if let Some(status) = self.status {
            parts.push(Predicate::Equals(Column::Status, status.as_str().into()));
        }
        if let Some(timeline) = self.timeline {
            parts.push(Predicate::Equals(Column::Timeline, timeline.as_str().into()));
        }
        if let Some(text) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            parts.push(Predicate::Or(vec![
                Predicate::Contains(Column::FullName, text.into()),
                Predicate::Contains(Column::Email, text.into()),
                Predicate::Contains(Column::Phone, text.into()),
            ]));
        }
        match parts.len() {
            0 => Predicate::All,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }
}

fn parse_param<T>(
    errors: &mut FieldErrors,
    key: &str,
    value: &str,
    parse: fn(&str) -> Option<T>,
    expected: fn() -> String,
) -> Option<T> {
    let parsed = parse(value);
    if parsed.is_none() {
        errors.add(
            key,
            format!("Invalid enum value. Expected {}, received '{value}'", expected()),
        );
    }
    parsed
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Zero-based row offset, `(page - 1) * page_size`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn from_params<'a, I>(params: I, default_page_size: u32) -> Result<Self, FieldErrors>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = Self::new(1, default_page_size);
        let mut errors = FieldErrors::new();
        for (key, value) in params {
            if value.is_empty() {
                continue;
            }
            let slot = match key {
                PAGE => &mut request.page,
                PAGE_SIZE => &mut request.page_size,
                _ => continue,
            };
            match value.parse::<u32>() {
                Ok(n) if n >= 1 => *slot = n,
                Ok(_) => errors.add(key, "Number must be greater than 0"),
                Err(_) => errors.add(key, format!("Expected positive integer, received '{value}'")),
            }
        }
        if errors.is_empty() {
            Ok(request)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let size = u64::from(request.page_size.max(1));
        Self {
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages: total.div_ceil(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buyer::*;
    use crate::clock::Timestamp;
    use crate::ids::{BuyerId, UserId};

    fn record(name: &str, email: Option<&str>, phone: &str, city: City) -> BuyerRecord {
        BuyerRecord {
            id: BuyerId::new(),
            owner_id: UserId::new(),
            updated_at: Timestamp::from_nanos(1),
            fields: BuyerFields {
                full_name: name.into(),
                email: email.map(Into::into),
                phone: phone.into(),
                city,
                property_type: PropertyType::Office,
                bhk: None,
                purpose: Purpose::Rent,
                budget_min: None,
                budget_max: None,
                timeline: Timeline::Exploring,
                source: Source::Other,
                notes: None,
                tags: vec![],
                status: Status::New,
            },
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(BuyerFilter::default().to_predicate(), Predicate::All);
        assert_eq!(BuyerFilter::default().search("   ").to_predicate(), Predicate::All);
    }

    #[test]
    fn search_is_case_insensitive_or_across_columns() {
        let predicate = BuyerFilter::default().search("smith").to_predicate();
        let by_name = record("John Smith", None, "9000000001", City::Mohali);
        let by_email = record("J. Doe", Some("ASmith@mail.com"), "9000000002", City::Mohali);
        let neither = record("Jane Roe", Some("jane@mail.com"), "9000000003", City::Mohali);
        assert!(predicate.matches(&by_name));
        assert!(predicate.matches(&by_email));
        assert!(!predicate.matches(&neither));
    }

    #[test]
    fn search_folds_accented_letters() {
        let predicate = BuyerFilter::default().search("élodie").to_predicate();
        assert!(predicate.matches(&record("ÉLODIE Martin", None, "9000000001", City::Mohali)));
        assert_eq!(fold_case("Élodie"), "élodie");
    }

    #[test]
    fn filters_are_anded() {
        let predicate = BuyerFilter::default()
            .city(City::Mohali)
            .search("0003")
            .to_predicate();
        assert!(matches!(predicate, Predicate::And(ref parts) if parts.len() == 2));
        assert!(predicate.matches(&record("A", None, "9000000003", City::Mohali)));
        assert!(!predicate.matches(&record("A", None, "9000000003", City::Zirakpur)));
        assert!(!predicate.matches(&record("A", None, "9000000004", City::Mohali)));
    }

    #[test]
    fn params_parse_and_ignore_blanks() {
        let filter = BuyerFilter::from_params([
            ("city", "Mohali"),
            ("status", ""),
            ("timeline", ">6m"),
            ("search", "kaur"),
            ("sort", "name"),
        ])
        .unwrap();
        assert_eq!(filter.city, Some(City::Mohali));
        assert_eq!(filter.status, None);
        assert_eq!(filter.timeline, Some(Timeline::MoreThanSixMonths));
        assert_eq!(filter.search.as_deref(), Some("kaur"));
    }

    #[test]
    fn params_report_bad_enums() {
        let errors = BuyerFilter::from_params([("city", "Delhi"), ("propertyType", "Hut")])
            .unwrap_err();
        assert!(errors.contains("city"));
        assert!(errors.contains("propertyType"));
    }

    #[test]
    fn page_offsets_and_totals() {
        let request = PageRequest::from_params([("page", "3"), ("pageSize", "25")], 10).unwrap();
        assert_eq!(request.offset(), 50);
        assert_eq!(Pagination::new(request, 51).total_pages, 3);
        assert_eq!(Pagination::new(request, 0).total_pages, 0);
        assert_eq!(PageRequest::from_params([], 10).unwrap(), PageRequest::new(1, 10));
        assert!(PageRequest::from_params([("page", "0")], 10).is_err());
        assert!(PageRequest::from_params([("pageSize", "ten")], 10).is_err());
    }
}
