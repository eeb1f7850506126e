//! Canned inputs for the integration suites.

use leadbook_core::{FieldValue, RawInput};

pub const CSV_HEADER: &str = "fullName,email,phone,city,propertyType,bhk,purpose,budgetMin,budgetMax,timeline,source,notes,tags,status";

/// A valid two-bedroom apartment lead in Mohali.
pub fn apartment_lead(name: &str, phone: &str) -> RawInput {
    RawInput::new()
        .with("fullName", name)
        .with("phone", phone)
        .with("city", "Mohali")
        .with("propertyType", "Apartment")
        .with("bhk", "2")
        .with("purpose", "Buy")
        .with("budgetMin", 4_000_000_i64)
        .with("budgetMax", 6_000_000_i64)
        .with("timeline", "0-3m")
        .with("source", "Website")
        .with("tags", FieldValue::text_list(["hot"]))
}

/// A valid plot lead in `city`.
pub fn plot_lead(name: &str, phone: &str, city: &str) -> RawInput {
    RawInput::new()
        .with("fullName", name)
        .with("phone", phone)
        .with("city", city)
        .with("propertyType", "Plot")
        .with("purpose", "Buy")
        .with("timeline", "Exploring")
        .with("source", "Referral")
}

/// A CSV data row for a valid plot lead.
pub fn csv_row(name: &str, phone: &str, city: &str) -> String {
    format!("{name},,{phone},{city},Plot,,Buy,,,Exploring,Referral,,,")
}

/// A CSV data row that fails validation (bad phone, missing bhk).
pub fn invalid_csv_row(name: &str) -> String {
    format!("{name},,12345,Mohali,Apartment,,Buy,,,0-3m,Website,,,")
}

pub fn csv_document<I>(rows: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut text = String::from(CSV_HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(&row);
        text.push('\n');
    }
    text
}

/// `count` distinct valid rows.
pub fn valid_csv_rows(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| csv_row(&format!("Import Buyer {i}"), &format!("98{i:08}"), "Zirakpur"))
        .collect()
}
