//! CSV rows to raw buyer input.
//!
//! The header row names fields exactly as the record does (`fullName`,
//! `propertyType`, ...). Data row numbering starts at 2 so that row numbers
//! match what a spreadsheet shows. Blank lines are skipped without consuming
//! a row number.

use serde::Serialize;

use leadbook_core::{
    FieldErrors, FieldValue, RawInput,
    buyer::{BUDGET_MAX, BUDGET_MIN, TAGS},
};

/// First data row, after the header.
pub const FIRST_DATA_ROW: usize = 2;

/// A row that failed validation. Valid rows of the same import are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
    pub fields: FieldErrors,
}

impl RowError {
    pub fn new(row: usize, fields: FieldErrors) -> Self {
        Self {
            row,
            message: fields.to_string(),
            fields,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub inserted_count: usize,
    pub errors: Vec<RowError>,
}

/// Parse every non-blank data row into `(row number, raw input)`.
///
/// Rows may have fewer or more cells than the header; missing cells are
/// absent and cells past the header are dropped.
pub fn read_rows(csv_text: &str) -> Result<Vec<(usize, RawInput)>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    let mut row = FIRST_DATA_ROW;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut raw = RawInput::new();
        for (column, cell) in headers.iter().zip(record.iter()) {
            if let Some(value) = cell_value(column, cell) {
                raw.insert(column, value);
            }
        }
        rows.push((row, raw));
        row += 1;
    }
    Ok(rows)
}

fn cell_value(column: &str, cell: &str) -> Option<FieldValue> {
    if cell.is_empty() {
        return None;
    }
    let value = match column {
        TAGS => FieldValue::text_list(
            cell.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty()),
        ),
        BUDGET_MIN | BUDGET_MAX => match cell.trim().parse::<i64>() {
            Ok(n) => FieldValue::Integer(n),
            Err(_) => FieldValue::text(cell),
        },
        _ => FieldValue::text(cell),
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadbook_core::validate;

    const HEADER: &str = "fullName,email,phone,city,propertyType,bhk,purpose,budgetMin,budgetMax,timeline,source,notes,tags,status";

    #[test]
    fn rows_are_numbered_from_two() {
        let text = format!(
            "{HEADER}\nAsha Verma,,9876543210,Mohali,Plot,,Buy,,,Exploring,Call,,,\nRavi Kumar,,9876543211,Mohali,Plot,,Buy,,,Exploring,Call,,,\n"
        );
        let rows = read_rows(&text).unwrap();
        assert_eq!(rows.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn blank_lines_do_not_consume_numbers() {
        let text = format!(
            "{HEADER}\n\nAsha Verma,,9876543210,Mohali,Plot,,Buy,,,Exploring,Call,,,\n,,,,,,,,,,,,,\nRavi Kumar,,9876543211,Mohali,Plot,,Buy,,,Exploring,Call,,,\n"
        );
        let rows = read_rows(&text).unwrap();
        assert_eq!(rows.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn cells_become_typed_values() {
        let text = format!(
            "{HEADER}\nAsha Verma,asha@example.com,9876543210,Mohali,Apartment,2,Buy,3000000,4500000,0-3m,Website,\"call, evenings\",\"hot, nri\",Qualified\n"
        );
        let rows = read_rows(&text).unwrap();
        let (_, raw) = &rows[0];
        assert_eq!(raw.get(BUDGET_MIN), Some(&FieldValue::Integer(3_000_000)));
        assert_eq!(raw.get(TAGS), Some(&FieldValue::text_list(["hot", "nri"])));
        assert_eq!(raw.get("notes"), Some(&FieldValue::text("call, evenings")));

        let fields = validate(raw).unwrap();
        assert_eq!(fields.budget_max, Some(4_500_000));
        assert_eq!(fields.tags, vec!["hot", "nri"]);
    }

    #[test]
    fn unparseable_budget_stays_text_for_validation() {
        let text = format!("{HEADER}\nAsha Verma,,9876543210,Mohali,Plot,,Buy,lots,,Exploring,Call,,,\n");
        let rows = read_rows(&text).unwrap();
        let errors = validate(&rows[0].1).unwrap_err();
        assert_eq!(errors.get(BUDGET_MIN), ["Expected number, received string"]);
    }

    #[test]
    fn short_rows_and_extra_columns() {
        let text = "fullName,phone,city,favourite\nAsha Verma,9876543210\n";
        let rows = read_rows(text).unwrap();
        let (_, raw) = &rows[0];
        assert_eq!(raw.len(), 2);
        assert!(raw.get("city").is_none());
    }
}
