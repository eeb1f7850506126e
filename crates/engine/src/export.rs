use leadbook_core::{BuyerRecord, FIELD_NAMES, FieldValue};

use crate::error::EngineError;

/// Export column layout. Matches the import header so an export re-imports.
pub const EXPORT_COLUMNS: [&str; 14] = FIELD_NAMES;

/// Serialize `records` in the given order, header first.
pub fn write_csv(records: &[BuyerRecord]) -> Result<String, EngineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_COLUMNS)?;
    for record in records {
        let cells: Vec<String> = EXPORT_COLUMNS
            .iter()
            .map(|name| {
                record
                    .fields
                    .field_value(name)
                    .map(|v| cell(&v))
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&cells)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| EngineError::Export(e.to_string()))
}

fn cell(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::Text(s) => s.clone(),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::List(items) => items
            .iter()
            .filter_map(FieldValue::as_text)
            .collect::<Vec<_>>()
            .join(","),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Map(_) => String::new(),
    }
}
