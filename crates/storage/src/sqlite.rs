use std::path::Path;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{Connection, TransactionBehavior};

use leadbook_core::{
    buyer::*,
    clock::Timestamp,
    history::{HistoryDiff, HistoryEntry},
    ids::*,
    query::{Column, Predicate, fold_case},
};

use crate::error::StorageError;
use crate::traits::{BatchOp, BuyerOrder, HistoryLog, RecordStore, Storage, Window, WriteBatch};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn label<T>(value: &str, parse: fn(&str) -> Option<T>, column: &str) -> Result<T, StorageError> {
    parse(value)
        .ok_or_else(|| StorageError::Serialization(format!("unknown {column} label: {value}")))
}

fn encode_tags(tags: &[String]) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec(tags).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode_tags(bytes: &[u8]) -> Result<Vec<String>, StorageError> {
    rmp_serde::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::prepare(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, StorageError> {
        crate::schema::init_schema(&conn)?;
        register_functions(&conn)?;
        Ok(Self { conn })
    }
}

const FOLD_FN: &str = "leadbook_fold";

/// Expose [`fold_case`] to SQL so search folds exactly like `Predicate::matches`.
fn register_functions(conn: &Connection) -> Result<(), StorageError> {
    conn.create_scalar_function(
        FOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| fold_case(&text))),
    )?;
    Ok(())
}

const BUYER_COLUMNS: &str = "id, owner_id, updated_at, full_name, email, phone, city, \
    property_type, bhk, purpose, budget_min, budget_max, timeline, source, notes, tags, status";

/// Column values as SQLite returns them, before label parsing.
struct BuyerRow {
    id: Vec<u8>,
    owner_id: Vec<u8>,
    updated_at: i64,
    full_name: String,
    email: Option<String>,
    phone: String,
    city: String,
    property_type: String,
    bhk: Option<String>,
    purpose: String,
    budget_min: Option<i64>,
    budget_max: Option<i64>,
    timeline: String,
    source: String,
    notes: Option<String>,
    tags: Vec<u8>,
    status: String,
}

impl BuyerRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            updated_at: row.get(2)?,
            full_name: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            city: row.get(6)?,
            property_type: row.get(7)?,
            bhk: row.get(8)?,
            purpose: row.get(9)?,
            budget_min: row.get(10)?,
            budget_max: row.get(11)?,
            timeline: row.get(12)?,
            source: row.get(13)?,
            notes: row.get(14)?,
            tags: row.get(15)?,
            status: row.get(16)?,
        })
    }

    fn into_record(self) -> Result<BuyerRecord, StorageError> {
        let bhk = match self.bhk.as_deref() {
            Some(b) => Some(label(b, Bhk::parse, BHK)?),
            None => None,
        };
        Ok(BuyerRecord {
            id: BuyerId::from_bytes(to_array::<16>(self.id, "id")?),
            owner_id: UserId::from_bytes(to_array::<16>(self.owner_id, "owner_id")?),
            updated_at: Timestamp::from_nanos(self.updated_at),
            fields: BuyerFields {
                full_name: self.full_name,
                email: self.email,
                phone: self.phone,
                city: label(&self.city, City::parse, CITY)?,
                property_type: label(&self.property_type, PropertyType::parse, PROPERTY_TYPE)?,
                bhk,
                purpose: label(&self.purpose, Purpose::parse, PURPOSE)?,
                budget_min: self.budget_min,
                budget_max: self.budget_max,
                timeline: label(&self.timeline, Timeline::parse, TIMELINE)?,
                source: label(&self.source, Source::parse, SOURCE)?,
                notes: self.notes,
                tags: decode_tags(&self.tags)?,
                status: label(&self.status, Status::parse, STATUS)?,
            },
        })
    }
}

type HistoryRow = (Vec<u8>, Vec<u8>, Vec<u8>, i64, Vec<u8>);

fn read_history_row(row: &rusqlite::Row) -> rusqlite::Result<HistoryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn history_from_row(
    (id, buyer_id, changed_by, changed_at, diff): HistoryRow,
) -> Result<HistoryEntry, StorageError> {
    Ok(HistoryEntry {
        id: HistoryId::from_bytes(to_array::<16>(id, "history id")?),
        buyer_id: BuyerId::from_bytes(to_array::<16>(buyer_id, "buyer_id")?),
        changed_by: UserId::from_bytes(to_array::<16>(changed_by, "changed_by")?),
        changed_at: Timestamp::from_nanos(changed_at),
        diff: HistoryDiff::from_msgpack(&diff)?,
    })
}

fn column_sql(column: Column) -> &'static str {
    match column {
        Column::FullName => "full_name",
        Column::Email => "email",
        Column::Phone => "phone",
        Column::City => "city",
        Column::PropertyType => "property_type",
        Column::Status => "status",
        Column::Timeline => "timeline",
    }
}

/// Render `predicate` as a WHERE clause with positional parameters.
fn compile_predicate(predicate: &Predicate, params: &mut Vec<Value>) -> String {
    match predicate {
        Predicate::All => "1".to_string(),
        Predicate::Equals(column, value) => {
            params.push(Value::Text(value.clone()));
            format!("{} = ?", column_sql(*column))
        }
        Predicate::Contains(column, needle) => {
            params.push(Value::Text(fold_case(needle)));
            format!("instr({FOLD_FN}({}), ?) > 0", column_sql(*column))
        }
        Predicate::And(parts) if parts.is_empty() => "1".to_string(),
        Predicate::Or(parts) if parts.is_empty() => "0".to_string(),
        Predicate::And(parts) => join_predicates(parts, " AND ", params),
        Predicate::Or(parts) => join_predicates(parts, " OR ", params),
    }
}

fn join_predicates(parts: &[Predicate], sep: &str, params: &mut Vec<Value>) -> String {
    let clauses: Vec<String> = parts
        .iter()
        .map(|p| format!("({})", compile_predicate(p, params)))
        .collect();
    clauses.join(sep)
}

fn apply_op(tx: &rusqlite::Transaction, op: &BatchOp) -> Result<(), StorageError> {
    match op {
        BatchOp::Create(record) => {
            let f = &record.fields;
            let result = tx.execute(
                &format!(
                    "INSERT INTO buyers ({BUYER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ),
                rusqlite::params![
                    record.id.as_bytes().as_slice(),
                    record.owner_id.as_bytes().as_slice(),
                    record.updated_at.as_nanos()?,
                    f.full_name,
                    f.email,
                    f.phone,
                    f.city.as_str(),
                    f.property_type.as_str(),
                    f.bhk.map(|b| b.as_str()),
                    f.purpose.as_str(),
                    f.budget_min,
                    f.budget_max,
                    f.timeline.as_str(),
                    f.source.as_str(),
                    f.notes,
                    encode_tags(&f.tags)?,
                    f.status.as_str(),
                ],
            );
            match result {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Err(StorageError::BuyerCollision {
                        buyer_id: record.id.to_string(),
                    });
                }
                Err(e) => return Err(StorageError::Sqlite(e)),
            }
        }

        BatchOp::ConditionalUpdate {
            record,
            expected_updated_at,
        } => {
            let f = &record.fields;
            let changed = tx.execute(
                "UPDATE buyers SET updated_at = ?1, full_name = ?2, email = ?3, phone = ?4, city = ?5,
                 property_type = ?6, bhk = ?7, purpose = ?8, budget_min = ?9, budget_max = ?10,
                 timeline = ?11, source = ?12, notes = ?13, tags = ?14, status = ?15
                 WHERE id = ?16 AND updated_at = ?17",
                rusqlite::params![
                    record.updated_at.as_nanos()?,
                    f.full_name,
                    f.email,
                    f.phone,
                    f.city.as_str(),
                    f.property_type.as_str(),
                    f.bhk.map(|b| b.as_str()),
                    f.purpose.as_str(),
                    f.budget_min,
                    f.budget_max,
                    f.timeline.as_str(),
                    f.source.as_str(),
                    f.notes,
                    encode_tags(&f.tags)?,
                    f.status.as_str(),
                    record.id.as_bytes().as_slice(),
                    expected_updated_at.as_nanos()?,
                ],
            )?;
            if changed == 0 {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS (SELECT 1 FROM buyers WHERE id = ?1)",
                    rusqlite::params![record.id.as_bytes().as_slice()],
                    |row| row.get(0),
                )?;
                return Err(if exists {
                    StorageError::Conflict {
                        buyer_id: record.id.to_string(),
                    }
                } else {
                    StorageError::NotFound(record.id.to_string())
                });
            }
        }

        BatchOp::AppendHistory(entry) => {
            let kind = if entry.diff.is_created() {
                "created"
            } else {
                "updated"
            };
            tx.execute(
                "INSERT INTO buyer_history (id, buyer_id, changed_by, changed_at, kind, diff) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    entry.id.as_bytes().as_slice(),
                    entry.buyer_id.as_bytes().as_slice(),
                    entry.changed_by.as_bytes().as_slice(),
                    entry.changed_at.as_nanos()?,
                    kind,
                    entry.diff.to_msgpack()?,
                ],
            )?;
        }
    }
    Ok(())
}

impl Storage for SqliteStorage {
    fn commit(&mut self, batch: &WriteBatch) -> Result<(), StorageError> {
        // IMMEDIATE takes the write lock up front so the conditional update
        // cannot interleave with another writer's.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for op in batch.ops() {
            apply_op(&tx, op)?;
        }
        tx.commit()?;
        tracing::debug!(target: "leadbook.storage", ops = batch.len(), "write batch committed");
        Ok(())
    }
}

impl RecordStore for SqliteStorage {
    fn get_buyer(&self, id: BuyerId) -> Result<Option<BuyerRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BUYER_COLUMNS} FROM buyers WHERE id = ?1"))?;
        let mut rows = stmt.query_map(rusqlite::params![id.as_bytes().as_slice()], BuyerRow::read)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row.into_record()?)),
            Some(Err(e)) => Err(StorageError::Sqlite(e)),
            None => Ok(None),
        }
    }

    fn count_buyers(&self, predicate: &Predicate) -> Result<u64, StorageError> {
        let mut params = Vec::new();
        let clause = compile_predicate(predicate, &mut params);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM buyers WHERE {clause}"),
            rusqlite::params_from_iter(params.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn query_buyers(
        &self,
        predicate: &Predicate,
        order: BuyerOrder,
        window: Window,
    ) -> Result<Vec<BuyerRecord>, StorageError> {
        let mut params = Vec::new();
        let clause = compile_predicate(predicate, &mut params);
        // A negative LIMIT means no limit in SQLite.
        let limit = window
            .limit
            .map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        params.push(Value::Integer(limit));
        params.push(Value::Integer(
            i64::try_from(window.offset).unwrap_or(i64::MAX),
        ));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BUYER_COLUMNS} FROM buyers WHERE {clause} ORDER BY {} LIMIT ? OFFSET ?",
            order.as_sql()
        ))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), BuyerRow::read)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_record()?);
        }
        Ok(result)
    }
}

impl HistoryLog for SqliteStorage {
    fn recent_history(
        &self,
        buyer_id: BuyerId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, buyer_id, changed_by, changed_at, diff FROM buyer_history
             WHERE buyer_id = ?1 ORDER BY changed_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![
                buyer_id.as_bytes().as_slice(),
                i64::try_from(limit).unwrap_or(i64::MAX)
            ],
            read_history_row,
        )?;

        let mut result = Vec::new();
        for row in rows {
            result.push(history_from_row(row?)?);
        }
        Ok(result)
    }

    fn history_for(&self, buyer_id: BuyerId) -> Result<Vec<HistoryEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, buyer_id, changed_by, changed_at, diff FROM buyer_history
             WHERE buyer_id = ?1 ORDER BY changed_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![buyer_id.as_bytes().as_slice()],
            read_history_row,
        )?;

        let mut result = Vec::new();
        for row in rows {
            result.push(history_from_row(row?)?);
        }
        Ok(result)
    }
}
