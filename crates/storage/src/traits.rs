use leadbook_core::{
    buyer::BuyerRecord,
    clock::Timestamp,
    history::HistoryEntry,
    ids::BuyerId,
    query::Predicate,
};

use crate::error::StorageError;

/// Sort order for record queries. Ties always break on id ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuyerOrder {
    #[default]
    UpdatedAtDesc,
    UpdatedAtAsc,
}

impl BuyerOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::UpdatedAtDesc => "updated_at DESC, id ASC",
            Self::UpdatedAtAsc => "updated_at ASC, id ASC",
        }
    }
}

/// Offset/limit slice of a query. `limit: None` returns every remaining row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Window {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn page(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Create(BuyerRecord),
    /// Replace the stored fields and token of `record.id`, but only if its
    /// current `updated_at` equals `expected_updated_at`. `owner_id` is
    /// never rewritten.
    ConditionalUpdate {
        record: BuyerRecord,
        expected_updated_at: Timestamp,
    },
    AppendHistory(HistoryEntry),
}

/// Writes applied all-or-nothing by [`Storage::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, record: BuyerRecord) -> &mut Self {
        self.ops.push(BatchOp::Create(record));
        self
    }

    pub fn update_if_unchanged(
        &mut self,
        record: BuyerRecord,
        expected_updated_at: Timestamp,
    ) -> &mut Self {
        self.ops.push(BatchOp::ConditionalUpdate {
            record,
            expected_updated_at,
        });
        self
    }

    pub fn append_history(&mut self, entry: HistoryEntry) -> &mut Self {
        self.ops.push(BatchOp::AppendHistory(entry));
        self
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

pub trait RecordStore {
    fn get_buyer(&self, id: BuyerId) -> Result<Option<BuyerRecord>, StorageError>;

    fn count_buyers(&self, predicate: &Predicate) -> Result<u64, StorageError>;

    fn query_buyers(
        &self,
        predicate: &Predicate,
        order: BuyerOrder,
        window: Window,
    ) -> Result<Vec<BuyerRecord>, StorageError>;
}

pub trait HistoryLog {
    /// Newest first, at most `limit` entries.
    fn recent_history(
        &self,
        buyer_id: BuyerId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StorageError>;

    /// The whole trail, oldest first.
    fn history_for(&self, buyer_id: BuyerId) -> Result<Vec<HistoryEntry>, StorageError>;
}

pub trait Storage: RecordStore + HistoryLog {
    /// Apply every op in order inside one transaction. On any error nothing
    /// from the batch is visible.
    fn commit(&mut self, batch: &WriteBatch) -> Result<(), StorageError>;

    fn create_buyer(&mut self, record: &BuyerRecord) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.create(record.clone());
        self.commit(&batch)
    }

    fn conditional_update(
        &mut self,
        record: &BuyerRecord,
        expected_updated_at: Timestamp,
    ) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.update_if_unchanged(record.clone(), expected_updated_at);
        self.commit(&batch)
    }

    fn append_history(&mut self, entry: &HistoryEntry) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.append_history(entry.clone());
        self.commit(&batch)
    }
}
