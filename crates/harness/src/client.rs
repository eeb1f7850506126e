use leadbook_core::{
    BuyerFilter, BuyerId, BuyerRecord, HistoryEntry, PageRequest, RawInput, Timestamp, UserId,
};
use leadbook_engine::{
    BuyerPage, BuyerView, EngineError, IdentityProvider, ImportReport, LeadService,
    MutationContext,
};
use leadbook_storage::{SqliteStorage, StorageError};

/// One signed-in user driving a service over its own connection.
pub struct TestClient {
    pub user: UserId,
    pub service: LeadService<SqliteStorage>,
}

impl TestClient {
    /// A fresh user over a private in-memory database.
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::with_storage(UserId::new(), SqliteStorage::open_in_memory()?))
    }

    pub fn with_storage(user: UserId, storage: SqliteStorage) -> Self {
        Self {
            user,
            service: LeadService::new(storage),
        }
    }

    pub fn ctx(&self) -> MutationContext {
        MutationContext::new(self.user)
    }

    pub fn create(&mut self, raw: &RawInput) -> Result<BuyerRecord, EngineError> {
        let ctx = self.ctx();
        self.service.create(raw, &ctx)
    }

    pub fn update(
        &mut self,
        id: BuyerId,
        raw: &RawInput,
        expected_updated_at: Timestamp,
    ) -> Result<BuyerRecord, EngineError> {
        let ctx = self.ctx();
        self.service.update(id, raw, expected_updated_at, &ctx)
    }

    /// Re-submit `record` with one field changed, using its own token.
    pub fn edit(
        &mut self,
        record: &BuyerRecord,
        field: &str,
        value: impl Into<leadbook_core::FieldValue>,
    ) -> Result<BuyerRecord, EngineError> {
        let mut raw = record.fields.to_raw();
        raw.insert(field, value);
        self.update(record.id, &raw, record.updated_at)
    }

    pub fn import(&mut self, csv_text: &str) -> Result<ImportReport, EngineError> {
        let ctx = self.ctx();
        self.service.import_csv(csv_text, &ctx)
    }

    pub fn get(&self, id: BuyerId) -> Result<BuyerRecord, EngineError> {
        self.service.get(id, self)
    }

    pub fn view(&self, id: BuyerId) -> Result<BuyerView, EngineError> {
        self.service.view(id, self)
    }

    pub fn history(&self, id: BuyerId) -> Result<Vec<HistoryEntry>, EngineError> {
        self.service.history(id, self)
    }

    pub fn list(
        &self,
        filter: &BuyerFilter,
        page: PageRequest,
    ) -> Result<BuyerPage, EngineError> {
        self.service.list(filter, page, self)
    }

    pub fn list_from_params(&self, params: &[(&str, &str)]) -> Result<BuyerPage, EngineError> {
        self.service.list_from_params(params, self)
    }

    pub fn export(&self, filter: &BuyerFilter) -> Result<String, EngineError> {
        self.service.export_csv(filter, self)
    }
}

impl IdentityProvider for TestClient {
    fn current_user(&self) -> Option<UserId> {
        Some(self.user)
    }
}
