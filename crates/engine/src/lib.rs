pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod identity;
pub mod import;
pub mod wire;

pub use config::ServiceConfig;
pub use context::MutationContext;
pub use error::{EngineError, ErrorKind};
pub use identity::{FixedIdentity, IdentityProvider, require_user};
pub use import::{ImportReport, RowError};
pub use wire::{BuyerPage, BuyerView, ErrorBody};

use leadbook_core::{
    BuyerFilter, BuyerId, BuyerRecord, FieldErrors, HistoryEntry, MonotonicClock, PageRequest,
    Pagination, RawInput, Timestamp, UserId, diff, validate,
};
use leadbook_storage::{BuyerOrder, Storage, StorageError, Window, WriteBatch};

/// Record mutation, bulk import/export and read paths over one store.
///
/// Mutations take the acting user explicitly through [`MutationContext`];
/// reads take an [`IdentityProvider`] and reject anonymous callers. There is
/// no ambient session.
pub struct LeadService<S: Storage> {
    storage: S,
    clock: MonotonicClock,
    config: ServiceConfig,
}

impl<S: Storage> LeadService<S> {
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, ServiceConfig::default())
    }

    pub fn with_config(storage: S, config: ServiceConfig) -> Self {
        Self {
            storage,
            clock: MonotonicClock::new(),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn require_buyer(&self, id: BuyerId) -> Result<BuyerRecord, EngineError> {
        self.storage
            .get_buyer(id)?
            .ok_or(EngineError::NotFound(id))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Validate and persist a new lead owned by the acting user, together
    /// with its `created` history entry.
    pub fn create(
        &mut self,
        raw: &RawInput,
        ctx: &MutationContext,
    ) -> Result<BuyerRecord, EngineError> {
        let fields = validate(raw).map_err(EngineError::ValidationFailed)?;
        self.ensure_live(ctx)?;

        let now = self.clock.tick();
        let record = BuyerRecord {
            id: BuyerId::new(),
            owner_id: ctx.user(),
            updated_at: now,
            fields,
        };
        let mut batch = WriteBatch::new();
        batch
            .create(record.clone())
            .append_history(HistoryEntry::created(
                record.id,
                ctx.user(),
                now,
                record.fields.clone(),
            ));
        self.storage.commit(&batch).map_err(storage_fault)?;

        tracing::info!(
            target: "leadbook.engine",
            buyer_id = %record.id,
            actor = %ctx.user(),
            "buyer created"
        );
        Ok(record)
    }

    /// Replace a lead's fields if the acting user owns it and
    /// `expected_updated_at` is still current.
    ///
    /// An update that changes nothing still advances `updated_at` and writes
    /// an empty-diff history entry, so a used token is never valid twice.
    pub fn update(
        &mut self,
        id: BuyerId,
        raw: &RawInput,
        expected_updated_at: Timestamp,
        ctx: &MutationContext,
    ) -> Result<BuyerRecord, EngineError> {
        let fields = validate(raw).map_err(EngineError::ValidationFailed)?;
        let current = self.require_buyer(id)?;

        if current.owner_id != ctx.user() {
            tracing::warn!(
                target: "leadbook.engine",
                buyer_id = %id,
                actor = %ctx.user(),
                "update rejected: not the owner"
            );
            return Err(EngineError::Forbidden {
                buyer_id: id,
                user: ctx.user(),
            });
        }
        if current.updated_at != expected_updated_at {
            tracing::warn!(
                target: "leadbook.engine",
                buyer_id = %id,
                expected = %expected_updated_at,
                current = %current.updated_at,
                "update rejected: stale token"
            );
            return Err(EngineError::Conflict(id));
        }

        let changes = diff(&current.fields, &fields);
        self.ensure_live(ctx)?;

        let now = self.clock.tick_after(current.updated_at);
        let record = BuyerRecord {
            id,
            owner_id: current.owner_id,
            updated_at: now,
            fields,
        };
        let changed = changes.len();
        let mut batch = WriteBatch::new();
        batch
            .update_if_unchanged(record.clone(), expected_updated_at)
            .append_history(HistoryEntry::updated(id, ctx.user(), now, changes));

        match self.storage.commit(&batch) {
            Ok(()) => {}
            // Lost the race between our read and our write.
            Err(StorageError::Conflict { .. }) => {
                tracing::warn!(
                    target: "leadbook.engine",
                    buyer_id = %id,
                    actor = %ctx.user(),
                    "update rejected: concurrent modification"
                );
                return Err(EngineError::Conflict(id));
            }
            Err(StorageError::NotFound(_)) => return Err(EngineError::NotFound(id)),
            Err(e) => return Err(storage_fault(e)),
        }

        tracing::info!(
            target: "leadbook.engine",
            buyer_id = %id,
            actor = %ctx.user(),
            changed,
            "buyer updated"
        );
        Ok(record)
    }

    fn ensure_live(&self, ctx: &MutationContext) -> Result<(), EngineError> {
        ctx.check().inspect_err(|_| {
            tracing::warn!(target: "leadbook.engine", actor = %ctx.user(), "mutation cancelled");
        })
    }

    // ========================================================================
    // Bulk import / export
    // ========================================================================

    /// Validate every row independently, then insert all valid rows in one
    /// all-or-nothing batch. Row failures are reported, not fatal.
    pub fn import_csv(
        &mut self,
        csv_text: &str,
        ctx: &MutationContext,
    ) -> Result<ImportReport, EngineError> {
        let rows = import::read_rows(csv_text)?;
        let max = self.config.max_import_rows;
        if rows.len() > max {
            tracing::warn!(
                target: "leadbook.import",
                actor = %ctx.user(),
                rows = rows.len(),
                max,
                "import rejected: too many rows"
            );
            return Err(EngineError::RowLimitExceeded {
                rows: rows.len(),
                max,
            });
        }

        let mut errors = Vec::new();
        let mut valid = Vec::new();
        for (row, raw) in rows {
            match validate(&raw) {
                Ok(fields) => valid.push(fields),
                Err(field_errors) => errors.push(RowError::new(row, field_errors)),
            }
        }

        if valid.is_empty() {
            tracing::info!(
                target: "leadbook.import",
                actor = %ctx.user(),
                rejected = errors.len(),
                "import had no valid rows"
            );
            return Ok(ImportReport {
                inserted_count: 0,
                errors,
            });
        }
        self.ensure_live(ctx)?;

        let mut batch = WriteBatch::new();
        let inserted_count = valid.len();
        for fields in valid {
            let now = self.clock.tick();
            let record = BuyerRecord {
                id: BuyerId::new(),
                owner_id: ctx.user(),
                updated_at: now,
                fields,
            };
            let entry = HistoryEntry::created(record.id, ctx.user(), now, record.fields.clone());
            batch.create(record).append_history(entry);
        }
        self.storage.commit(&batch).map_err(storage_fault)?;

        tracing::info!(
            target: "leadbook.import",
            actor = %ctx.user(),
            inserted = inserted_count,
            rejected = errors.len(),
            "import committed"
        );
        Ok(ImportReport {
            inserted_count,
            errors,
        })
    }

    /// Every record matching `filter`, newest first, as CSV.
    pub fn export_csv(
        &self,
        filter: &BuyerFilter,
        viewer: &dyn IdentityProvider,
    ) -> Result<String, EngineError> {
        let user = self.require_viewer(viewer)?;
        let records = self.storage.query_buyers(
            &filter.to_predicate(),
            BuyerOrder::UpdatedAtDesc,
            Window::all(),
        )?;
        let text = export::write_csv(&records)?;
        tracing::info!(
            target: "leadbook.export",
            actor = %user,
            rows = records.len(),
            "export written"
        );
        Ok(text)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    fn require_viewer(&self, viewer: &dyn IdentityProvider) -> Result<UserId, EngineError> {
        require_user(viewer).inspect_err(|_| {
            tracing::warn!(target: "leadbook.engine", "read rejected: no signed-in user");
        })
    }

    pub fn get(
        &self,
        id: BuyerId,
        viewer: &dyn IdentityProvider,
    ) -> Result<BuyerRecord, EngineError> {
        self.require_viewer(viewer)?;
        self.require_buyer(id)
    }

    /// The record plus its newest history entries. Any signed-in user may view.
    pub fn view(
        &self,
        id: BuyerId,
        viewer: &dyn IdentityProvider,
    ) -> Result<BuyerView, EngineError> {
        self.require_viewer(viewer)?;
        let record = self.require_buyer(id)?;
        let recent_history = self
            .storage
            .recent_history(id, self.config.recent_history_limit)?;
        Ok(BuyerView {
            record,
            recent_history,
        })
    }

    /// Full audit trail, oldest first.
    pub fn history(
        &self,
        id: BuyerId,
        viewer: &dyn IdentityProvider,
    ) -> Result<Vec<HistoryEntry>, EngineError> {
        self.require_viewer(viewer)?;
        self.require_buyer(id)?;
        Ok(self.storage.history_for(id)?)
    }

    pub fn list(
        &self,
        filter: &BuyerFilter,
        page: PageRequest,
        viewer: &dyn IdentityProvider,
    ) -> Result<BuyerPage, EngineError> {
        self.require_viewer(viewer)?;
        self.check_page(page)?;
        let predicate = filter.to_predicate();
        let total = self.storage.count_buyers(&predicate)?;
        let records = self.storage.query_buyers(
            &predicate,
            BuyerOrder::UpdatedAtDesc,
            Window::page(page.offset(), u64::from(page.page_size)),
        )?;
        Ok(BuyerPage {
            records,
            pagination: Pagination::new(page, total),
        })
    }

    /// [`Self::list`] driven by flat request parameters.
    pub fn list_from_params(
        &self,
        params: &[(&str, &str)],
        viewer: &dyn IdentityProvider,
    ) -> Result<BuyerPage, EngineError> {
        self.require_viewer(viewer)?;
        let filter = BuyerFilter::from_params(params.iter().copied());
        let page = PageRequest::from_params(params.iter().copied(), self.config.default_page_size);
        match (filter, page) {
            (Ok(filter), Ok(page)) => self.list(&filter, page, viewer),
            (filter, page) => {
                let mut errors = FieldErrors::new();
                for failed in [filter.err(), page.err()].into_iter().flatten() {
                    for (field, messages) in failed.iter() {
                        for message in messages {
                            errors.add(field, message.clone());
                        }
                    }
                }
                Err(EngineError::InvalidRequest(errors))
            }
        }
    }

    fn check_page(&self, page: PageRequest) -> Result<(), EngineError> {
        let mut errors = FieldErrors::new();
        if page.page < 1 {
            errors.add(leadbook_core::query::PAGE, "Number must be greater than 0");
        }
        if page.page_size < 1 {
            errors.add(leadbook_core::query::PAGE_SIZE, "Number must be greater than 0");
        } else if page.page_size > self.config.max_page_size {
            errors.add(
                leadbook_core::query::PAGE_SIZE,
                format!("Number must be less than or equal to {}", self.config.max_page_size),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidRequest(errors))
        }
    }
}

fn storage_fault(err: StorageError) -> EngineError {
    tracing::error!(target: "leadbook.engine", error = %err, "storage commit failed");
    EngineError::Storage(err)
}
