//! `StockLedger`: the service every caller goes through.
//!
//! Each operation resolves references, then hands a pure domain decision to
//! the store, which applies the item write and the usage write together.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use stockledger_core::{DomainError, OwnerId, StockItemId, UsageEventId};
use stockledger_inventory::{
    self as inventory, project_alerts, Alert, ItemAttributes, LedgerChange, LifecycleAction,
    NewBatch, NewUsage, StockItem, TransitionOutcome, UsageEvent, UsageOutcome, UsagePatch,
    UsageWrite,
};

use crate::catalog::ReferenceCatalog;
use crate::config::LedgerConfig;
use crate::store::{Decision, LedgerStore};

pub use crate::error::{LedgerError, LedgerResult};

/// Request to create `quantity` identical items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub attributes: ItemAttributes,
    pub quantity_per_unit: Decimal,
    pub low_stock_threshold: Option<Decimal>,
    pub replacement_cycle_days: Option<u32>,
    pub last_replaced_at: Option<DateTime<Utc>>,
    pub quantity: i64,
}

pub struct StockLedger<S, C> {
    store: S,
    catalog: C,
    config: LedgerConfig,
}

impl<S, C> StockLedger<S, C>
where
    S: LedgerStore,
    C: ReferenceCatalog,
{
    pub fn new(store: S, catalog: C, config: LedgerConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Create N independent items sharing the request's attributes.
    #[instrument(
        skip(self, request),
        fields(owner_id = %owner_id, quantity = request.quantity),
        err
    )]
    pub async fn create_batch(
        &self,
        owner_id: OwnerId,
        request: BatchRequest,
    ) -> LedgerResult<Vec<StockItem>> {
        if request.quantity < 1 {
            return Err(DomainError::invalid_argument("batch quantity must be at least 1").into());
        }
        let count = u32::try_from(request.quantity).map_err(|_| {
            DomainError::invalid_argument(format!(
                "batch quantity {} exceeds the maximum of {}",
                request.quantity, self.config.max_batch_size
            ))
        })?;

        let category_id = request.attributes.category_id;
        let kind = self
            .catalog
            .category_kind(owner_id, category_id)
            .await?
            .ok_or_else(|| DomainError::invalid_reference(format!("unknown category {category_id}")))?;

        if let Some(brand_id) = request.attributes.brand_id {
            if !self.catalog.brand_exists(owner_id, brand_id).await? {
                return Err(DomainError::invalid_reference(format!("unknown brand {brand_id}")).into());
            }
        }

        let batch = NewBatch {
            owner_id,
            kind,
            attributes: request.attributes,
            quantity_per_unit: request.quantity_per_unit,
            low_stock_threshold: request.low_stock_threshold,
            replacement_cycle_days: request.replacement_cycle_days,
            last_replaced_at: request.last_replaced_at,
            count,
        };
        let items = inventory::create_batch(&batch, self.config.max_batch_size, Utc::now())?;
        self.store.insert_items(owner_id, &items).await?;

        info!(kind = kind.as_str(), created = items.len(), "stock batch created");
        Ok(items)
    }

    #[instrument(skip(self, usage), fields(owner_id = %owner_id, item_id = %item_id, amount = %usage.amount), err)]
    pub async fn record_usage(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
        usage: NewUsage,
    ) -> LedgerResult<UsageOutcome> {
        let event_id = UsageEventId::new();
        let now = Utc::now();

        let outcome = self
            .store
            .update_item(owner_id, item_id, move |item| {
                let outcome = inventory::record_usage(item, event_id, usage, now)?;
                let change = LedgerChange::item_with_usage(
                    outcome.item.clone(),
                    UsageWrite::Insert(outcome.event.clone()),
                );
                Ok(Decision::new(change, outcome))
            })
            .await?;

        log_warning(&outcome);
        info!(
            event_id = %event_id,
            remaining = %outcome.item.remaining_quantity(),
            status = %outcome.item.status(),
            "usage recorded"
        );
        Ok(outcome)
    }

    #[instrument(skip(self, patch), fields(owner_id = %owner_id, event_id = %event_id), err)]
    pub async fn update_usage(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
        patch: UsagePatch,
    ) -> LedgerResult<UsageOutcome> {
        let now = Utc::now();

        let outcome = self
            .store
            .update_usage(owner_id, event_id, move |item, event| {
                let outcome = inventory::revise_usage(item, event, patch, now)?;
                let change = LedgerChange::item_with_usage(
                    outcome.item.clone(),
                    UsageWrite::Replace(outcome.event.clone()),
                );
                Ok(Decision::new(change, outcome))
            })
            .await?;

        log_warning(&outcome);
        info!(
            item_id = %outcome.item.id_typed(),
            remaining = %outcome.item.remaining_quantity(),
            "usage updated"
        );
        Ok(outcome)
    }

    /// Remove a usage event and give its amount back to the item.
    #[instrument(skip(self), fields(owner_id = %owner_id, event_id = %event_id), err)]
    pub async fn delete_usage(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
    ) -> LedgerResult<StockItem> {
        let now = Utc::now();

        let item = self
            .store
            .update_usage(owner_id, event_id, move |item, event| {
                let restored = inventory::remove_usage(item, event, now)?;
                let change =
                    LedgerChange::item_with_usage(restored.clone(), UsageWrite::Remove(event_id));
                Ok(Decision::new(change, restored))
            })
            .await?;

        info!(
            item_id = %item.id_typed(),
            remaining = %item.remaining_quantity(),
            "usage deleted"
        );
        Ok(item)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, item_id = %item_id, action = action.as_str()), err)]
    pub async fn transition_status(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
        action: LifecycleAction,
    ) -> LedgerResult<TransitionOutcome> {
        let session_id = UsageEventId::new();
        let now = Utc::now();

        let outcome = self
            .store
            .update_item(owner_id, item_id, move |item| {
                let outcome = inventory::transition(item, action, session_id, now)?;
                let change = match &outcome.session {
                    Some(session) => LedgerChange::item_with_usage(
                        outcome.item.clone(),
                        UsageWrite::Insert(session.clone()),
                    ),
                    None => LedgerChange::item(outcome.item.clone()),
                };
                Ok(Decision::new(change, outcome))
            })
            .await?;

        info!(status = %outcome.item.status(), session = outcome.session.is_some(), "status changed");
        Ok(outcome)
    }

    /// Restart the replacement cycle at `at`, or now.
    #[instrument(skip(self), fields(owner_id = %owner_id, item_id = %item_id), err)]
    pub async fn mark_replaced(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
        at: Option<DateTime<Utc>>,
    ) -> LedgerResult<StockItem> {
        let now = Utc::now();
        let at = at.unwrap_or(now);

        let item = self
            .store
            .update_item(owner_id, item_id, move |item| {
                let replaced = inventory::mark_replaced(item, at, now)?;
                Ok(Decision::new(LedgerChange::item(replaced.clone()), replaced))
            })
            .await?;

        info!(last_replaced_at = %at, "replacement recorded");
        Ok(item)
    }

    /// Delete an item and all of its usage events. In-use items are refused.
    #[instrument(skip(self), fields(owner_id = %owner_id, item_id = %item_id), err)]
    pub async fn delete_item(&self, owner_id: OwnerId, item_id: StockItemId) -> LedgerResult<()> {
        self.store
            .update_item(owner_id, item_id, |item| {
                inventory::ensure_deletable(item)?;
                Ok(Decision::new(LedgerChange::remove(item.id_typed()), ()))
            })
            .await?;

        info!("stock item deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, alert_count = tracing::field::Empty), err)]
    pub async fn get_alerts(&self, owner_id: OwnerId) -> LedgerResult<Vec<Alert>> {
        let items = self.store.list_items(owner_id).await?;
        let alerts = project_alerts(&items, Utc::now());
        tracing::Span::current().record("alert_count", alerts.len());
        Ok(alerts)
    }

    pub async fn get_item(&self, owner_id: OwnerId, item_id: StockItemId) -> LedgerResult<StockItem> {
        self.store
            .get_item(owner_id, item_id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    pub async fn list_items(&self, owner_id: OwnerId) -> LedgerResult<Vec<StockItem>> {
        Ok(self.store.list_items(owner_id).await?)
    }

    /// Usage history of one item; `NotFound` if the owner has no such item.
    pub async fn list_usage(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> LedgerResult<Vec<UsageEvent>> {
        self.get_item(owner_id, item_id).await?;
        Ok(self.store.list_usage(owner_id, item_id).await?)
    }
}

fn log_warning(outcome: &UsageOutcome) {
    if let Some(warning) = &outcome.warning {
        warn!(
            item_id = %outcome.item.id_typed(),
            warning = %warning,
            "usage exceeds remaining stock; balance clamped to zero"
        );
    }
}
