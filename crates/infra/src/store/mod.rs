//! Persistence boundary for stock items and their usage events.
//!
//! Reads are plain lookups. Writes go through `update_item` / `update_usage`:
//! the store locks the target rows, hands them to a pure decision, and applies
//! the returned [`LedgerChange`] in the same unit of work. Two concurrent
//! usages of one item therefore serialize instead of losing an update.
//!
//! Every method is scoped by `owner_id`; a row owned by someone else behaves
//! exactly like a missing row.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use stockledger_core::{DomainResult, OwnerId, StockItemId, UsageEventId};
use stockledger_inventory::{LedgerChange, StockItem, UsageEvent};

use crate::error::LedgerResult;

pub use crate::error::StoreError;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// A decision's write set plus whatever the caller wants back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision<T> {
    pub change: LedgerChange,
    pub output: T,
}

impl<T> Decision<T> {
    pub fn new(change: LedgerChange, output: T) -> Self {
        Self { change, output }
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert freshly created items; all of them or none.
    async fn insert_items(&self, owner_id: OwnerId, items: &[StockItem]) -> LedgerResult<()>;

    async fn get_item(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> Result<Option<StockItem>, StoreError>;

    /// All of the owner's items, oldest first.
    async fn list_items(&self, owner_id: OwnerId) -> Result<Vec<StockItem>, StoreError>;

    async fn get_usage(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
    ) -> Result<Option<UsageEvent>, StoreError>;

    /// Usage events of one item, by `occurred_at` then id.
    async fn list_usage(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> Result<Vec<UsageEvent>, StoreError>;

    /// Lock the item, decide, apply. `NotFound` when the owner has no such item.
    async fn update_item<T, F>(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
        decide: F,
    ) -> LedgerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&StockItem) -> DomainResult<Decision<T>> + Send + 'static;

    /// Lock a usage event and its item, decide, apply.
    async fn update_usage<T, F>(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
        decide: F,
    ) -> LedgerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&StockItem, &UsageEvent) -> DomainResult<Decision<T>> + Send + 'static;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore,
{
    async fn insert_items(&self, owner_id: OwnerId, items: &[StockItem]) -> LedgerResult<()> {
        (**self).insert_items(owner_id, items).await
    }

    async fn get_item(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> Result<Option<StockItem>, StoreError> {
        (**self).get_item(owner_id, item_id).await
    }

    async fn list_items(&self, owner_id: OwnerId) -> Result<Vec<StockItem>, StoreError> {
        (**self).list_items(owner_id).await
    }

    async fn get_usage(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
    ) -> Result<Option<UsageEvent>, StoreError> {
        (**self).get_usage(owner_id, event_id).await
    }

    async fn list_usage(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> Result<Vec<UsageEvent>, StoreError> {
        (**self).list_usage(owner_id, item_id).await
    }

    async fn update_item<T, F>(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
        decide: F,
    ) -> LedgerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&StockItem) -> DomainResult<Decision<T>> + Send + 'static,
    {
        (**self).update_item(owner_id, item_id, decide).await
    }

    async fn update_usage<T, F>(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
        decide: F,
    ) -> LedgerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&StockItem, &UsageEvent) -> DomainResult<Decision<T>> + Send + 'static,
    {
        (**self).update_usage(owner_id, event_id, decide).await
    }
}

/// Reject a write set that reaches outside the rows the store locked.
pub(crate) fn check_change(
    owner_id: OwnerId,
    locked_item: StockItemId,
    change: &LedgerChange,
) -> DomainResult<()> {
    use stockledger_core::{DomainError, Entity};
    use stockledger_inventory::UsageWrite;

    let foreign = |what: &str| {
        DomainError::invariant(format!("{what} does not belong to locked item {locked_item}"))
    };

    match change {
        LedgerChange::Update { item, usage } => {
            if item.id_typed() != locked_item || item.owner_id() != owner_id {
                return Err(foreign("updated item"));
            }
            match usage {
                Some(UsageWrite::Insert(event)) | Some(UsageWrite::Replace(event)) => {
                    if event.item_id() != locked_item || event.owner_id() != owner_id {
                        return Err(foreign("usage event"));
                    }
                }
                Some(UsageWrite::Remove(_)) | None => {}
            }
        }
        LedgerChange::Remove { item_id } => {
            if *item_id != locked_item {
                return Err(foreign("removed item"));
            }
        }
    }
    Ok(())
}
