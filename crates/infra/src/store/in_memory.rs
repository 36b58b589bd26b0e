use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use stockledger_core::{DomainError, DomainResult, OwnerId, StockItemId, UsageEventId};
use stockledger_inventory::{LedgerChange, StockItem, UsageEvent, UsageWrite};

use super::{Decision, LedgerStore, check_change};
use crate::error::{LedgerResult, StoreError};

#[derive(Debug, Default)]
struct Tables {
    items: HashMap<(OwnerId, StockItemId), StockItem>,
    usage: HashMap<(OwnerId, UsageEventId), UsageEvent>,
}

impl Tables {
    /// Usage row first: a failed usage write must leave the item untouched.
    fn apply(&mut self, owner_id: OwnerId, change: LedgerChange) -> DomainResult<()> {
        match change {
            LedgerChange::Update { item, usage } => {
                match usage {
                    Some(UsageWrite::Insert(event)) => {
                        let key = (owner_id, event.id_typed());
                        if self.usage.contains_key(&key) {
                            return Err(DomainError::conflict(format!(
                                "usage event {} already exists",
                                event.id_typed()
                            )));
                        }
                        self.usage.insert(key, event);
                    }
                    Some(UsageWrite::Replace(event)) => {
                        let key = (owner_id, event.id_typed());
                        if !self.usage.contains_key(&key) {
                            return Err(DomainError::not_found());
                        }
                        self.usage.insert(key, event);
                    }
                    Some(UsageWrite::Remove(event_id)) => {
                        self.usage.remove(&(owner_id, event_id));
                    }
                    None => {}
                }
                self.items.insert((owner_id, item.id_typed()), item);
            }
            LedgerChange::Remove { item_id } => {
                self.usage
                    .retain(|(owner, _), event| !(*owner == owner_id && event.item_id() == item_id));
                self.items.remove(&(owner_id, item_id));
            }
        }
        Ok(())
    }
}

/// In-memory ledger store for tests/dev.
///
/// One lock covers both tables, so a decision and its write are atomic with
/// respect to every other caller.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Tables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_items(&self, owner_id: OwnerId, items: &[StockItem]) -> LedgerResult<()> {
        let mut tables = self.write()?;

        for item in items {
            check_change(owner_id, item.id_typed(), &LedgerChange::item(item.clone()))?;
            if tables.items.contains_key(&(owner_id, item.id_typed())) {
                return Err(DomainError::conflict(format!(
                    "stock item {} already exists",
                    item.id_typed()
                ))
                .into());
            }
        }
        for item in items {
            tables.items.insert((owner_id, item.id_typed()), item.clone());
        }
        Ok(())
    }

    async fn get_item(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> Result<Option<StockItem>, StoreError> {
        Ok(self.read()?.items.get(&(owner_id, item_id)).cloned())
    }

    async fn list_items(&self, owner_id: OwnerId) -> Result<Vec<StockItem>, StoreError> {
        let tables = self.read()?;
        let mut items: Vec<StockItem> = tables
            .items
            .iter()
            .filter_map(|((owner, _), item)| (*owner == owner_id).then(|| item.clone()))
            .collect();
        items.sort_by_key(|i| (i.created_at(), i.id_typed()));
        Ok(items)
    }

    async fn get_usage(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
    ) -> Result<Option<UsageEvent>, StoreError> {
        Ok(self.read()?.usage.get(&(owner_id, event_id)).cloned())
    }

    async fn list_usage(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> Result<Vec<UsageEvent>, StoreError> {
        let tables = self.read()?;
        let mut events: Vec<UsageEvent> = tables
            .usage
            .iter()
            .filter_map(|((owner, _), event)| {
                (*owner == owner_id && event.item_id() == item_id).then(|| event.clone())
            })
            .collect();
        events.sort_by_key(|e| (e.occurred_at(), e.id_typed()));
        Ok(events)
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
        let mut tables = self.write()?;
        let item = tables
            .items
            .get(&(owner_id, item_id))
            .ok_or_else(DomainError::not_found)?;

        let Decision { change, output } = decide(item)?;
        check_change(owner_id, item_id, &change)?;
        tables.apply(owner_id, change)?;
        Ok(output)
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
        let mut tables = self.write()?;
        let event = tables
            .usage
            .get(&(owner_id, event_id))
            .ok_or_else(DomainError::not_found)?;
        let item_id = event.item_id();
        let item = tables.items.get(&(owner_id, item_id)).ok_or_else(|| {
            StoreError::Corrupt(format!("usage event {event_id} references missing item {item_id}"))
        })?;

        let Decision { change, output } = decide(item, event)?;
        check_change(owner_id, item_id, &change)?;
        tables.apply(owner_id, change)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use stockledger_core::CategoryId;
    use stockledger_inventory::{
        create_batch, record_usage, ItemAttributes, ItemKind, NewBatch, NewUsage,
    };

    fn items(owner_id: OwnerId, count: u32) -> Vec<StockItem> {
        let batch = NewBatch {
            owner_id,
            kind: ItemKind::Consumable,
            attributes: ItemAttributes {
                category_id: CategoryId::new(),
                brand_id: None,
                name: "PLA White".to_string(),
                color: None,
                unit_price: None,
                purchased_on: None,
            },
            quantity_per_unit: Decimal::from(1000),
            low_stock_threshold: None,
            replacement_cycle_days: None,
            last_replaced_at: None,
            count,
        };
        create_batch(&batch, 100, Utc::now()).unwrap()
    }

    fn usage(amount: i64) -> NewUsage {
        NewUsage {
            amount: Decimal::from(amount),
            occurred_at: Utc::now(),
            note: None,
        }
    }

    #[tokio::test]
    async fn other_owners_rows_are_invisible() {
        let store = InMemoryLedgerStore::new();
        let owner = OwnerId::new();
        let other = OwnerId::new();
        let batch = items(owner, 2);
        store.insert_items(owner, &batch).await.unwrap();

        let id = batch[0].id_typed();
        assert!(store.get_item(owner, id).await.unwrap().is_some());
        assert!(store.get_item(other, id).await.unwrap().is_none());
        assert!(store.list_items(other).await.unwrap().is_empty());
        assert_eq!(store.list_items(owner).await.unwrap().len(), 2);

        let err = store
            .update_item(other, id, |item| Ok(Decision::new(LedgerChange::item(item.clone()), ())))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound)));
    }

    #[tokio::test]
    async fn failed_decision_writes_nothing() {
        let store = InMemoryLedgerStore::new();
        let owner = OwnerId::new();
        let batch = items(owner, 1);
        store.insert_items(owner, &batch).await.unwrap();
        let id = batch[0].id_typed();

        let result: LedgerResult<()> = store
            .update_item(owner, id, |_| Err(DomainError::invalid_argument("nope")))
            .await;
        assert!(result.is_err());
        assert_eq!(store.get_item(owner, id).await.unwrap().unwrap(), batch[0]);
    }

    #[tokio::test]
    async fn write_set_for_another_item_is_rejected() {
        let store = InMemoryLedgerStore::new();
        let owner = OwnerId::new();
        let batch = items(owner, 2);
        store.insert_items(owner, &batch).await.unwrap();

        let sibling = batch[1].clone();
        let result = store
            .update_item(owner, batch[0].id_typed(), move |_| {
                Ok(Decision::new(LedgerChange::item(sibling), ()))
            })
            .await;
        assert!(matches!(
            result.unwrap_err().as_domain(),
            Some(DomainError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn remove_cascades_to_usage() {
        let store = InMemoryLedgerStore::new();
        let owner = OwnerId::new();
        let batch = items(owner, 1);
        store.insert_items(owner, &batch).await.unwrap();
        let id = batch[0].id_typed();

        let event_id = store
            .update_item(owner, id, |item| {
                let outcome = record_usage(item, UsageEventId::new(), usage(10), Utc::now())?;
                let event_id = outcome.event.id_typed();
                Ok(Decision::new(
                    LedgerChange::item_with_usage(outcome.item, UsageWrite::Insert(outcome.event)),
                    event_id,
                ))
            })
            .await
            .unwrap();
        assert_eq!(store.list_usage(owner, id).await.unwrap().len(), 1);

        store
            .update_item(owner, id, move |_| Ok(Decision::new(LedgerChange::remove(id), ())))
            .await
            .unwrap();
        assert!(store.get_item(owner, id).await.unwrap().is_none());
        assert!(store.get_usage(owner, event_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_all_or_nothing() {
        let store = InMemoryLedgerStore::new();
        let owner = OwnerId::new();
        let first = items(owner, 1);
        store.insert_items(owner, &first).await.unwrap();

        let mut second = items(owner, 2);
        second.push(first[0].clone());
        let err = store.insert_items(owner, &second).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Conflict(_))));
        assert_eq!(store.list_items(owner).await.unwrap().len(), 1);
    }
}
