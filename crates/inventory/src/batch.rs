//! Batch creation: N identical, independent stock items in one go.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockledger_core::{DomainError, DomainResult, OwnerId, Quantity, StockItemId};

use crate::item::{ItemAttributes, ItemKind, StockItem};

/// Upper bound on a single batch unless configured otherwise.
pub const DEFAULT_MAX_BATCH_SIZE: u32 = 1000;

/// Shared attributes for every item in a batch.
///
/// `kind` comes from the category; the caller resolves it through the
/// reference catalog before building the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBatch {
    pub owner_id: OwnerId,
    pub kind: ItemKind,
    pub attributes: ItemAttributes,
    pub quantity_per_unit: Decimal,
    pub low_stock_threshold: Option<Decimal>,
    pub replacement_cycle_days: Option<u32>,
    pub last_replaced_at: Option<DateTime<Utc>>,
    pub count: u32,
}

/// Build the items for a batch. Either every item is valid or none is returned.
pub fn create_batch(batch: &NewBatch, max_count: u32, now: DateTime<Utc>) -> DomainResult<Vec<StockItem>> {
    if batch.count < 1 {
        return Err(DomainError::invalid_argument("batch quantity must be at least 1"));
    }
    if batch.count > max_count {
        return Err(DomainError::invalid_argument(format!(
            "batch quantity {} exceeds the maximum of {max_count}",
            batch.count
        )));
    }
    if batch.attributes.name.trim().is_empty() {
        return Err(DomainError::invalid_argument("name cannot be empty"));
    }
    if batch.replacement_cycle_days == Some(0) {
        return Err(DomainError::invalid_argument(
            "replacement cycle must be at least one day",
        ));
    }

    if batch.last_replaced_at.is_some_and(|at| at > now) {
        return Err(DomainError::invalid_argument(
            "replacement date cannot be in the future",
        ));
    }

    let total = Quantity::positive(batch.quantity_per_unit, "quantity per unit")?;
    let threshold = batch.low_stock_threshold.map(Quantity::new).transpose()?;

    let mut attributes = batch.attributes.clone();
    attributes.name = attributes.name.trim().to_string();

    let items = (0..batch.count)
        .map(|_| StockItem {
            id: StockItemId::new(),
            owner_id: batch.owner_id,
            kind: batch.kind,
            attributes: attributes.clone(),
            total_quantity: total,
            remaining_quantity: total,
            status: batch.kind.initial_status(),
            low_stock_threshold: threshold,
            replacement_cycle_days: batch.replacement_cycle_days,
            opened_at: None,
            depleted_at: None,
            in_use_since: None,
            last_replaced_at: batch.last_replaced_at,
            created_at: now,
            updated_at: now,
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::item::ItemStatus;
    use stockledger_core::{CategoryId, Entity};

    fn batch(kind: ItemKind, count: u32) -> NewBatch {
        NewBatch {
            owner_id: OwnerId::new(),
            kind,
            attributes: ItemAttributes {
                category_id: CategoryId::new(),
                brand_id: None,
                name: "  PETG Orange ".to_string(),
                color: Some("orange".to_string()),
                unit_price: Some(Decimal::new(1999, 2)),
                purchased_on: None,
            },
            quantity_per_unit: Decimal::from(1000),
            low_stock_threshold: Some(Decimal::from(150)),
            replacement_cycle_days: None,
            last_replaced_at: None,
            count,
        }
    }

    #[test]
    fn creates_n_distinct_full_items() {
        let items = create_batch(&batch(ItemKind::Consumable, 5), DEFAULT_MAX_BATCH_SIZE, Utc::now()).unwrap();
        assert_eq!(items.len(), 5);

        let ids: HashSet<_> = items.iter().map(|i| *i.id()).collect();
        assert_eq!(ids.len(), 5);

        for item in &items {
            assert_eq!(item.remaining_quantity(), item.total_quantity());
            assert_eq!(item.total_quantity(), Quantity::from_units(1000));
            assert_eq!(item.status(), ItemStatus::Unopened);
            assert_eq!(item.attributes().name, "PETG Orange");
        }
    }

    #[test]
    fn durable_batches_start_available() {
        let items = create_batch(&batch(ItemKind::Durable, 2), DEFAULT_MAX_BATCH_SIZE, Utc::now()).unwrap();
        assert!(items.iter().all(|i| i.status() == ItemStatus::Available));
    }

    #[test]
    fn zero_count_is_rejected() {
        let err = create_batch(&batch(ItemKind::Consumable, 0), DEFAULT_MAX_BATCH_SIZE, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn oversized_batch_is_rejected() {
        assert!(create_batch(&batch(ItemKind::Consumable, 11), 10, Utc::now()).is_err());
    }

    #[test]
    fn non_positive_unit_quantity_is_rejected() {
        let mut b = batch(ItemKind::Consumable, 1);
        b.quantity_per_unit = Decimal::ZERO;
        assert!(matches!(
            create_batch(&b, DEFAULT_MAX_BATCH_SIZE, Utc::now()),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut b = batch(ItemKind::Consumable, 1);
        b.low_stock_threshold = Some(Decimal::from(-1));
        assert!(create_batch(&b, DEFAULT_MAX_BATCH_SIZE, Utc::now()).is_err());
    }

    #[test]
    fn future_replacement_date_is_rejected() {
        let now = Utc::now();
        let mut b = batch(ItemKind::Durable, 1);
        b.last_replaced_at = Some(now + chrono::Duration::days(1));
        assert!(matches!(
            create_batch(&b, DEFAULT_MAX_BATCH_SIZE, now),
            Err(DomainError::InvalidArgument(_))
        ));

        b.last_replaced_at = Some(now);
        let items = create_batch(&b, DEFAULT_MAX_BATCH_SIZE, now).unwrap();
        assert_eq!(items[0].last_replaced_at(), Some(now));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut b = batch(ItemKind::Consumable, 1);
        b.attributes.name = "   ".to_string();
        assert!(create_batch(&b, DEFAULT_MAX_BATCH_SIZE, Utc::now()).is_err());
    }
}
