use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{
    BrandId, CategoryId, DomainError, DomainResult, Entity, OwnerId, Quantity, StockItemId,
};

use crate::policy::OverusePolicy;

/// How an item's quantity behaves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Fungible material (filament, resin): depletes continuously, over-use is warned.
    Consumable,
    /// Accessory with a hard stock ceiling and in-use sessions (nozzles, build plates).
    Durable,
}

impl ItemKind {
    pub fn initial_status(self) -> ItemStatus {
        match self {
            ItemKind::Consumable => ItemStatus::Unopened,
            ItemKind::Durable => ItemStatus::Available,
        }
    }

    /// Over-use strategy for this kind.
    pub fn overuse_policy(self) -> OverusePolicy {
        match self {
            ItemKind::Consumable => OverusePolicy::WarnAndClamp,
            ItemKind::Durable => OverusePolicy::Reject,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Consumable => "consumable",
            ItemKind::Durable => "durable",
        }
    }
}

impl core::str::FromStr for ItemKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consumable" => Ok(ItemKind::Consumable),
            "durable" => Ok(ItemKind::Durable),
            other => Err(DomainError::invalid_argument(format!("unknown item kind '{other}'"))),
        }
    }
}

/// Stored lifecycle status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Unopened,
    Opened,
    Depleted,
    Available,
    InUse,
}

impl ItemStatus {
    /// The item kind this status belongs to.
    pub fn kind(self) -> ItemKind {
        match self {
            ItemStatus::Unopened | ItemStatus::Opened | ItemStatus::Depleted => ItemKind::Consumable,
            ItemStatus::Available | ItemStatus::InUse => ItemKind::Durable,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Unopened => "unopened",
            ItemStatus::Opened => "opened",
            ItemStatus::Depleted => "depleted",
            ItemStatus::Available => "available",
            ItemStatus::InUse => "in_use",
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unopened" => Ok(ItemStatus::Unopened),
            "opened" => Ok(ItemStatus::Opened),
            "depleted" => Ok(ItemStatus::Depleted),
            "available" => Ok(ItemStatus::Available),
            "in_use" => Ok(ItemStatus::InUse),
            other => Err(DomainError::invalid_argument(format!("unknown item status '{other}'"))),
        }
    }
}

/// Status shown to users. Durable items get `low_stock`/`depleted` projected
/// from their quantity; nothing here is ever stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Unopened,
    Opened,
    Depleted,
    Available,
    InUse,
    LowStock,
}

/// Descriptive attributes. Opaque to the ledger apart from the references,
/// which collaborators validate before an item is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttributes {
    pub category_id: CategoryId,
    pub brand_id: Option<BrandId>,
    pub name: String,
    pub color: Option<String>,
    pub unit_price: Option<Decimal>,
    pub purchased_on: Option<NaiveDate>,
}

/// A trackable unit of inventory.
///
/// Quantity and status fields are crate-private: the only way to change them
/// is through the ledger and lifecycle decisions in this crate, so the stored
/// balance cannot drift from the usage log through some side door.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockItem {
    pub(crate) id: StockItemId,
    pub(crate) owner_id: OwnerId,
    pub(crate) kind: ItemKind,
    pub(crate) attributes: ItemAttributes,
    pub(crate) total_quantity: Quantity,
    pub(crate) remaining_quantity: Quantity,
    pub(crate) status: ItemStatus,
    pub(crate) low_stock_threshold: Option<Quantity>,
    pub(crate) replacement_cycle_days: Option<u32>,
    pub(crate) opened_at: Option<DateTime<Utc>>,
    pub(crate) depleted_at: Option<DateTime<Utc>>,
    pub(crate) in_use_since: Option<DateTime<Utc>>,
    pub(crate) last_replaced_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Flat persisted form of a [`StockItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItemRecord {
    pub id: StockItemId,
    pub owner_id: OwnerId,
    pub kind: ItemKind,
    pub attributes: ItemAttributes,
    pub total_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: ItemStatus,
    pub low_stock_threshold: Option<Quantity>,
    pub replacement_cycle_days: Option<u32>,
    pub opened_at: Option<DateTime<Utc>>,
    pub depleted_at: Option<DateTime<Utc>>,
    pub in_use_since: Option<DateTime<Utc>>,
    pub last_replaced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Rebuild an item from storage, checking the at-rest invariants.
    pub fn rehydrate(record: StockItemRecord) -> DomainResult<Self> {
        if record.remaining_quantity > record.total_quantity {
            return Err(DomainError::invariant(format!(
                "item {}: remaining {} exceeds total {}",
                record.id, record.remaining_quantity, record.total_quantity
            )));
        }
        if record.status.kind() != record.kind {
            return Err(DomainError::invariant(format!(
                "item {}: status '{}' is not valid for {} items",
                record.id,
                record.status,
                record.kind.as_str()
            )));
        }

        Ok(Self {
            id: record.id,
            owner_id: record.owner_id,
            kind: record.kind,
            attributes: record.attributes,
            total_quantity: record.total_quantity,
            remaining_quantity: record.remaining_quantity,
            status: record.status,
            low_stock_threshold: record.low_stock_threshold,
            replacement_cycle_days: record.replacement_cycle_days,
            opened_at: record.opened_at,
            depleted_at: record.depleted_at,
            in_use_since: record.in_use_since,
            last_replaced_at: record.last_replaced_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn to_record(&self) -> StockItemRecord {
        StockItemRecord {
            id: self.id,
            owner_id: self.owner_id,
            kind: self.kind,
            attributes: self.attributes.clone(),
            total_quantity: self.total_quantity,
            remaining_quantity: self.remaining_quantity,
            status: self.status,
            low_stock_threshold: self.low_stock_threshold,
            replacement_cycle_days: self.replacement_cycle_days,
            opened_at: self.opened_at,
            depleted_at: self.depleted_at,
            in_use_since: self.in_use_since,
            last_replaced_at: self.last_replaced_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id_typed(&self) -> StockItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn attributes(&self) -> &ItemAttributes {
        &self.attributes
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn low_stock_threshold(&self) -> Option<Quantity> {
        self.low_stock_threshold
    }

    pub fn replacement_cycle_days(&self) -> Option<u32> {
        self.replacement_cycle_days
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    pub fn depleted_at(&self) -> Option<DateTime<Utc>> {
        self.depleted_at
    }

    pub fn in_use_since(&self) -> Option<DateTime<Utc>> {
        self.in_use_since
    }

    pub fn last_replaced_at(&self) -> Option<DateTime<Utc>> {
        self.last_replaced_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when a threshold is configured and the remaining amount is under it.
    pub fn is_below_threshold(&self) -> bool {
        self.low_stock_threshold
            .is_some_and(|t| self.remaining_quantity < t)
    }

    pub fn display_status(&self) -> DisplayStatus {
        match self.status {
            ItemStatus::Unopened => DisplayStatus::Unopened,
            ItemStatus::Opened => DisplayStatus::Opened,
            ItemStatus::Depleted => DisplayStatus::Depleted,
            ItemStatus::Available | ItemStatus::InUse => {
                if self.remaining_quantity.is_zero() {
                    DisplayStatus::Depleted
                } else if self.is_below_threshold() {
                    DisplayStatus::LowStock
                } else if self.status == ItemStatus::InUse {
                    DisplayStatus::InUse
                } else {
                    DisplayStatus::Available
                }
            }
        }
    }

    pub(crate) fn ensure_kind(&self, expected: ItemKind, action: &str) -> DomainResult<()> {
        if self.kind != expected {
            return Err(DomainError::wrong_kind(format!(
                "'{action}' applies to {} items, item {} is {}",
                expected.as_str(),
                self.id,
                self.kind.as_str()
            )));
        }
        Ok(())
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Entity for StockItem {
    type Id = StockItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn item(kind: ItemKind, total: u32) -> StockItem {
        let now = Utc::now();
        StockItem {
            id: StockItemId::new(),
            owner_id: OwnerId::new(),
            kind,
            attributes: ItemAttributes {
                category_id: CategoryId::new(),
                brand_id: None,
                name: "PLA Galaxy Black".to_string(),
                color: Some("black".to_string()),
                unit_price: None,
                purchased_on: None,
            },
            total_quantity: Quantity::from_units(total),
            remaining_quantity: Quantity::from_units(total),
            status: kind.initial_status(),
            low_stock_threshold: None,
            replacement_cycle_days: None,
            opened_at: None,
            depleted_at: None,
            in_use_since: None,
            last_replaced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_remaining(mut item: StockItem, remaining: u32) -> StockItem {
        item.remaining_quantity = Quantity::from_units(remaining);
        item
    }

    pub fn with_status(mut item: StockItem, status: ItemStatus) -> StockItem {
        item.status = status;
        item
    }

    pub fn with_threshold(mut item: StockItem, threshold: u32) -> StockItem {
        item.low_stock_threshold = Some(Quantity::from_units(threshold));
        item
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn rehydrate_round_trips_record() {
        let original = item(ItemKind::Consumable, 1000);
        let restored = StockItem::rehydrate(original.to_record()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn rehydrate_rejects_remaining_above_total() {
        let mut record = item(ItemKind::Consumable, 100).to_record();
        record.remaining_quantity = Quantity::from_units(101);
        assert!(matches!(
            StockItem::rehydrate(record),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn rehydrate_rejects_status_of_other_kind() {
        let mut record = item(ItemKind::Durable, 3).to_record();
        record.status = ItemStatus::Opened;
        assert!(matches!(
            StockItem::rehydrate(record),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn durable_display_status_projects_quantity() {
        let base = with_threshold(item(ItemKind::Durable, 10), 3);
        assert_eq!(base.display_status(), DisplayStatus::Available);
        assert_eq!(with_remaining(base.clone(), 2).display_status(), DisplayStatus::LowStock);
        assert_eq!(with_remaining(base.clone(), 0).display_status(), DisplayStatus::Depleted);

        let in_use = with_status(base, ItemStatus::InUse);
        assert_eq!(in_use.display_status(), DisplayStatus::InUse);
        assert_eq!(with_remaining(in_use, 1).display_status(), DisplayStatus::LowStock);
    }

    #[test]
    fn consumable_display_status_is_stored_status() {
        let low = with_remaining(with_threshold(item(ItemKind::Consumable, 1000), 100), 50);
        assert_eq!(low.display_status(), DisplayStatus::Unopened);
    }

    #[test]
    fn status_strings_parse_back() {
        for status in [
            ItemStatus::Unopened,
            ItemStatus::Opened,
            ItemStatus::Depleted,
            ItemStatus::Available,
            ItemStatus::InUse,
        ] {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), status);
        }
        assert!("broken".parse::<ItemStatus>().is_err());
    }
}
