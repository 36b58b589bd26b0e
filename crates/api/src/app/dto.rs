use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{BrandId, CategoryId};
use stockledger_infra::BatchRequest;
use stockledger_inventory::{
    DisplayStatus, ItemAttributes, LifecycleAction, NewUsage, StockItem, TransitionOutcome,
    UsageEvent, UsageOutcome, UsagePatch, UsageWarning,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub category_id: CategoryId,
    pub brand_id: Option<BrandId>,
    pub name: String,
    pub color: Option<String>,
    pub unit_price: Option<Decimal>,
    pub purchased_on: Option<NaiveDate>,
    pub quantity_per_unit: Decimal,
    pub low_stock_threshold: Option<Decimal>,
    pub replacement_cycle_days: Option<u32>,
    pub last_replaced_at: Option<DateTime<Utc>>,
    /// How many identical items to create.
    pub quantity: i64,
}

impl From<CreateBatchRequest> for BatchRequest {
    fn from(body: CreateBatchRequest) -> Self {
        BatchRequest {
            attributes: ItemAttributes {
                category_id: body.category_id,
                brand_id: body.brand_id,
                name: body.name,
                color: body.color,
                unit_price: body.unit_price,
                purchased_on: body.purchased_on,
            },
            quantity_per_unit: body.quantity_per_unit,
            low_stock_threshold: body.low_stock_threshold,
            replacement_cycle_days: body.replacement_cycle_days,
            last_replaced_at: body.last_replaced_at,
            quantity: body.quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    pub amount: Decimal,
    /// Defaults to now.
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl RecordUsageRequest {
    pub fn into_usage(self, now: DateTime<Utc>) -> NewUsage {
        NewUsage {
            amount: self.amount,
            occurred_at: self.occurred_at.unwrap_or(now),
            note: self.note,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUsageRequest {
    pub amount: Option<Decimal>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl From<UpdateUsageRequest> for UsagePatch {
    fn from(body: UpdateUsageRequest) -> Self {
        UsagePatch {
            amount: body.amount,
            occurred_at: body.occurred_at,
            note: body.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub action: LifecycleAction,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkReplacedRequest {
    pub at: Option<DateTime<Utc>>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Stored item plus its projected display status.
#[derive(Debug, Serialize)]
pub struct ItemView<'a> {
    #[serde(flatten)]
    pub item: &'a StockItem,
    pub display_status: DisplayStatus,
}

impl<'a> From<&'a StockItem> for ItemView<'a> {
    fn from(item: &'a StockItem) -> Self {
        Self {
            item,
            display_status: item.display_status(),
        }
    }
}

pub fn item_views(items: &[StockItem]) -> Vec<ItemView<'_>> {
    items.iter().map(ItemView::from).collect()
}

#[derive(Debug, Serialize)]
pub struct UsageOutcomeView<'a> {
    pub item: ItemView<'a>,
    pub event: &'a UsageEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'a UsageWarning>,
}

impl<'a> From<&'a UsageOutcome> for UsageOutcomeView<'a> {
    fn from(outcome: &'a UsageOutcome) -> Self {
        Self {
            item: ItemView::from(&outcome.item),
            event: &outcome.event,
            warning: outcome.warning.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransitionView<'a> {
    pub item: ItemView<'a>,
    pub session_event: Option<&'a UsageEvent>,
}

impl<'a> From<&'a TransitionOutcome> for TransitionView<'a> {
    fn from(outcome: &'a TransitionOutcome) -> Self {
        Self {
            item: ItemView::from(&outcome.item),
            session_event: outcome.session.as_ref(),
        }
    }
}
