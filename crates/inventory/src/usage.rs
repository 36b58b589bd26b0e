//! Usage events and the decisions that keep an item's running balance in step
//! with them.
//!
//! The balance is stored, not replayed: every decision here takes the current
//! item, computes the new balance incrementally, and hands back the updated
//! item plus the event row so the store can write both in one unit of work.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, OwnerId, Quantity, StockItemId, UsageEventId};

use crate::item::{ItemKind, ItemStatus, StockItem};
use crate::policy::UsageWarning;

/// One consumption record against exactly one stock item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEvent {
    pub(crate) id: UsageEventId,
    pub(crate) owner_id: OwnerId,
    pub(crate) item_id: StockItemId,
    pub(crate) amount: Quantity,
    pub(crate) occurred_at: DateTime<Utc>,
    pub(crate) note: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Flat persisted form of a [`UsageEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEventRecord {
    pub id: UsageEventId,
    pub owner_id: OwnerId,
    pub item_id: StockItemId,
    pub amount: Quantity,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UsageEvent {
    pub fn rehydrate(record: UsageEventRecord) -> DomainResult<Self> {
        if record.amount.is_zero() {
            return Err(DomainError::invariant(format!(
                "usage event {} has a zero amount",
                record.id
            )));
        }
        Ok(Self {
            id: record.id,
            owner_id: record.owner_id,
            item_id: record.item_id,
            amount: record.amount,
            occurred_at: record.occurred_at,
            note: record.note,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn to_record(&self) -> UsageEventRecord {
        UsageEventRecord {
            id: self.id,
            owner_id: self.owner_id,
            item_id: self.item_id,
            amount: self.amount,
            occurred_at: self.occurred_at,
            note: self.note.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn id_typed(&self) -> UsageEventId {
        self.id
    }

    pub fn item_id(&self) -> StockItemId {
        self.item_id
    }

    pub fn amount(&self) -> Quantity {
        self.amount
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn new(
        id: UsageEventId,
        item: &StockItem,
        amount: Quantity,
        occurred_at: DateTime<Utc>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id: item.owner_id,
            item_id: item.id,
            amount,
            occurred_at,
            note: normalize_note(note),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for UsageEvent {
    type Id = UsageEventId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

/// Input for recording a new usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUsage {
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Partial edit of an existing usage. `None` leaves a field unchanged; an
/// empty note clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsagePatch {
    pub amount: Option<Decimal>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Result of recording or revising a usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageOutcome {
    pub item: StockItem,
    pub event: UsageEvent,
    pub warning: Option<UsageWarning>,
}

/// Decide a new usage against `item`.
pub fn record_usage(
    item: &StockItem,
    event_id: UsageEventId,
    usage: NewUsage,
    now: DateTime<Utc>,
) -> DomainResult<UsageOutcome> {
    let amount = Quantity::positive(usage.amount, "amount")?;
    let warning = item
        .kind
        .overuse_policy()
        .evaluate(amount.value(), item.remaining_quantity)?;

    let mut next = item.clone();
    next.remaining_quantity = item.remaining_quantity.saturating_sub(amount);
    mark_consumed(&mut next, now);
    next.touch(now);

    let event = UsageEvent::new(event_id, item, amount, usage.occurred_at, usage.note, now);

    Ok(UsageOutcome {
        item: next,
        event,
        warning,
    })
}

/// Decide an edit of `event`. The over-use check runs against the change in
/// amount, not the new absolute amount.
pub fn revise_usage(
    item: &StockItem,
    event: &UsageEvent,
    patch: UsagePatch,
    now: DateTime<Utc>,
) -> DomainResult<UsageOutcome> {
    ensure_parent(item, event)?;

    let new_amount = match patch.amount {
        Some(a) => Quantity::positive(a, "amount")?,
        None => event.amount,
    };
    let delta = new_amount.value() - event.amount.value();

    let warning = item
        .kind
        .overuse_policy()
        .evaluate(delta, item.remaining_quantity)?;

    let mut next = item.clone();
    if !delta.is_zero() {
        next.remaining_quantity = item
            .remaining_quantity
            .apply_delta(delta, item.total_quantity);
        if delta > Decimal::ZERO {
            mark_consumed(&mut next, now);
        }
        next.touch(now);
    }

    let mut revised = event.clone();
    revised.amount = new_amount;
    if let Some(at) = patch.occurred_at {
        revised.occurred_at = at;
    }
    if let Some(note) = patch.note {
        revised.note = normalize_note(Some(note));
    }
    revised.updated_at = now;

    Ok(UsageOutcome {
        item: next,
        event: revised,
        warning,
    })
}

/// Decide the removal of `event`: its amount flows back to the item, never
/// past the original total.
pub fn remove_usage(item: &StockItem, event: &UsageEvent, now: DateTime<Utc>) -> DomainResult<StockItem> {
    ensure_parent(item, event)?;

    let mut next = item.clone();
    next.remaining_quantity = item
        .remaining_quantity
        .add_capped(event.amount, item.total_quantity);
    next.touch(now);
    Ok(next)
}

fn ensure_parent(item: &StockItem, event: &UsageEvent) -> DomainResult<()> {
    if event.item_id != item.id || event.owner_id != item.owner_id {
        return Err(DomainError::invariant(format!(
            "usage event {} does not belong to item {}",
            event.id, item.id
        )));
    }
    Ok(())
}

/// Consumables advance on their own when used: first use opens them, hitting
/// zero depletes them.
fn mark_consumed(item: &mut StockItem, now: DateTime<Utc>) {
    if item.kind != ItemKind::Consumable {
        return;
    }
    if item.status == ItemStatus::Unopened {
        item.status = ItemStatus::Opened;
        item.opened_at = Some(now);
    }
    if item.remaining_quantity.is_zero() && item.status != ItemStatus::Depleted {
        item.status = ItemStatus::Depleted;
        item.depleted_at = Some(now);
    }
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
