//! Lifecycle state machine.
//!
//! Consumable: `unopened -> opened -> depleted -> opened (restore)`.
//! Durable: `available <-> in_use`, where a completed session is logged as a
//! usage event unless the item was already empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Quantity, UsageEventId};

use crate::item::{ItemKind, ItemStatus, StockItem};
use crate::usage::UsageEvent;

/// Stock consumed by one durable in-use session.
pub const SESSION_USAGE_UNITS: u32 = 1;

/// Explicit status-change request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Open,
    Deplete,
    Restore,
    #[serde(alias = "startUse")]
    StartUse,
    #[serde(alias = "stopUse")]
    StopUse,
}

impl LifecycleAction {
    /// Kind of item this action applies to.
    pub fn kind(self) -> ItemKind {
        match self {
            LifecycleAction::Open | LifecycleAction::Deplete | LifecycleAction::Restore => {
                ItemKind::Consumable
            }
            LifecycleAction::StartUse | LifecycleAction::StopUse => ItemKind::Durable,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleAction::Open => "open",
            LifecycleAction::Deplete => "deplete",
            LifecycleAction::Restore => "restore",
            LifecycleAction::StartUse => "start_use",
            LifecycleAction::StopUse => "stop_use",
        }
    }
}

/// Result of a transition. `session` is the usage event written by `stop_use`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub item: StockItem,
    pub session: Option<UsageEvent>,
}

/// Decide `action` against `item`.
///
/// `session_id` is only used by `stop_use`.
pub fn transition(
    item: &StockItem,
    action: LifecycleAction,
    session_id: UsageEventId,
    now: DateTime<Utc>,
) -> DomainResult<TransitionOutcome> {
    item.ensure_kind(action.kind(), action.as_str())?;

    let mut next = item.clone();
    let mut session = None;

    match action {
        LifecycleAction::Open => {
            require_status(item, action, ItemStatus::Unopened)?;
            next.status = ItemStatus::Opened;
            next.opened_at = Some(now);
        }
        LifecycleAction::Deplete => {
            require_status(item, action, ItemStatus::Opened)?;
            next.status = ItemStatus::Depleted;
            next.depleted_at = Some(now);
            next.remaining_quantity = Quantity::ZERO;
        }
        LifecycleAction::Restore => {
            require_status(item, action, ItemStatus::Depleted)?;
            next.status = ItemStatus::Opened;
            next.depleted_at = None;
        }
        LifecycleAction::StartUse => {
            require_status(item, action, ItemStatus::Available)?;
            let needed = Quantity::from_units(SESSION_USAGE_UNITS);
            item.kind
                .overuse_policy()
                .evaluate(needed.value(), item.remaining_quantity)?;
            next.status = ItemStatus::InUse;
            next.in_use_since = Some(now);
        }
        LifecycleAction::StopUse => {
            require_status(item, action, ItemStatus::InUse)?;
            // A session can always be closed: if other usage drained the item
            // mid-session, log what is left, or nothing once it is empty.
            let amount = Quantity::from_units(SESSION_USAGE_UNITS).min(item.remaining_quantity);

            if !amount.is_zero() {
                let note = item.in_use_since.map(|since| {
                    format!("in use from {} to {}", since.to_rfc3339(), now.to_rfc3339())
                });
                session = Some(UsageEvent::new(session_id, item, amount, now, note, now));
            }

            next.status = ItemStatus::Available;
            next.in_use_since = None;
            next.remaining_quantity = item.remaining_quantity.saturating_sub(amount);
        }
    }

    next.touch(now);
    Ok(TransitionOutcome {
        item: next,
        session,
    })
}

/// Restart the replacement cycle.
pub fn mark_replaced(item: &StockItem, at: DateTime<Utc>, now: DateTime<Utc>) -> DomainResult<StockItem> {
    if at > now {
        return Err(DomainError::invalid_argument(
            "replacement date cannot be in the future",
        ));
    }
    let mut next = item.clone();
    next.last_replaced_at = Some(at);
    next.touch(now);
    Ok(next)
}

/// Deleting an in-use item would orphan its open session.
pub fn ensure_deletable(item: &StockItem) -> DomainResult<()> {
    if item.status == ItemStatus::InUse {
        return Err(DomainError::invalid_transition(format!(
            "item {} is in use; stop using it before deleting",
            item.id
        )));
    }
    Ok(())
}

fn require_status(item: &StockItem, action: LifecycleAction, expected: ItemStatus) -> DomainResult<()> {
    if item.status != expected {
        return Err(DomainError::invalid_transition(format!(
            "cannot {} item {}: status is '{}', expected '{}'",
            action.as_str(),
            item.id,
            item.status,
            expected
        )));
    }
    Ok(())
}
