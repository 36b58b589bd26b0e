//! Alert projector: read-time "needs attention" entries.
//!
//! Pure and recomputed per request; nothing here is stored.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use stockledger_core::{Quantity, StockItemId};

use crate::item::StockItem;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LowStockLevel {
    BelowThreshold,
    Depleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertKind {
    LowStock {
        level: LowStockLevel,
        remaining: Quantity,
        threshold: Quantity,
    },
    ReplacementDue {
        last_replaced_at: DateTime<Utc>,
        cycle_days: u32,
        days_since: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub item_id: StockItemId,
    pub item_name: String,
    #[serde(flatten)]
    pub kind: AlertKind,
    pub message: String,
}

/// Project alerts for `items` as of `now`, ordered by item then kind.
pub fn project_alerts<'a, I>(items: I, now: DateTime<Utc>) -> Vec<Alert>
where
    I: IntoIterator<Item = &'a StockItem>,
{
    let mut items: Vec<&StockItem> = items.into_iter().collect();
    items.sort_by_key(|i| i.id_typed());

    let mut alerts = Vec::new();
    for item in items {
        alerts.extend(low_stock_alert(item));
        alerts.extend(replacement_alert(item, now));
    }
    alerts
}

/// Present when a threshold is set and the item is under it or empty.
pub fn low_stock_alert(item: &StockItem) -> Option<Alert> {
    let threshold = item.low_stock_threshold()?;
    let remaining = item.remaining_quantity();

    let level = if remaining.is_zero() {
        LowStockLevel::Depleted
    } else if remaining < threshold {
        LowStockLevel::BelowThreshold
    } else {
        return None;
    };

    let name = &item.attributes().name;
    let message = match level {
        LowStockLevel::Depleted => format!("{name} is depleted"),
        LowStockLevel::BelowThreshold => {
            format!("{name} is below its low-stock threshold ({remaining} left, threshold {threshold})")
        }
    };

    Some(Alert {
        item_id: item.id_typed(),
        item_name: name.clone(),
        kind: AlertKind::LowStock {
            level,
            remaining,
            threshold,
        },
        message,
    })
}

/// Present when a replacement cycle is set and at least that many days have
/// passed since the last replacement.
pub fn replacement_alert(item: &StockItem, now: DateTime<Utc>) -> Option<Alert> {
    let cycle_days = item.replacement_cycle_days()?;
    let last = item.last_replaced_at()?;

    let elapsed = now - last;
    if elapsed < Duration::days(i64::from(cycle_days)) {
        return None;
    }

    let days_since = elapsed.num_days();
    let name = &item.attributes().name;
    Some(Alert {
        item_id: item.id_typed(),
        item_name: name.clone(),
        kind: AlertKind::ReplacementDue {
            last_replaced_at: last,
            cycle_days,
            days_since,
        },
        message: format!(
            "{name} is due for replacement ({days_since} days since last replacement, cycle {cycle_days} days)"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::test_support::*;
    use crate::item::ItemKind;

    fn with_cycle(mut item: StockItem, days: u32, last: DateTime<Utc>) -> StockItem {
        item.replacement_cycle_days = Some(days);
        item.last_replaced_at = Some(last);
        item
    }

    #[test]
    fn no_threshold_no_low_stock_alert() {
        let empty = with_remaining(item(ItemKind::Consumable, 1000), 0);
        assert!(low_stock_alert(&empty).is_none());
    }

    #[test]
    fn below_threshold_and_depleted_are_distinguished() {
        let base = with_threshold(item(ItemKind::Consumable, 1000), 100);
        assert!(low_stock_alert(&base).is_none());
        assert!(low_stock_alert(&with_remaining(base.clone(), 100)).is_none());

        let low = low_stock_alert(&with_remaining(base.clone(), 99)).unwrap();
        assert!(matches!(
            low.kind,
            AlertKind::LowStock {
                level: LowStockLevel::BelowThreshold,
                ..
            }
        ));

        let empty = low_stock_alert(&with_remaining(base, 0)).unwrap();
        assert!(matches!(
            empty.kind,
            AlertKind::LowStock {
                level: LowStockLevel::Depleted,
                ..
            }
        ));
        assert!(empty.message.ends_with("is depleted"));
    }

    #[test]
    fn zero_threshold_still_flags_empty_items() {
        let item = with_remaining(with_threshold(item(ItemKind::Durable, 4), 0), 0);
        assert!(low_stock_alert(&item).is_some());
    }

    #[test]
    fn replacement_due_at_exact_cycle_boundary() {
        let now = Utc::now();
        let due = with_cycle(item(ItemKind::Durable, 1), 30, now - Duration::days(30));
        let alert = replacement_alert(&due, now).unwrap();
        assert!(matches!(
            alert.kind,
            AlertKind::ReplacementDue {
                cycle_days: 30,
                days_since: 30,
                ..
            }
        ));

        let not_yet = with_cycle(item(ItemKind::Durable, 1), 30, now - Duration::days(29));
        assert!(replacement_alert(&not_yet, now).is_none());
    }

    #[test]
    fn replacement_requires_last_replaced() {
        let mut item = item(ItemKind::Durable, 1);
        item.replacement_cycle_days = Some(1);
        assert!(replacement_alert(&item, Utc::now()).is_none());
    }

    #[test]
    fn one_item_can_raise_both_alerts() {
        let now = Utc::now();
        let item = with_cycle(
            with_remaining(with_threshold(item(ItemKind::Durable, 5), 2), 1),
            7,
            now - Duration::days(10),
        );
        let alerts = project_alerts([&item], now);
        assert_eq!(alerts.len(), 2);
        assert!(matches!(alerts[0].kind, AlertKind::LowStock { .. }));
        assert!(matches!(alerts[1].kind, AlertKind::ReplacementDue { .. }));
    }

    #[test]
    fn alert_serializes_flat_with_type() {
        let item = with_remaining(with_threshold(item(ItemKind::Consumable, 1000), 100), 0);
        let json = serde_json::to_value(low_stock_alert(&item).unwrap()).unwrap();
        assert_eq!(json["type"], "low_stock");
        assert_eq!(json["level"], "depleted");
        assert_eq!(json["item_name"], "PLA Galaxy Black");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: low-stock alert iff threshold set and (remaining < threshold or remaining == 0).
            #[test]
            fn low_stock_alert_iff_condition(
                remaining in 0u32..200,
                threshold in proptest::option::of(0u32..200),
            ) {
                let mut item = with_remaining(item(ItemKind::Consumable, 200), remaining);
                if let Some(t) = threshold {
                    item = with_threshold(item, t);
                }
                let expected = threshold.is_some_and(|t| remaining < t || remaining == 0);
                prop_assert_eq!(low_stock_alert(&item).is_some(), expected);
            }

            /// Property: replacement alert iff elapsed >= cycle days.
            #[test]
            fn replacement_alert_iff_cycle_elapsed(cycle in 1u32..365, elapsed_hours in 0i64..(400 * 24)) {
                let now = Utc::now();
                let item = with_cycle(item(ItemKind::Durable, 1), cycle, now - Duration::hours(elapsed_hours));
                let expected = elapsed_hours >= i64::from(cycle) * 24;
                prop_assert_eq!(replacement_alert(&item, now).is_some(), expected);
            }
        }
    }
}
