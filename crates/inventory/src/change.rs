//! Write sets produced by ledger decisions.
//!
//! A decision never touches storage itself. It returns a `LedgerChange`
//! that the store applies inside one transaction, so the usage row and the
//! item balance always land together.

use stockledger_core::{StockItemId, UsageEventId};

use crate::item::StockItem;
use crate::usage::UsageEvent;

/// Mutation of the usage table that accompanies an item write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageWrite {
    Insert(UsageEvent),
    Replace(UsageEvent),
    Remove(UsageEventId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerChange {
    /// Overwrite the item's mutable fields, plus at most one usage row write.
    Update {
        item: StockItem,
        usage: Option<UsageWrite>,
    },
    /// Delete the item together with all of its usage events.
    Remove { item_id: StockItemId },
}

impl LedgerChange {
    pub fn item(item: StockItem) -> Self {
        LedgerChange::Update { item, usage: None }
    }

    pub fn item_with_usage(item: StockItem, usage: UsageWrite) -> Self {
        LedgerChange::Update {
            item,
            usage: Some(usage),
        }
    }

    pub fn remove(item_id: StockItemId) -> Self {
        LedgerChange::Remove { item_id }
    }
}
