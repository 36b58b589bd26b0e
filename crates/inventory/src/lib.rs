//! Stock ledger domain module.
//!
//! This crate contains the business rules for stock items, usage events, the
//! lifecycle state machine and alert projection, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod alerts;
pub mod batch;
pub mod change;
pub mod item;
pub mod lifecycle;
pub mod policy;
pub mod usage;

pub use alerts::{project_alerts, Alert, AlertKind, LowStockLevel};
pub use batch::{create_batch, NewBatch, DEFAULT_MAX_BATCH_SIZE};
pub use change::{LedgerChange, UsageWrite};
pub use item::{DisplayStatus, ItemAttributes, ItemKind, ItemStatus, StockItem, StockItemRecord};
pub use lifecycle::{
    ensure_deletable, mark_replaced, transition, LifecycleAction, TransitionOutcome,
    SESSION_USAGE_UNITS,
};
pub use policy::{OverusePolicy, UsageWarning};
pub use usage::{
    record_usage, remove_usage, revise_usage, NewUsage, UsageEvent, UsageEventRecord,
    UsageOutcome, UsagePatch,
};
