//! Service wiring: which store/catalog pair backs the ledger.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;

use stockledger_core::{CategoryId, OwnerId, StockItemId, UsageEventId};
use stockledger_infra::{
    run_migrations, BatchRequest, InMemoryLedgerStore, InMemoryReferenceCatalog, LedgerConfig,
    LedgerResult, PostgresLedgerStore, PostgresReferenceCatalog, StockLedger,
};
use stockledger_inventory::{
    Alert, ItemKind, LifecycleAction, NewUsage, StockItem, TransitionOutcome, UsageEvent, UsageOutcome,
    UsagePatch,
};

use crate::config::ApiConfig;

type InMemoryLedger = StockLedger<Arc<InMemoryLedgerStore>, Arc<InMemoryReferenceCatalog>>;
type PersistentLedger = StockLedger<PostgresLedgerStore, PostgresReferenceCatalog>;

pub enum AppServices {
    InMemory {
        ledger: InMemoryLedger,
        catalog: Arc<InMemoryReferenceCatalog>,
    },
    Persistent {
        ledger: PersistentLedger,
    },
}

/// Run the same call against whichever ledger is configured.
macro_rules! with_ledger {
    ($services:expr, |$ledger:ident| $body:expr) => {
        match $services {
            AppServices::InMemory { ledger: $ledger, .. } => $body,
            AppServices::Persistent { ledger: $ledger } => $body,
        }
    };
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            if config.dev_seed_owner.is_some() {
                tracing::warn!("DEV_SEED_OWNER ignored with postgres stores");
            }
            AppServices::persistent(url, config.ledger).await
        }
        None => {
            let services = AppServices::in_memory(config.ledger);
            if let Some(owner_id) = config.dev_seed_owner {
                services.seed_dev_catalog(owner_id)?;
            }
            Ok(services)
        }
    }
}

impl AppServices {
    pub fn in_memory(config: LedgerConfig) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let catalog = Arc::new(InMemoryReferenceCatalog::new());
        tracing::info!("using in-memory stores");
        AppServices::InMemory {
            ledger: StockLedger::new(store, catalog.clone(), config),
            catalog,
        }
    }

    pub async fn persistent(database_url: &str, config: LedgerConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        run_migrations(&pool).await?;
        tracing::info!("using postgres stores");

        Ok(AppServices::Persistent {
            ledger: StockLedger::new(
                PostgresLedgerStore::new(pool.clone()),
                PostgresReferenceCatalog::new(pool),
                config,
            ),
        })
    }

    /// Reference data for the in-memory backend; categories and brands are
    /// otherwise owned by the taxonomy service.
    pub fn in_memory_catalog(&self) -> Option<&Arc<InMemoryReferenceCatalog>> {
        match self {
            AppServices::InMemory { catalog, .. } => Some(catalog),
            AppServices::Persistent { .. } => None,
        }
    }

    /// Give `owner_id` one consumable and one durable category so the
    /// in-memory backend is usable without a taxonomy service.
    pub fn seed_dev_catalog(&self, owner_id: OwnerId) -> anyhow::Result<Vec<(ItemKind, CategoryId)>> {
        let catalog = self
            .in_memory_catalog()
            .context("dev catalog seeding needs in-memory stores")?;

        let mut seeded = Vec::new();
        for kind in [ItemKind::Consumable, ItemKind::Durable] {
            let category_id = catalog.add_category(owner_id, kind)?;
            tracing::info!(owner_id = %owner_id, %category_id, kind = kind.as_str(), "seeded dev category");
            seeded.push((kind, category_id));
        }
        Ok(seeded)
    }

    pub async fn create_batch(
        &self,
        owner_id: OwnerId,
        request: BatchRequest,
    ) -> LedgerResult<Vec<StockItem>> {
        with_ledger!(self, |l| l.create_batch(owner_id, request).await)
    }

    pub async fn list_items(&self, owner_id: OwnerId) -> LedgerResult<Vec<StockItem>> {
        with_ledger!(self, |l| l.list_items(owner_id).await)
    }

    pub async fn get_item(&self, owner_id: OwnerId, item_id: StockItemId) -> LedgerResult<StockItem> {
        with_ledger!(self, |l| l.get_item(owner_id, item_id).await)
    }

    pub async fn delete_item(&self, owner_id: OwnerId, item_id: StockItemId) -> LedgerResult<()> {
        with_ledger!(self, |l| l.delete_item(owner_id, item_id).await)
    }

    pub async fn transition_status(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
        action: LifecycleAction,
    ) -> LedgerResult<TransitionOutcome> {
        with_ledger!(self, |l| l.transition_status(owner_id, item_id, action).await)
    }

    pub async fn mark_replaced(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
        at: Option<DateTime<Utc>>,
    ) -> LedgerResult<StockItem> {
        with_ledger!(self, |l| l.mark_replaced(owner_id, item_id, at).await)
    }

    pub async fn record_usage(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
        usage: NewUsage,
    ) -> LedgerResult<UsageOutcome> {
        with_ledger!(self, |l| l.record_usage(owner_id, item_id, usage).await)
    }

    pub async fn list_usage(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> LedgerResult<Vec<UsageEvent>> {
        with_ledger!(self, |l| l.list_usage(owner_id, item_id).await)
    }

    pub async fn update_usage(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
        patch: UsagePatch,
    ) -> LedgerResult<UsageOutcome> {
        with_ledger!(self, |l| l.update_usage(owner_id, event_id, patch).await)
    }

    pub async fn delete_usage(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
    ) -> LedgerResult<StockItem> {
        with_ledger!(self, |l| l.delete_usage(owner_id, event_id).await)
    }

    pub async fn get_alerts(&self, owner_id: OwnerId) -> LedgerResult<Vec<Alert>> {
        with_ledger!(self, |l| l.get_alerts(owner_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dev_seed_registers_one_category_per_kind() {
        let services = AppServices::in_memory(LedgerConfig::default());
        let owner = OwnerId::new();
        let seeded = services.seed_dev_catalog(owner).unwrap();
        assert_eq!(seeded.len(), 2);

        let (_, durable) = seeded[1];
        let request = BatchRequest {
            attributes: stockledger_inventory::ItemAttributes {
                category_id: durable,
                brand_id: None,
                name: "0.4mm brass nozzle".to_string(),
                color: None,
                unit_price: None,
                purchased_on: None,
            },
            quantity_per_unit: rust_decimal::Decimal::ONE,
            low_stock_threshold: None,
            replacement_cycle_days: None,
            last_replaced_at: None,
            quantity: 3,
        };
        let items = services.create_batch(owner, request).await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.kind() == ItemKind::Durable));
    }
}
