//! Postgres-backed ledger store.
//!
//! ## Error mapping
//!
//! | SQLx error | Code | Ledger error |
//! |------------|------|--------------|
//! | unique violation | `23505` | `Domain(Conflict)` |
//! | check violation | `23514` | `Domain(InvariantViolation)` |
//! | anything else | | `Store(Backend)` |
//!
//! ## Locking
//!
//! Writes lock the item row with `SELECT ... FOR UPDATE` before the decision
//! runs. `update_usage` locks the item first and the event second, the same
//! order a cascading item delete takes, so the two paths cannot deadlock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};
use uuid::Uuid;

use stockledger_core::{
    BrandId, CategoryId, DomainError, DomainResult, OwnerId, Quantity, StockItemId, UsageEventId,
};
use stockledger_inventory::{
    ItemAttributes, ItemKind, ItemStatus, LedgerChange, StockItem, StockItemRecord, UsageEvent,
    UsageEventRecord, UsageWrite,
};

use super::{Decision, LedgerStore, check_change};
use crate::error::{LedgerError, LedgerResult, StoreError};

const MIGRATION: &str = include_str!("../../migrations/0001_stock_ledger.sql");

const ITEM_COLUMNS: &str = r#"
    id, owner_id, category_id, brand_id, kind, name, color, unit_price, purchased_on,
    total_quantity, remaining_quantity, status, low_stock_threshold, replacement_cycle_days,
    opened_at, depleted_at, in_use_since, last_replaced_at, created_at, updated_at
"#;

const USAGE_COLUMNS: &str = "id, owner_id, item_id, amount, occurred_at, note, created_at, updated_at";

/// Apply the bundled schema. Idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(MIGRATION)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("run_migrations", e))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, items), fields(owner_id = %owner_id, item_count = items.len()), err)]
    async fn insert_items(&self, owner_id: OwnerId, items: &[StockItem]) -> LedgerResult<()> {
        let mut tx = self.begin().await?;

        for item in items {
            check_change(owner_id, item.id_typed(), &LedgerChange::item(item.clone()))?;
            insert_item(&mut tx, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, item_id = %item_id), err)]
    async fn get_item(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> Result<Option<StockItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE owner_id = $1 AND id = $2"
        ))
        .bind(owner_id.as_uuid())
        .bind(item_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        row.map(|r| item_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, item_count = tracing::field::Empty), err)]
    async fn list_items(&self, owner_id: OwnerId) -> Result<Vec<StockItem>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE owner_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(owner_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        let items = rows.iter().map(item_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("item_count", items.len());
        Ok(items)
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, event_id = %event_id), err)]
    async fn get_usage(
        &self,
        owner_id: OwnerId,
        event_id: UsageEventId,
    ) -> Result<Option<UsageEvent>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USAGE_COLUMNS} FROM usage_events WHERE owner_id = $1 AND id = $2"
        ))
        .bind(owner_id.as_uuid())
        .bind(event_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_usage", e))?;

        row.map(|r| usage_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, item_id = %item_id), err)]
    async fn list_usage(
        &self,
        owner_id: OwnerId,
        item_id: StockItemId,
    ) -> Result<Vec<UsageEvent>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {USAGE_COLUMNS} FROM usage_events \
             WHERE owner_id = $1 AND item_id = $2 ORDER BY occurred_at ASC, id ASC"
        ))
        .bind(owner_id.as_uuid())
        .bind(item_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_usage", e))?;

        rows.iter().map(usage_from_row).collect()
    }

    #[instrument(skip(self, decide), fields(owner_id = %owner_id, item_id = %item_id), err)]
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
        let mut tx = self.begin().await?;

        let item = lock_item(&mut tx, owner_id, item_id)
            .await?
            .ok_or_else(DomainError::not_found)?;

        let Decision { change, output } = decide(&item)?;
        check_change(owner_id, item_id, &change)?;
        apply_change(&mut tx, owner_id, change).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(output)
    }

    #[instrument(skip(self, decide), fields(owner_id = %owner_id, event_id = %event_id), err)]
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
        let mut tx = self.begin().await?;

        // Unlocked read to learn the parent; the locked re-read below is authoritative.
        let parent: Option<Uuid> =
            sqlx::query("SELECT item_id FROM usage_events WHERE owner_id = $1 AND id = $2")
                .bind(owner_id.as_uuid())
                .bind(event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("find_usage_parent", e))?
                .map(|row| row.try_get("item_id"))
                .transpose()
                .map_err(|e| StoreError::Corrupt(format!("usage_events.item_id: {e}")))?;
        let item_id = StockItemId::from_uuid(parent.ok_or_else(DomainError::not_found)?);

        let item = lock_item(&mut tx, owner_id, item_id)
            .await?
            .ok_or_else(DomainError::not_found)?;

        let row = sqlx::query(&format!(
            "SELECT {USAGE_COLUMNS} FROM usage_events WHERE owner_id = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(owner_id.as_uuid())
        .bind(event_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_usage", e))?;
        let event = row
            .map(|r| usage_from_row(&r))
            .transpose()?
            .filter(|e| e.item_id() == item_id)
            .ok_or_else(DomainError::not_found)?;

        let Decision { change, output } = decide(&item, &event)?;
        check_change(owner_id, item_id, &change)?;
        apply_change(&mut tx, owner_id, change).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(output)
    }
}

async fn lock_item(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: OwnerId,
    item_id: StockItemId,
) -> Result<Option<StockItem>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM stock_items WHERE owner_id = $1 AND id = $2 FOR UPDATE"
    ))
    .bind(owner_id.as_uuid())
    .bind(item_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_item", e))?;

    row.map(|r| item_from_row(&r)).transpose()
}

async fn apply_change(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: OwnerId,
    change: LedgerChange,
) -> LedgerResult<()> {
    match change {
        LedgerChange::Update { item, usage } => {
            match usage {
                Some(UsageWrite::Insert(event)) => insert_usage(tx, &event).await?,
                Some(UsageWrite::Replace(event)) => replace_usage(tx, &event).await?,
                Some(UsageWrite::Remove(event_id)) => {
                    sqlx::query("DELETE FROM usage_events WHERE owner_id = $1 AND id = $2")
                        .bind(owner_id.as_uuid())
                        .bind(event_id.as_uuid())
                        .execute(&mut **tx)
                        .await
                        .map_err(|e| map_write_error("delete_usage", e))?;
                }
                None => {}
            }
            update_item_row(tx, &item).await?;
        }
        LedgerChange::Remove { item_id } => {
            sqlx::query("DELETE FROM stock_items WHERE owner_id = $1 AND id = $2")
                .bind(owner_id.as_uuid())
                .bind(item_id.as_uuid())
                .execute(&mut **tx)
                .await
                .map_err(|e| map_write_error("delete_item", e))?;
        }
    }
    Ok(())
}

async fn insert_item(tx: &mut Transaction<'_, Postgres>, item: &StockItem) -> LedgerResult<()> {
    let r = item.to_record();
    sqlx::query(&format!(
        "INSERT INTO stock_items ({ITEM_COLUMNS}) VALUES \
         ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"
    ))
    .bind(r.id.as_uuid())
    .bind(r.owner_id.as_uuid())
    .bind(r.attributes.category_id.as_uuid())
    .bind(r.attributes.brand_id.map(|b| *b.as_uuid()))
    .bind(r.kind.as_str())
    .bind(&r.attributes.name)
    .bind(&r.attributes.color)
    .bind(r.attributes.unit_price)
    .bind(r.attributes.purchased_on)
    .bind(r.total_quantity.value())
    .bind(r.remaining_quantity.value())
    .bind(r.status.as_str())
    .bind(r.low_stock_threshold.map(|q| q.value()))
    .bind(cycle_days_to_db(r.replacement_cycle_days)?)
    .bind(r.opened_at)
    .bind(r.depleted_at)
    .bind(r.in_use_since)
    .bind(r.last_replaced_at)
    .bind(r.created_at)
    .bind(r.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_write_error("insert_item", e))?;
    Ok(())
}

/// Ledger operations never change attributes or totals, so only the
/// balance and lifecycle columns are written back.
async fn update_item_row(tx: &mut Transaction<'_, Postgres>, item: &StockItem) -> LedgerResult<()> {
    let r = item.to_record();
    sqlx::query(
        r#"
        UPDATE stock_items SET
            remaining_quantity = $3,
            status = $4,
            opened_at = $5,
            depleted_at = $6,
            in_use_since = $7,
            last_replaced_at = $8,
            updated_at = $9
        WHERE owner_id = $1 AND id = $2
        "#,
    )
    .bind(r.owner_id.as_uuid())
    .bind(r.id.as_uuid())
    .bind(r.remaining_quantity.value())
    .bind(r.status.as_str())
    .bind(r.opened_at)
    .bind(r.depleted_at)
    .bind(r.in_use_since)
    .bind(r.last_replaced_at)
    .bind(r.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_write_error("update_item", e))?;
    Ok(())
}

async fn insert_usage(tx: &mut Transaction<'_, Postgres>, event: &UsageEvent) -> LedgerResult<()> {
    let r = event.to_record();
    sqlx::query(&format!(
        "INSERT INTO usage_events ({USAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
    ))
    .bind(r.id.as_uuid())
    .bind(r.owner_id.as_uuid())
    .bind(r.item_id.as_uuid())
    .bind(r.amount.value())
    .bind(r.occurred_at)
    .bind(&r.note)
    .bind(r.created_at)
    .bind(r.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_write_error("insert_usage", e))?;
    Ok(())
}

async fn replace_usage(tx: &mut Transaction<'_, Postgres>, event: &UsageEvent) -> LedgerResult<()> {
    let r = event.to_record();
    let result = sqlx::query(
        r#"
        UPDATE usage_events SET amount = $3, occurred_at = $4, note = $5, updated_at = $6
        WHERE owner_id = $1 AND id = $2
        "#,
    )
    .bind(r.owner_id.as_uuid())
    .bind(r.id.as_uuid())
    .bind(r.amount.value())
    .bind(r.occurred_at)
    .bind(&r.note)
    .bind(r.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_write_error("replace_usage", e))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::not_found().into());
    }
    Ok(())
}

fn cycle_days_to_db(days: Option<u32>) -> DomainResult<Option<i32>> {
    days.map(|d| {
        i32::try_from(d).map_err(|_| DomainError::invalid_argument(format!("replacement cycle {d} is too large")))
    })
    .transpose()
}

/// Map SQLx errors on read paths.
pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    let message = match err {
        sqlx::Error::Database(db_err) => format!("database error: {}", db_err.message()),
        sqlx::Error::PoolClosed => "connection pool closed".to_string(),
        other => other.to_string(),
    };
    StoreError::Backend { operation, message }
}

/// Map SQLx errors on write paths, surfacing constraint violations as domain errors.
fn map_write_error(operation: &'static str, err: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = format!("{operation}: {}", db_err.message());
        match db_err.code().as_deref() {
            Some("23505") => return DomainError::conflict(msg).into(),
            Some("23514") => return DomainError::invariant(msg).into(),
            _ => {}
        }
    }
    map_sqlx_error(operation, err).into()
}

// SQLx row types

#[derive(Debug)]
struct StockItemRow {
    id: Uuid,
    owner_id: Uuid,
    category_id: Uuid,
    brand_id: Option<Uuid>,
    kind: String,
    name: String,
    color: Option<String>,
    unit_price: Option<Decimal>,
    purchased_on: Option<NaiveDate>,
    total_quantity: Decimal,
    remaining_quantity: Decimal,
    status: String,
    low_stock_threshold: Option<Decimal>,
    replacement_cycle_days: Option<i32>,
    opened_at: Option<DateTime<Utc>>,
    depleted_at: Option<DateTime<Utc>>,
    in_use_since: Option<DateTime<Utc>>,
    last_replaced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for StockItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockItemRow {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            category_id: row.try_get("category_id")?,
            brand_id: row.try_get("brand_id")?,
            kind: row.try_get("kind")?,
            name: row.try_get("name")?,
            color: row.try_get("color")?,
            unit_price: row.try_get("unit_price")?,
            purchased_on: row.try_get("purchased_on")?,
            total_quantity: row.try_get("total_quantity")?,
            remaining_quantity: row.try_get("remaining_quantity")?,
            status: row.try_get("status")?,
            low_stock_threshold: row.try_get("low_stock_threshold")?,
            replacement_cycle_days: row.try_get("replacement_cycle_days")?,
            opened_at: row.try_get("opened_at")?,
            depleted_at: row.try_get("depleted_at")?,
            in_use_since: row.try_get("in_use_since")?,
            last_replaced_at: row.try_get("last_replaced_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StockItemRow {
    fn into_item(self) -> DomainResult<StockItem> {
        let replacement_cycle_days = self
            .replacement_cycle_days
            .map(|d| {
                u32::try_from(d)
                    .map_err(|_| DomainError::invariant(format!("negative replacement cycle {d}")))
            })
            .transpose()?;

        StockItem::rehydrate(StockItemRecord {
            id: StockItemId::from_uuid(self.id),
            owner_id: OwnerId::from_uuid(self.owner_id),
            kind: self.kind.parse::<ItemKind>()?,
            attributes: ItemAttributes {
                category_id: CategoryId::from_uuid(self.category_id),
                brand_id: self.brand_id.map(BrandId::from_uuid),
                name: self.name,
                color: self.color,
                unit_price: self.unit_price,
                purchased_on: self.purchased_on,
            },
            total_quantity: Quantity::new(self.total_quantity)?,
            remaining_quantity: Quantity::new(self.remaining_quantity)?,
            status: self.status.parse::<ItemStatus>()?,
            low_stock_threshold: self.low_stock_threshold.map(Quantity::new).transpose()?,
            replacement_cycle_days,
            opened_at: self.opened_at,
            depleted_at: self.depleted_at,
            in_use_since: self.in_use_since,
            last_replaced_at: self.last_replaced_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn item_from_row(row: &PgRow) -> Result<StockItem, StoreError> {
    let parsed = StockItemRow::from_row(row)
        .map_err(|e| StoreError::Corrupt(format!("failed to read stock item row: {e}")))?;
    let id = parsed.id;
    parsed
        .into_item()
        .map_err(|e| StoreError::Corrupt(format!("stock item {id}: {e}")))
}

#[derive(Debug)]
struct UsageEventRow {
    id: Uuid,
    owner_id: Uuid,
    item_id: Uuid,
    amount: Decimal,
    occurred_at: DateTime<Utc>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UsageEventRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UsageEventRow {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            item_id: row.try_get("item_id")?,
            amount: row.try_get("amount")?,
            occurred_at: row.try_get("occurred_at")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn usage_from_row(row: &PgRow) -> Result<UsageEvent, StoreError> {
    let r = UsageEventRow::from_row(row)
        .map_err(|e| StoreError::Corrupt(format!("failed to read usage row: {e}")))?;
    let id = r.id;
    Quantity::new(r.amount)
        .and_then(|amount| {
            UsageEvent::rehydrate(UsageEventRecord {
                id: UsageEventId::from_uuid(r.id),
                owner_id: OwnerId::from_uuid(r.owner_id),
                item_id: StockItemId::from_uuid(r.item_id),
                amount,
                occurred_at: r.occurred_at,
                note: r.note,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
        })
        .map_err(|e| StoreError::Corrupt(format!("usage event {id}: {e}")))
}
