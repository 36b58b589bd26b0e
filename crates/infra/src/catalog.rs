//! Reference data owned by the taxonomy side of the system.
//!
//! The ledger only needs two answers from it: which kind a category holds,
//! and whether a brand exists. Both are scoped to the owner.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use stockledger_core::{BrandId, CategoryId, OwnerId};
use stockledger_inventory::ItemKind;

use crate::error::StoreError;
use crate::store::postgres::map_sqlx_error;

#[async_trait]
pub trait ReferenceCatalog: Send + Sync {
    /// Kind of the owner's category, or `None` if the owner has no such category.
    async fn category_kind(
        &self,
        owner_id: OwnerId,
        category_id: CategoryId,
    ) -> Result<Option<ItemKind>, StoreError>;

    async fn brand_exists(&self, owner_id: OwnerId, brand_id: BrandId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<C> ReferenceCatalog for Arc<C>
where
    C: ReferenceCatalog + ?Sized,
{
    async fn category_kind(
        &self,
        owner_id: OwnerId,
        category_id: CategoryId,
    ) -> Result<Option<ItemKind>, StoreError> {
        (**self).category_kind(owner_id, category_id).await
    }

    async fn brand_exists(&self, owner_id: OwnerId, brand_id: BrandId) -> Result<bool, StoreError> {
        (**self).brand_exists(owner_id, brand_id).await
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReferenceCatalog {
    categories: RwLock<HashMap<(OwnerId, CategoryId), ItemKind>>,
    brands: RwLock<HashSet<(OwnerId, BrandId)>>,
}

impl InMemoryReferenceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, owner_id: OwnerId, kind: ItemKind) -> Result<CategoryId, StoreError> {
        let id = CategoryId::new();
        self.categories
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert((owner_id, id), kind);
        Ok(id)
    }

    pub fn add_brand(&self, owner_id: OwnerId) -> Result<BrandId, StoreError> {
        let id = BrandId::new();
        self.brands
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert((owner_id, id));
        Ok(id)
    }
}

#[async_trait]
impl ReferenceCatalog for InMemoryReferenceCatalog {
    async fn category_kind(
        &self,
        owner_id: OwnerId,
        category_id: CategoryId,
    ) -> Result<Option<ItemKind>, StoreError> {
        let map = self.categories.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(&(owner_id, category_id)).copied())
    }

    async fn brand_exists(&self, owner_id: OwnerId, brand_id: BrandId) -> Result<bool, StoreError> {
        let set = self.brands.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(set.contains(&(owner_id, brand_id)))
    }
}

/// Catalog backed by the `categories` and `brands` tables.
#[derive(Debug, Clone)]
pub struct PostgresReferenceCatalog {
    pool: Arc<PgPool>,
}

impl PostgresReferenceCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl ReferenceCatalog for PostgresReferenceCatalog {
    #[instrument(skip(self), fields(owner_id = %owner_id, category_id = %category_id), err)]
    async fn category_kind(
        &self,
        owner_id: OwnerId,
        category_id: CategoryId,
    ) -> Result<Option<ItemKind>, StoreError> {
        let row = sqlx::query("SELECT item_kind FROM categories WHERE owner_id = $1 AND id = $2")
            .bind(owner_id.as_uuid())
            .bind(category_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("category_kind", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let kind: String = row
            .try_get("item_kind")
            .map_err(|e| StoreError::Corrupt(format!("categories.item_kind: {e}")))?;
        kind.parse::<ItemKind>()
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("categories.item_kind: {e}")))
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, brand_id = %brand_id), err)]
    async fn brand_exists(&self, owner_id: OwnerId, brand_id: BrandId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS found FROM brands WHERE owner_id = $1 AND id = $2")
            .bind(owner_id.as_uuid())
            .bind(brand_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("brand_exists", e))?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookups_are_owner_scoped() {
        let catalog = InMemoryReferenceCatalog::new();
        let owner = OwnerId::new();
        let other = OwnerId::new();

        let category = catalog.add_category(owner, ItemKind::Durable).unwrap();
        let brand = catalog.add_brand(owner).unwrap();

        assert_eq!(
            catalog.category_kind(owner, category).await.unwrap(),
            Some(ItemKind::Durable)
        );
        assert_eq!(catalog.category_kind(other, category).await.unwrap(), None);
        assert!(catalog.brand_exists(owner, brand).await.unwrap());
        assert!(!catalog.brand_exists(other, brand).await.unwrap());
    }
}
