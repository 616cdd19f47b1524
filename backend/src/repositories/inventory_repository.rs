//! Database repository for inventory items.

use crate::{
    api::common::PaginationFilter,
    database::models::{CreateInventoryItem, InventoryItem},
};
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

const ITEM_COLUMNS: &str = "id, sku, name, quantity, location, created_at, updated_at";

pub struct InventoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InventoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new item under a freshly generated ID.
    pub async fn create_item(&self, id: &str, item: CreateInventoryItem) -> Result<InventoryItem> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO inventory_items (id, sku, name, quantity, location, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            ITEM_COLUMNS
        );

        let item = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .bind(item.sku)
            .bind(item.name)
            .bind(item.quantity)
            .bind(item.location)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool)
            .await?;

        Ok(item)
    }

    pub async fn get_item_by_id(&self, id: &str) -> Result<Option<InventoryItem>> {
        let query = format!("SELECT {} FROM inventory_items WHERE id = ?", ITEM_COLUMNS);
        let item = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(item)
    }

    pub async fn sku_exists(&self, sku: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items WHERE sku = ?")
            .bind(sku)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn list_items(&self, pagination: &PaginationFilter) -> Result<Vec<InventoryItem>> {
        let query = format!(
            "SELECT {} FROM inventory_items ORDER BY sku LIMIT ? OFFSET ?",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(self.pool)
            .await?;

        Ok(items)
    }

    pub async fn count_items(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(self.pool)
            .await?;

        Ok(count as u64)
    }

    /// Applies a signed quantity change in a single statement.
    ///
    /// SQLite turns an overflowing integer sum into a REAL, so the sum must
    /// still be an integer for the row to match.
    ///
    /// # Returns
    /// `None` when the item does not exist or the result would be negative
    /// or out of range
    pub async fn adjust_quantity(&self, id: &str, delta: i64) -> Result<Option<InventoryItem>> {
        let query = format!(
            "UPDATE inventory_items SET quantity = quantity + ?, updated_at = ? \
             WHERE id = ? AND typeof(quantity + ?) = 'integer' AND quantity + ? >= 0 \
             RETURNING {}",
            ITEM_COLUMNS
        );
        let item = sqlx::query_as::<_, InventoryItem>(&query)
            .bind(delta)
            .bind(Utc::now())
            .bind(id)
            .bind(delta)
            .bind(delta)
            .fetch_optional(self.pool)
            .await?;

        Ok(item)
    }

    /// Deletes an item. Returns `false` when nothing was deleted.
    pub async fn delete_item(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
