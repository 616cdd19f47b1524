//! Inventory business logic service.

use crate::api::common::PaginationFilter;
use crate::database::is_unique_violation;
use crate::database::models::{CreateInventoryItem, InventoryItem};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::inventory_repository::InventoryRepository;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

pub struct InventoryService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InventoryService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_item(&self, item: CreateInventoryItem) -> ServiceResult<InventoryItem> {
        if let Err(validation_errors) = item.validate() {
            return Err(ServiceError::from_validation_errors(&validation_errors));
        }

        let repo = InventoryRepository::new(self.pool);
        if repo.sku_exists(&item.sku).await? {
            return Err(ServiceError::already_exists("Inventory item", &item.sku));
        }

        let sku = item.sku.clone();
        match repo.create_item(&Uuid::now_v7().to_string(), item).await {
            Ok(item) => Ok(item),
            Err(e) if is_unique_violation(&e) => {
                Err(ServiceError::already_exists("Inventory item", sku))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_items(
        &self,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<InventoryItem>, u64)> {
        let repo = InventoryRepository::new(self.pool);
        let items = repo.list_items(pagination).await?;
        let total = repo.count_items().await?;
        Ok((items, total))
    }

    /// Applies a stock movement; stock can never drop below zero.
    pub async fn adjust_quantity(&self, id: &str, delta: i64) -> ServiceResult<InventoryItem> {
        if delta == 0 {
            return Err(ServiceError::validation("delta: must not be zero"));
        }

        let repo = InventoryRepository::new(self.pool);
        if let Some(item) = repo.adjust_quantity(id, delta).await? {
            return Ok(item);
        }

        match repo.get_item_by_id(id).await? {
            Some(item) if item.quantity.checked_add(delta).is_none() => Err(
                ServiceError::validation("delta: resulting quantity is out of range"),
            ),
            Some(item) => Err(ServiceError::invalid_operation(format!(
                "Insufficient stock for '{}': have {}, requested change {}",
                item.sku, item.quantity, delta
            ))),
            None => Err(ServiceError::not_found("Inventory item", id)),
        }
    }

    pub async fn delete_item(&self, id: &str) -> ServiceResult<()> {
        let repo = InventoryRepository::new(self.pool);
        if !repo.delete_item(id).await? {
            return Err(ServiceError::not_found("Inventory item", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    fn bolt(quantity: i64) -> CreateInventoryItem {
        CreateInventoryItem {
            sku: "BOLT-M8".to_string(),
            name: "M8 hex bolt".to_string(),
            quantity,
            location: Some("rack-3".to_string()),
        }
    }

    #[tokio::test]
    async fn test_stock_never_negative() {
        let pool = test_pool().await;
        let service = InventoryService::new(&pool);
        let item = service.create_item(bolt(10)).await.unwrap();

        let item = service.adjust_quantity(&item.id, -4).await.unwrap();
        assert_eq!(item.quantity, 6);

        assert!(matches!(
            service.adjust_quantity(&item.id, -7).await,
            Err(ServiceError::InvalidOperation { .. })
        ));
        assert!(matches!(
            service.adjust_quantity("missing", 1).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_overflowing_delta_leaves_row_intact() {
        let pool = test_pool().await;
        let service = InventoryService::new(&pool);
        let item = service.create_item(bolt(40)).await.unwrap();

        assert!(matches!(
            service.adjust_quantity(&item.id, i64::MAX).await,
            Err(ServiceError::Validation { .. })
        ));

        let stored_type: String =
            sqlx::query_scalar("SELECT typeof(quantity) FROM inventory_items WHERE id = ?")
                .bind(&item.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored_type, "integer");

        let (items, _) = service.list_items(&PaginationFilter::default()).await.unwrap();
        assert_eq!(items[0].quantity, 40);

        // Largest delta that still fits.
        let item = service.adjust_quantity(&item.id, i64::MAX - 40).await.unwrap();
        assert_eq!(item.quantity, i64::MAX);
        assert!(matches!(
            service.adjust_quantity(&item.id, 1).await,
            Err(ServiceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_validation_and_duplicates() {
        let pool = test_pool().await;
        let service = InventoryService::new(&pool);

        assert!(matches!(
            service.create_item(bolt(-1)).await,
            Err(ServiceError::Validation { .. })
        ));

        service.create_item(bolt(1)).await.unwrap();
        assert!(matches!(
            service.create_item(bolt(1)).await,
            Err(ServiceError::AlreadyExists { .. })
        ));

        let (items, total) = service.list_items(&PaginationFilter::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].sku, "BOLT-M8");
    }

    #[tokio::test]
    async fn test_delete() {
        let pool = test_pool().await;
        let service = InventoryService::new(&pool);
        let item = service.create_item(bolt(1)).await.unwrap();

        service.delete_item(&item.id).await.unwrap();
        assert!(matches!(
            service.delete_item(&item.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }
}
