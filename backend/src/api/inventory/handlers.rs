//! Handler functions for inventory API endpoints.

use crate::api::common::{ApiResponse, PaginationFilter, PaginationMeta, json_body, pagination_params};
use crate::app::AppState;
use crate::auth::permissions::{self, ensure_permission};
use crate::database::models::{AdjustQuantity, CreateInventoryItem, InventoryItem};
use crate::errors::ServiceError;
use crate::services::inventory_service::InventoryService;
use crate::utils::jwt::Claims;
use axum::{
    extract::{
        Extension, Json, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};

/// Lists inventory items page by page.
#[axum::debug_handler]
pub async fn list_items(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<PaginationFilter>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<InventoryItem>>>, ServiceError> {
    ensure_permission(&claims, permissions::INVENTORY_READ)?;
    let filter = pagination_params(params)?;

    let (items, total) = InventoryService::new(&state.pool)
        .list_items(&filter)
        .await?;

    Ok(Json(ApiResponse::paginated(
        items,
        PaginationMeta::from_filter(&filter, total),
        "Inventory retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn create_item(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateInventoryItem>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<InventoryItem>>), ServiceError> {
    ensure_permission(&claims, permissions::INVENTORY_WRITE)?;
    let payload = json_body(payload)?;

    let item = InventoryService::new(&state.pool).create_item(payload).await?;
    tracing::info!(item_id = %item.id, sku = %item.sku, user_id = %claims.sub, "Inventory item created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(item, "Inventory item created successfully")),
    ))
}

/// Applies a signed stock movement to one item.
#[axum::debug_handler]
pub async fn adjust_quantity(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    payload: Result<Json<AdjustQuantity>, JsonRejection>,
) -> Result<Json<ApiResponse<InventoryItem>>, ServiceError> {
    ensure_permission(&claims, permissions::INVENTORY_WRITE)?;
    let payload = json_body(payload)?;

    let item = InventoryService::new(&state.pool)
        .adjust_quantity(&id, payload.delta)
        .await?;
    tracing::info!(item_id = %item.id, delta = payload.delta, user_id = %claims.sub, "Stock adjusted");

    Ok(Json(ApiResponse::success(item, "Quantity updated successfully")))
}

#[axum::debug_handler]
pub async fn delete_item(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    ensure_permission(&claims, permissions::INVENTORY_DELETE)?;

    InventoryService::new(&state.pool).delete_item(&id).await?;
    tracing::info!(item_id = %id, user_id = %claims.sub, "Inventory item deleted");

    Ok(Json(ApiResponse::success((), "Inventory item deleted successfully")))
}
