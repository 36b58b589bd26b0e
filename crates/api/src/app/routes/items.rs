use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockledger_core::StockItemId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OwnerContext;

pub async fn create_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Json(body): Json<dto::CreateBatchRequest>,
) -> axum::response::Response {
    match services.create_batch(owner.owner_id(), body.into()).await {
        Ok(items) => (StatusCode::CREATED, Json(dto::item_views(&items))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
) -> axum::response::Response {
    match services.list_items(owner.owner_id()).await {
        Ok(items) => (StatusCode::OK, Json(dto::item_views(&items))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id: StockItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_item(owner.owner_id(), item_id).await {
        Ok(item) => (StatusCode::OK, Json(dto::ItemView::from(&item))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id: StockItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_item(owner.owner_id(), item_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn transition(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionRequest>,
) -> axum::response::Response {
    let item_id: StockItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .transition_status(owner.owner_id(), item_id, body.action)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(dto::TransitionView::from(&outcome))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Body is optional; without `at` the replacement is stamped now.
pub async fn mark_replaced(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::MarkReplacedRequest>>,
) -> axum::response::Response {
    let item_id: StockItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let at = body.and_then(|Json(b)| b.at);

    match services.mark_replaced(owner.owner_id(), item_id, at).await {
        Ok(item) => (StatusCode::OK, Json(dto::ItemView::from(&item))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
