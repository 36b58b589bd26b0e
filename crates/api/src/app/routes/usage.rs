use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use stockledger_core::{StockItemId, UsageEventId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OwnerContext;

pub async fn record_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RecordUsageRequest>,
) -> axum::response::Response {
    let item_id: StockItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .record_usage(owner.owner_id(), item_id, body.into_usage(Utc::now()))
        .await
    {
        Ok(outcome) => {
            (StatusCode::CREATED, Json(dto::UsageOutcomeView::from(&outcome))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id: StockItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.list_usage(owner.owner_id(), item_id).await {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUsageRequest>,
) -> axum::response::Response {
    let event_id: UsageEventId = match errors::parse_id(&id, "usage event") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .update_usage(owner.owner_id(), event_id, body.into())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(dto::UsageOutcomeView::from(&outcome))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(owner): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let event_id: UsageEventId = match errors::parse_id(&id, "usage event") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_usage(owner.owner_id(), event_id).await {
        Ok(item) => (StatusCode::OK, Json(dto::ItemView::from(&item))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
