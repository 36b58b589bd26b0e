use axum::{
    routing::{get, patch, post},
    Router,
};

pub mod alerts;
pub mod items;
pub mod system;
pub mod usage;

/// Router for all authenticated (owner-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/items", get(items::list_items))
        .route("/items/batch", post(items::create_batch))
        .route("/items/:id", get(items::get_item).delete(items::delete_item))
        .route("/items/:id/transition", post(items::transition))
        .route("/items/:id/replaced", post(items::mark_replaced))
        .route(
            "/items/:id/usage",
            get(usage::list_usage).post(usage::record_usage),
        )
        .route(
            "/usage/:id",
            patch(usage::update_usage).delete(usage::delete_usage),
        )
        .route("/alerts", get(alerts::get_alerts))
}
