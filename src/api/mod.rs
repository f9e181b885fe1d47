pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

pub use handlers::*;

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/reconcile", post(reconcile_json))
        .route("/api/reconcile/csv", post(reconcile_csv))
        .route("/api/reconcile/csv/export", post(export_csv))
        .route("/api/reconcile/xlsx", post(reconcile_xlsx))
        .route("/api/reconcile/xlsx/export", post(export_xlsx))
        .with_state(state)
}
