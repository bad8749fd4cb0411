//! Route registration: module routes plus system endpoints, all under `/api`.

use std::sync::Arc;

use axum::extract::{OriginalUri, State};
use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use cabos_core::ServiceError;

use crate::config::CompanySection;

/// Application shared state.
#[derive(Clone)]
pub struct AppState {
    pub company: Arc<CompanySection>,
}

/// Build the complete router with all routes.
pub fn build_router(state: AppState, module_routes: Vec<(&str, Router)>) -> Router {
    let mut api: Router<()> = Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/configuracao", get(configuracao))
        .with_state(state);

    // Module routers already carry their own state and use paths relative to /api.
    for (name, router) in module_routes {
        tracing::debug!(module = name, "mounting module routes");
        api = api.merge(router);
    }
    // Registered last so it reaches every route above.
    let api = api.method_not_allowed_fallback(method_not_allowed);

    // The dashboard and the scanner page are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(cors)
}

async fn not_found(OriginalUri(uri): OriginalUri) -> ServiceError {
    ServiceError::NotFound(format!("rota {} não encontrada", uri.path()))
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ServiceError {
    ServiceError::MethodNotAllowed(format!(
        "método {method} não permitido em {}",
        uri.path()
    ))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": cabos_core::now_rfc3339(),
    }))
}

async fn version() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "cabosd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn configuracao(State(state): State<AppState>) -> Json<CompanySection> {
    Json(state.company.as_ref().clone())
}
