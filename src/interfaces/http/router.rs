//! API router

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::transactions::TransactionService;
use crate::interfaces::http::modules::{health, metrics, transactions};

/// Everything the HTTP layer needs from the running service
pub struct ApiContext {
    pub service: Arc<TransactionService>,
    /// Pinged by `/health`; `None` for the in-memory store
    pub db: Option<DatabaseConnection>,
    /// `/metrics` is only mounted when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

/// Create the API router with all routes
pub fn create_api_router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState::new(ctx.db));

    let transaction_routes = transactions::routes(transactions::TransactionAppState {
        service: ctx.service,
    });

    let mut router = Router::new()
        .merge(health_routes)
        .nest("/api/transactions", transaction_routes);

    if let Some(handle) = ctx.metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
