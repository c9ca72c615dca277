//! Transaction lifecycle endpoints

pub mod dto;
pub mod handlers;

use axum::routing::{get, patch, post};
use axum::Router;

pub use dto::*;
pub use handlers::*;

/// Routes relative to `/api/transactions`
pub fn routes(state: TransactionAppState) -> Router {
    Router::new()
        .route("/start", post(start_transaction))
        .route("/active", get(get_active_transactions))
        .route("/{transaction_id}", get(get_transaction))
        .route("/{transaction_id}/stop", post(stop_transaction))
        .route(
            "/{transaction_id}/charging-state",
            patch(update_charging_state),
        )
        .route(
            "/{transaction_id}/meter-values",
            get(list_meter_values).post(record_meter_value),
        )
        .with_state(state)
}
