//! Transaction API handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use super::dto::{
    ActiveTransactionsQuery, MeterValueDto, RecordMeterValueRequest, StartTransactionRequest,
    StopTransactionRequest, TransactionDto, UpdateChargingStateRequest,
};
use crate::application::transactions::TransactionService;
use crate::domain::DomainError;
use crate::interfaces::http::common::{domain_error, ApiResponse, ApiResult, ValidatedJson};

/// Transaction handler state
#[derive(Clone)]
pub struct TransactionAppState {
    pub service: Arc<TransactionService>,
}

/// `POST /api/transactions/start`
pub async fn start_transaction(
    State(state): State<TransactionAppState>,
    ValidatedJson(request): ValidatedJson<StartTransactionRequest>,
) -> ApiResult<TransactionDto> {
    let command = request.into_command().map_err(domain_error)?;
    let tx = state
        .service
        .start_transaction(command)
        .await
        .map_err(domain_error)?;
    info!(transaction_id = %tx.transaction_id, "Transaction started via API");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TransactionDto::from_domain(tx))),
    ))
}

/// `POST /api/transactions/{transaction_id}/stop`
pub async fn stop_transaction(
    State(state): State<TransactionAppState>,
    Path(transaction_id): Path<String>,
    ValidatedJson(request): ValidatedJson<StopTransactionRequest>,
) -> ApiResult<TransactionDto> {
    let command = request.into_command().map_err(domain_error)?;
    let tx = state
        .service
        .stop_transaction(&transaction_id, command)
        .await
        .map_err(domain_error)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(TransactionDto::from_domain(tx))),
    ))
}

/// `PATCH /api/transactions/{transaction_id}/charging-state`
pub async fn update_charging_state(
    State(state): State<TransactionAppState>,
    Path(transaction_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateChargingStateRequest>,
) -> ApiResult<TransactionDto> {
    let tx = state
        .service
        .update_charging_state(&transaction_id, request.charging_state)
        .await
        .map_err(domain_error)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(TransactionDto::from_domain(tx))),
    ))
}

/// `GET /api/transactions/active?stationId=..`
pub async fn get_active_transactions(
    State(state): State<TransactionAppState>,
    Query(query): Query<ActiveTransactionsQuery>,
) -> ApiResult<Vec<TransactionDto>> {
    if query.station_id.trim().is_empty() {
        return Err(domain_error(DomainError::DomainViolation(
            "stationId must not be blank".into(),
        )));
    }
    let open = state
        .service
        .get_active_transactions(&query.station_id)
        .await
        .map_err(domain_error)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            open.into_iter().map(TransactionDto::from_domain).collect(),
        )),
    ))
}

/// `GET /api/transactions/{transaction_id}`
pub async fn get_transaction(
    State(state): State<TransactionAppState>,
    Path(transaction_id): Path<String>,
) -> ApiResult<TransactionDto> {
    let tx = state
        .service
        .get_transaction(&transaction_id)
        .await
        .map_err(domain_error)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(TransactionDto::from_domain(tx))),
    ))
}

/// `GET /api/transactions/{transaction_id}/meter-values`
pub async fn list_meter_values(
    State(state): State<TransactionAppState>,
    Path(transaction_id): Path<String>,
) -> ApiResult<Vec<MeterValueDto>> {
    let values = state
        .service
        .list_meter_values(&transaction_id)
        .await
        .map_err(domain_error)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::success(
            values.into_iter().map(MeterValueDto::from_domain).collect(),
        )),
    ))
}

/// `POST /api/transactions/{transaction_id}/meter-values`
pub async fn record_meter_value(
    State(state): State<TransactionAppState>,
    Path(transaction_id): Path<String>,
    ValidatedJson(request): ValidatedJson<RecordMeterValueRequest>,
) -> ApiResult<MeterValueDto> {
    let sample = request.into_sample().map_err(domain_error)?;
    let stored = state
        .service
        .record_meter_value(&transaction_id, sample)
        .await
        .map_err(domain_error)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(MeterValueDto::from_domain(stored))),
    ))
}
