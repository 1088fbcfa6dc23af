//! HTTP boundary for the issuance flow and the blockchain monitor.
//!
//! Create and lookup are straightforward store calls. The transition
//! endpoints load the record, run the domain transition, and persist it
//! guarded by the status observed at load time; a lost race answers 409 and
//! the caller re-reads and retries.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use futures::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;

use crate::callback::build_callback_url;
use crate::domain::Completion;
use crate::error::AppError;
use crate::schemas::{CallbackUrlResponse, ForwardingAddressSchema, UnconfirmedListResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAddressRequest {
    pub destination_address: String,
    pub input_address: String,
    pub callback: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub input_transaction_hash: String,
    pub transaction_hash: Option<String>,
    pub value: i64,
    pub fwd_miners_fee: i64,
    pub input_miners_fee: i64,
    pub signed_fwd_transaction: Option<String>,
    pub payee_addresses: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransmitRequest {
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmationsRequest {
    pub confirmations: u32,
}

pub async fn create_address(
    State(state): State<AppState>,
    Json(req): Json<CreateAddressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.destination_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "destination_address must not be empty".to_string(),
        ));
    }
    if req.input_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "input_address must not be empty".to_string(),
        ));
    }
    if let Err(e) = url::Url::parse(&req.callback) {
        return Err(AppError::BadRequest(format!(
            "callback is not a valid URL: {}",
            e
        )));
    }

    let record = state
        .store
        .create(
            &req.destination_address,
            &req.input_address,
            &req.callback,
            Utc::now(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ForwardingAddressSchema::from(record)),
    ))
}

pub async fn get_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("forwarding address {} not found", id)))?;

    Ok(Json(ForwardingAddressSchema::from(record)))
}

pub async fn get_by_input_address(
    State(state): State<AppState>,
    Path(input_address): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .store
        .get_by_input_address(&input_address)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "no forwarding address for input address {}",
                input_address
            ))
        })?;

    Ok(Json(ForwardingAddressSchema::from(record)))
}

pub async fn list_unconfirmed(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let records: Vec<_> = state.store.unconfirmed_by_client().try_collect().await?;

    let addresses: Vec<ForwardingAddressSchema> = records
        .into_iter()
        .map(ForwardingAddressSchema::from)
        .collect();
    let total = addresses.len();

    Ok(Json(UnconfirmedListResponse { addresses, total }))
}

/// Previews the URL the notifier would deliver for this record right now.
pub async fn callback_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("forwarding address {} not found", id)))?;

    let url = build_callback_url(&record)?;

    Ok(Json(CallbackUrlResponse {
        id: record.id,
        callback_url: url.to_string(),
    }))
}

pub async fn complete_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut record = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("forwarding address {} not found", id)))?;

    let observed = record.status;
    record.mark_completed(Completion {
        input_transaction_hash: req.input_transaction_hash,
        transaction_hash: req.transaction_hash,
        value: req.value,
        fwd_miners_fee: req.fwd_miners_fee,
        input_miners_fee: req.input_miners_fee,
        signed_fwd_transaction: req.signed_fwd_transaction,
        payee_addresses: req.payee_addresses,
    })?;
    state.store.update_transition(&record, observed).await?;

    Ok(Json(ForwardingAddressSchema::from(record)))
}

pub async fn transmit_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TransmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut record = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("forwarding address {} not found", id)))?;

    let observed = record.status;
    record.mark_transmitted(req.transaction_hash, Utc::now());
    state.store.update_transition(&record, observed).await?;

    Ok(Json(ForwardingAddressSchema::from(record)))
}

pub async fn update_confirmations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmationsRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.store.set_confirmations(id, req.confirmations).await?;

    let record = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("forwarding address {} not found", id)))?;

    Ok(Json(ForwardingAddressSchema::from(record)))
}
