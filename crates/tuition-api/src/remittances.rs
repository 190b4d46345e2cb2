//! Handlers for `/remittances` and `/audit`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/remittances` | Optional `?student_id=<uuid>` |
//! | `POST` | `/remittances` | Record a payment; 409 if already paid |
//! | `GET`  | `/remittances/{id}` | 404 if not found |
//! | `POST` | `/remittances/{id}/void` | Body: `{"reason":".."}`; audited |
//! | `GET`  | `/audit` | Every audit entry, oldest first |
//!
//! A payment is recorded by the authenticated caller: `recorded_by` and the
//! void `actor` are always the caller's username, never client-supplied.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tuition_core::{
  Entity,
  access::Operation,
  audit::AuditEntry,
  remittance::{FeeRemittance, NewRemittance, RemittanceVoid},
  store::LedgerStore,
};
use uuid::Uuid;

use crate::{ApiState, Authenticated, error::ApiError, found};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
  pub student_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PayBody {
  pub student_id:   Uuid,
  pub fee_id:       Uuid,
  pub parent_id:    Uuid,
  pub amount_paid:  i64,
  /// Defaults to today (UTC).
  pub payment_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct VoidBody {
  pub reason: String,
}

/// `GET /remittances[?student_id=<uuid>]`
pub async fn list<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<ListQuery>,
) -> Result<Json<Vec<FeeRemittance>>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let remittances = match q.student_id {
    Some(student_id) => state.store.list_remittances_by_student(student_id).await,
    None => state.store.list_remittances().await,
  }
  .map_err(ApiError::ledger)?;
  Ok(Json(remittances))
}

/// `GET /remittances/{id}`
pub async fn get_one<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<FeeRemittance>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let remittance = state.store.get_remittance(id).await.map_err(ApiError::ledger)?;
  Ok(Json(found(remittance, Entity::Remittance, id)?))
}

/// `POST /remittances`
pub async fn pay<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<PayBody>,
) -> Result<(StatusCode, Json<FeeRemittance>), ApiError> {
  state.authorize(&caller, Operation::RecordPayment)?;

  let input = NewRemittance {
    student_id:   body.student_id,
    fee_id:       body.fee_id,
    parent_id:    body.parent_id,
    amount_paid:  body.amount_paid,
    payment_date: body.payment_date.unwrap_or_else(|| Utc::now().date_naive()),
    recorded_by:  caller.username,
  };
  let remittance = state.store.pay(input).await.map_err(ApiError::ledger)?;
  Ok((StatusCode::CREATED, Json(remittance)))
}

/// `POST /remittances/{id}/void`
pub async fn void<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  Json(body): Json<VoidBody>,
) -> Result<Json<AuditEntry>, ApiError> {
  state.authorize(&caller, Operation::VoidPayment)?;
  let request = RemittanceVoid { reason: body.reason, actor: caller.username };
  let entry = state
    .store
    .void_remittance(id, request)
    .await
    .map_err(ApiError::ledger)?;
  Ok(Json(entry))
}

/// `GET /audit`
pub async fn audit<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
  state.authorize(&caller, Operation::ReadAudit)?;
  let entries = state.store.list_audit().await.map_err(ApiError::ledger)?;
  Ok(Json(entries))
}
