//! Handlers for `/fees`, the dated rate schedule.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/fees` | Every rate recorded |
//! | `POST`   | `/fees` | Body: `{"grade_id","subject_id","teacher_id","amount","valid_from"}` |
//! | `GET`    | `/fees/current` | `?grade_id&subject_id&teacher_id[&as_of=YYYY-MM-DD]` |
//! | `GET`    | `/fees/history` | Same key; windows oldest first |
//! | `GET`    | `/fees/{id}` | 404 if not found |
//! | `DELETE` | `/fees/{id}` | 409 once paid against |
//!
//! Rates are immutable: a correction is a new rate with a later
//! `valid_from`.

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
  fee::{Fee, NewFee, RateKey, RateWindow, rate_history},
  store::LedgerStore,
};
use uuid::Uuid;

use crate::{ApiState, Authenticated, error::ApiError, found};

/// Identifies a rate triple in the query string.
#[derive(Debug, Deserialize)]
pub struct RateQuery {
  pub grade_id:   Uuid,
  pub subject_id: Uuid,
  pub teacher_id: Uuid,
  /// Defaults to today (UTC). Ignored by `/fees/history`.
  pub as_of:      Option<NaiveDate>,
}

impl RateQuery {
  fn key(&self) -> RateKey {
    RateKey {
      grade_id:   self.grade_id,
      subject_id: self.subject_id,
      teacher_id: self.teacher_id,
    }
  }
}

/// `GET /fees`
pub async fn list<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Fee>>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let fees = state.store.list_fees().await.map_err(ApiError::ledger)?;
  Ok(Json(fees))
}

/// `GET /fees/{id}`
pub async fn get_one<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Json<Fee>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let fee = state.store.get_fee(id).await.map_err(ApiError::ledger)?;
  Ok(Json(found(fee, Entity::Fee, id)?))
}

/// `GET /fees/current?grade_id&subject_id&teacher_id[&as_of]`
pub async fn current<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<RateQuery>,
) -> Result<Json<Fee>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let as_of = q.as_of.unwrap_or_else(|| Utc::now().date_naive());
  let fee = state
    .store
    .resolve_current_rate(q.key(), as_of)
    .await
    .map_err(ApiError::ledger)?;
  Ok(Json(fee))
}

/// `GET /fees/history?grade_id&subject_id&teacher_id`
pub async fn history<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<RateQuery>,
) -> Result<Json<Vec<RateWindow>>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let rates = state.store.list_rates(q.key()).await.map_err(ApiError::ledger)?;
  Ok(Json(rate_history(rates)))
}

/// `POST /fees`
pub async fn create<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewFee>,
) -> Result<(StatusCode, Json<Fee>), ApiError> {
  state.authorize(&caller, Operation::ManageFees)?;
  let fee = state.store.create_rate(body).await.map_err(ApiError::ledger)?;
  Ok((StatusCode::CREATED, Json(fee)))
}

/// `DELETE /fees/{id}`
pub async fn delete<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.authorize(&caller, Operation::ManageFees)?;
  state.store.delete_rate(id).await.map_err(ApiError::ledger)?;
  Ok(StatusCode::NO_CONTENT)
}
