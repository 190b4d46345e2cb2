//! Handlers for `/grade-subjects`, the subjects offered per grade.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/grade-subjects` | Optional `?grade_id=<uuid>&status=<status>` |
//! | `POST`   | `/grade-subjects` | Body: `{"grade_id":..,"subject_id":..}` |
//! | `GET`    | `/grade-subjects/{id}` | 404 if not found |
//! | `PUT`    | `/grade-subjects/{id}/status` | Honors `If-Match` |
//! | `DELETE` | `/grade-subjects/{id}` | 409 while referenced |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::Response,
};
use serde::Deserialize;
use tuition_core::{
  Entity, Status,
  access::Operation,
  curriculum::{GradeSubject, NewGradeSubject},
  store::LedgerStore,
};
use uuid::Uuid;

use crate::{
  ApiState, Authenticated, StatusBody,
  error::ApiError,
  found,
  version::{IfMatch, tagged},
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
  pub grade_id: Option<Uuid>,
  pub status:   Option<Status>,
}

/// `GET /grade-subjects[?grade_id=<uuid>&status=<status>]`
pub async fn list<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<ListQuery>,
) -> Result<Json<Vec<GradeSubject>>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let mappings = state
    .store
    .list_grade_subjects(q.grade_id, q.status)
    .await
    .map_err(ApiError::ledger)?;
  Ok(Json(mappings))
}

/// `GET /grade-subjects/{id}`
pub async fn get_one<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let mapping = state.store.get_grade_subject(id).await.map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, found(mapping, Entity::GradeSubject, id)?))
}

/// `POST /grade-subjects`
pub async fn create<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewGradeSubject>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageCurriculum)?;
  let mapping = state
    .store
    .create_grade_subject(body)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::CREATED, mapping))
}

/// `PUT /grade-subjects/{id}/status`
pub async fn set_status<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(body): Json<StatusBody>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageCurriculum)?;
  let mapping = state
    .store
    .set_grade_subject_status(id, body.status, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, mapping))
}

/// `DELETE /grade-subjects/{id}`
pub async fn delete<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.authorize(&caller, Operation::ManageCurriculum)?;
  state.store.delete_grade_subject(id).await.map_err(ApiError::ledger)?;
  Ok(StatusCode::NO_CONTENT)
}
