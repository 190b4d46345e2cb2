//! Handlers for `/enrollments`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/enrollments` | Optional `?student_id=<uuid>&status=<status>` |
//! | `POST`   | `/enrollments` | Body: `{"student_id":..,"subject_id":..,"teacher_id":..}` |
//! | `GET`    | `/enrollments/{id}` | 404 if not found |
//! | `PUT`    | `/enrollments/{id}/status` | Honors `If-Match` |
//! | `POST`   | `/enrollments/{id}/teacher` | Archive and re-enroll under `{"teacher_id":..}` |
//! | `DELETE` | `/enrollments/{id}` | 409 once paid against |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use tuition_core::{
  Entity, Status,
  access::Operation,
  enrollment::{NewEnrollment, StudentSubject},
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
  pub student_id: Option<Uuid>,
  pub status:     Option<Status>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherBody {
  pub teacher_id: Uuid,
}

/// `GET /enrollments[?student_id=<uuid>&status=<status>]`
pub async fn list<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<ListQuery>,
) -> Result<Json<Vec<StudentSubject>>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let enrollments = state
    .store
    .list_enrollments(q.student_id, q.status)
    .await
    .map_err(ApiError::ledger)?;
  Ok(Json(enrollments))
}

/// `GET /enrollments/{id}`
pub async fn get_one<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let enrollment = state.store.get_enrollment(id).await.map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, found(enrollment, Entity::Enrollment, id)?))
}

/// `POST /enrollments`
pub async fn enroll<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewEnrollment>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageEnrollment)?;
  let enrollment = state.store.enroll(body).await.map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::CREATED, enrollment))
}

/// `POST /enrollments/{id}/teacher`
///
/// Responds with both the archived enrollment and its replacement.
pub async fn change_teacher<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(body): Json<TeacherBody>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageEnrollment)?;
  let change = state
    .store
    .change_teacher(id, body.teacher_id, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok((StatusCode::CREATED, Json(change)).into_response())
}

/// `PUT /enrollments/{id}/status`
pub async fn set_status<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(body): Json<StatusBody>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageEnrollment)?;
  let enrollment = state
    .store
    .set_enrollment_status(id, body.status, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, enrollment))
}

/// `DELETE /enrollments/{id}`
pub async fn delete<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.authorize(&caller, Operation::ManageEnrollment)?;
  state.store.delete_enrollment(id).await.map_err(ApiError::ledger)?;
  Ok(StatusCode::NO_CONTENT)
}
