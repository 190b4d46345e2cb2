//! Handlers for `/teachers`, `/parents` and `/students`.
//!
//! All three collections share the catalog shape: list with `?status`,
//! create, get, `PATCH`, `PUT .../status` and `DELETE`. Creating a student
//! also enrolls it in the `subjects` listed in the body; the response then
//! carries both the student and its enrollments.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use tuition_core::{
  Entity,
  access::Operation,
  roster::{
    NewParent, NewStudent, NewTeacher, Parent, ParentPatch, Student,
    StudentPatch, Teacher, TeacherPatch,
  },
  store::LedgerStore,
};
use uuid::Uuid;

use crate::{
  ApiState, Authenticated, StatusBody, StatusQuery,
  error::ApiError,
  found,
  version::{IfMatch, tagged},
};

// ─── Teachers ─────────────────────────────────────────────────────────────────

/// `GET /teachers[?status=<status>]`
pub async fn list_teachers<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<StatusQuery>,
) -> Result<Json<Vec<Teacher>>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let teachers = state.store.list_teachers(q.status).await.map_err(ApiError::ledger)?;
  Ok(Json(teachers))
}

/// `GET /teachers/{id}`
pub async fn get_teacher<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let teacher = state.store.get_teacher(id).await.map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, found(teacher, Entity::Teacher, id)?))
}

/// `POST /teachers`
pub async fn create_teacher<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewTeacher>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let teacher = state.store.create_teacher(body).await.map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::CREATED, teacher))
}

/// `PATCH /teachers/{id}`
pub async fn update_teacher<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(patch): Json<TeacherPatch>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let teacher = state
    .store
    .update_teacher(id, patch, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, teacher))
}

/// `PUT /teachers/{id}/status`
pub async fn set_teacher_status<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(body): Json<StatusBody>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let teacher = state
    .store
    .set_teacher_status(id, body.status, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, teacher))
}

/// `DELETE /teachers/{id}`
pub async fn delete_teacher<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  state.store.delete_teacher(id).await.map_err(ApiError::ledger)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Parents ──────────────────────────────────────────────────────────────────

/// `GET /parents[?status=<status>]`
pub async fn list_parents<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<StatusQuery>,
) -> Result<Json<Vec<Parent>>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let parents = state.store.list_parents(q.status).await.map_err(ApiError::ledger)?;
  Ok(Json(parents))
}

/// `GET /parents/{id}`
pub async fn get_parent<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let parent = state.store.get_parent(id).await.map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, found(parent, Entity::Parent, id)?))
}

/// `POST /parents`
pub async fn create_parent<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewParent>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let parent = state.store.create_parent(body).await.map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::CREATED, parent))
}

/// `PATCH /parents/{id}`
pub async fn update_parent<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(patch): Json<ParentPatch>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let parent = state
    .store
    .update_parent(id, patch, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, parent))
}

/// `PUT /parents/{id}/status`
pub async fn set_parent_status<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(body): Json<StatusBody>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let parent = state
    .store
    .set_parent_status(id, body.status, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, parent))
}

/// `DELETE /parents/{id}`
pub async fn delete_parent<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  state.store.delete_parent(id).await.map_err(ApiError::ledger)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Students ─────────────────────────────────────────────────────────────────

/// `GET /students[?status=<status>]`
pub async fn list_students<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<StatusQuery>,
) -> Result<Json<Vec<Student>>, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let students = state.store.list_students(q.status).await.map_err(ApiError::ledger)?;
  Ok(Json(students))
}

/// `GET /students/{id}`
pub async fn get_student<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ReadLedger)?;
  let student = state.store.get_student(id).await.map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, found(student, Entity::Student, id)?))
}

/// `POST /students`
///
/// The body carries the initial `subjects` as
/// `[{"subject_id":..,"teacher_id":..}]`.
pub async fn create_student<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewStudent>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let enrolled = state.store.create_student(body).await.map_err(ApiError::ledger)?;
  Ok((StatusCode::CREATED, Json(enrolled)).into_response())
}

/// `PATCH /students/{id}`
pub async fn update_student<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(patch): Json<StudentPatch>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let student = state
    .store
    .update_student(id, patch, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, student))
}

/// `PUT /students/{id}/status`
pub async fn set_student_status<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(body): Json<StatusBody>,
) -> Result<Response, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  let student = state
    .store
    .set_student_status(id, body.status, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, student))
}

/// `DELETE /students/{id}`
pub async fn delete_student<S: LedgerStore + 'static>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.authorize(&caller, Operation::ManageRoster)?;
  state.store.delete_student(id).await.map_err(ApiError::ledger)?;
  Ok(StatusCode::NO_CONTENT)
}
