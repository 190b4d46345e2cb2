//! Handlers for `/grades` and `/subjects`.
//!
//! Both collections share one set of handlers, instantiated per
//! [`Catalog`] marker.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/grades` | Optional `?status=live\|archive` |
//! | `POST`   | `/grades` | Body: `{"name":"Grade 5"}` |
//! | `GET`    | `/grades/{id}` | 404 if not found; sets `ETag` |
//! | `PATCH`  | `/grades/{id}` | Honors `If-Match` |
//! | `PUT`    | `/grades/{id}/status` | Body: `{"status":"archive"}` |
//! | `DELETE` | `/grades/{id}` | 409 while anything references it |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::Response,
};
use tuition_core::{
  access::Operation,
  catalog::{CatalogEntry, CatalogKind, CatalogPatch, NewCatalogEntry},
  store::LedgerStore,
};
use uuid::Uuid;

use crate::{
  ApiState, Authenticated, StatusBody, StatusQuery,
  error::ApiError,
  found,
  version::{IfMatch, tagged},
};

/// Selects the catalog collection a handler instance serves.
pub trait Catalog: Send + Sync + 'static {
  const KIND: CatalogKind;
}

pub struct Grades;
pub struct Subjects;

impl Catalog for Grades {
  const KIND: CatalogKind = CatalogKind::Grade;
}

impl Catalog for Subjects {
  const KIND: CatalogKind = CatalogKind::Subject;
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /grades[?status=<status>]`
pub async fn list<S, C>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Query(q): Query<StatusQuery>,
) -> Result<Json<Vec<CatalogEntry>>, ApiError>
where
  S: LedgerStore + 'static,
  C: Catalog,
{
  state.authorize(&caller, Operation::ReadLedger)?;
  let entries = state
    .store
    .list_catalog_entries(C::KIND, q.status)
    .await
    .map_err(ApiError::ledger)?;
  Ok(Json(entries))
}

/// `GET /grades/{id}`
pub async fn get_one<S, C>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: LedgerStore + 'static,
  C: Catalog,
{
  state.authorize(&caller, Operation::ReadLedger)?;
  let entry = state
    .store
    .get_catalog_entry(C::KIND, id)
    .await
    .map_err(ApiError::ledger)?;
  let entry = found(entry, C::KIND.entity(), id)?;
  Ok(tagged(StatusCode::OK, entry))
}

// ─── Writes ───────────────────────────────────────────────────────────────────

/// `POST /grades`
pub async fn create<S, C>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Json(body): Json<NewCatalogEntry>,
) -> Result<Response, ApiError>
where
  S: LedgerStore + 'static,
  C: Catalog,
{
  state.authorize(&caller, Operation::ManageCatalog)?;
  let entry = state
    .store
    .create_catalog_entry(C::KIND, body)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::CREATED, entry))
}

/// `PATCH /grades/{id}`
pub async fn update<S, C>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(patch): Json<CatalogPatch>,
) -> Result<Response, ApiError>
where
  S: LedgerStore + 'static,
  C: Catalog,
{
  state.authorize(&caller, Operation::ManageCatalog)?;
  let entry = state
    .store
    .update_catalog_entry(C::KIND, id, patch, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, entry))
}

/// `PUT /grades/{id}/status`
pub async fn set_status<S, C>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
  IfMatch(expected): IfMatch,
  Json(body): Json<StatusBody>,
) -> Result<Response, ApiError>
where
  S: LedgerStore + 'static,
  C: Catalog,
{
  state.authorize(&caller, Operation::ManageCatalog)?;
  let entry = state
    .store
    .set_catalog_status(C::KIND, id, body.status, expected)
    .await
    .map_err(ApiError::ledger)?;
  Ok(tagged(StatusCode::OK, entry))
}

/// `DELETE /grades/{id}`
pub async fn delete<S, C>(
  State(state): State<ApiState<S>>,
  Authenticated(caller): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: LedgerStore + 'static,
  C: Catalog,
{
  state.authorize(&caller, Operation::ManageCatalog)?;
  state
    .store
    .delete_catalog_entry(C::KIND, id)
    .await
    .map_err(ApiError::ledger)?;
  Ok(StatusCode::NO_CONTENT)
}
