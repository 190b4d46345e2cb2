//! JSON REST API for the tuition ledger.
//!
//! Exposes an axum [`Router`] backed by any [`tuition_core::store::LedgerStore`].
//! Every request resolves its caller through the configured
//! [`IdentityProvider`] and is checked against the [`AccessGate`] before the
//! store is touched. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tuition_api::api_router(state))
//! ```

pub mod auth;
pub mod catalog;
pub mod curriculum;
pub mod enrollments;
pub mod error;
pub mod fees;
pub mod remittances;
pub mod roster;
pub mod version;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use serde::Deserialize;
use tuition_core::{
  Entity, Error as LedgerError, Status,
  access::{AccessGate, Caller, IdentityProvider, Operation},
  store::LedgerStore,
};
use uuid::Uuid;

pub use auth::Authenticated;
pub use error::ApiError;

use catalog::{Grades, Subjects};

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:      Arc<S>,
  pub gate:       Arc<dyn AccessGate>,
  pub identities: Arc<dyn IdentityProvider>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      gate:       Arc::clone(&self.gate),
      identities: Arc::clone(&self.identities),
    }
  }
}

impl<S> ApiState<S> {
  /// Ask the gate whether `caller` may perform `operation`.
  pub fn authorize(&self, caller: &Caller, operation: Operation) -> Result<(), ApiError> {
    self.gate.authorize(caller, operation)?;
    Ok(())
  }
}

/// Turn a `get_*` miss into a 404.
pub(crate) fn found<T>(record: Option<T>, entity: Entity, id: Uuid) -> Result<T, ApiError> {
  record.ok_or_else(|| LedgerError::not_found(entity, id).into())
}

/// `?status=live|archive` filter shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
  pub status: Option<Status>,
}

/// Body of every `PUT .../{id}/status` request.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: Status,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: LedgerStore + 'static,
{
  Router::new()
    // Catalog
    .route("/grades", get(catalog::list::<S, Grades>).post(catalog::create::<S, Grades>))
    .route(
      "/grades/{id}",
      get(catalog::get_one::<S, Grades>)
        .patch(catalog::update::<S, Grades>)
        .delete(catalog::delete::<S, Grades>),
    )
    .route("/grades/{id}/status", put(catalog::set_status::<S, Grades>))
    .route(
      "/subjects",
      get(catalog::list::<S, Subjects>).post(catalog::create::<S, Subjects>),
    )
    .route(
      "/subjects/{id}",
      get(catalog::get_one::<S, Subjects>)
        .patch(catalog::update::<S, Subjects>)
        .delete(catalog::delete::<S, Subjects>),
    )
    .route("/subjects/{id}/status", put(catalog::set_status::<S, Subjects>))
    // Curriculum
    .route(
      "/grade-subjects",
      get(curriculum::list::<S>).post(curriculum::create::<S>),
    )
    .route(
      "/grade-subjects/{id}",
      get(curriculum::get_one::<S>).delete(curriculum::delete::<S>),
    )
    .route("/grade-subjects/{id}/status", put(curriculum::set_status::<S>))
    // Roster
    .route(
      "/teachers",
      get(roster::list_teachers::<S>).post(roster::create_teacher::<S>),
    )
    .route(
      "/teachers/{id}",
      get(roster::get_teacher::<S>)
        .patch(roster::update_teacher::<S>)
        .delete(roster::delete_teacher::<S>),
    )
    .route("/teachers/{id}/status", put(roster::set_teacher_status::<S>))
    .route(
      "/parents",
      get(roster::list_parents::<S>).post(roster::create_parent::<S>),
    )
    .route(
      "/parents/{id}",
      get(roster::get_parent::<S>)
        .patch(roster::update_parent::<S>)
        .delete(roster::delete_parent::<S>),
    )
    .route("/parents/{id}/status", put(roster::set_parent_status::<S>))
    .route(
      "/students",
      get(roster::list_students::<S>).post(roster::create_student::<S>),
    )
    .route(
      "/students/{id}",
      get(roster::get_student::<S>)
        .patch(roster::update_student::<S>)
        .delete(roster::delete_student::<S>),
    )
    .route("/students/{id}/status", put(roster::set_student_status::<S>))
    // Enrollments
    .route(
      "/enrollments",
      get(enrollments::list::<S>).post(enrollments::enroll::<S>),
    )
    .route(
      "/enrollments/{id}",
      get(enrollments::get_one::<S>).delete(enrollments::delete::<S>),
    )
    .route("/enrollments/{id}/status", put(enrollments::set_status::<S>))
    .route("/enrollments/{id}/teacher", post(enrollments::change_teacher::<S>))
    // Fees
    .route("/fees", get(fees::list::<S>).post(fees::create::<S>))
    .route("/fees/current", get(fees::current::<S>))
    .route("/fees/history", get(fees::history::<S>))
    .route("/fees/{id}", get(fees::get_one::<S>).delete(fees::delete::<S>))
    // Remittances
    .route(
      "/remittances",
      get(remittances::list::<S>).post(remittances::pay::<S>),
    )
    .route("/remittances/{id}", get(remittances::get_one::<S>))
    .route("/remittances/{id}/void", post(remittances::void::<S>))
    .route("/audit", get(remittances::audit::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
