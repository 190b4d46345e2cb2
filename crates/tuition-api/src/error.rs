//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tuition_core::Error as LedgerError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A ledger, access or store failure, mapped by kind.
  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl ApiError {
  /// Convert a backend error into its ledger kind.
  pub fn ledger<E: Into<LedgerError>>(e: E) -> Self { Self::Ledger(e.into()) }

  pub fn status(&self) -> StatusCode {
    let ApiError::Ledger(e) = self else {
      return StatusCode::BAD_REQUEST;
    };
    match e {
      LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
      LedgerError::DuplicateName { .. }
      | LedgerError::DuplicateMapping { .. }
      | LedgerError::DuplicateEnrollment { .. }
      | LedgerError::DuplicateRate { .. }
      | LedgerError::AlreadyPaid { .. }
      | LedgerError::HasDependents { .. }
      | LedgerError::HasActiveDependents { .. } => StatusCode::CONFLICT,
      LedgerError::SubjectNotOfferedForGrade { .. }
      | LedgerError::EnrollmentMismatch { .. }
      | LedgerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      LedgerError::ConcurrentModification { .. } => StatusCode::PRECONDITION_FAILED,
      LedgerError::Unauthenticated => StatusCode::UNAUTHORIZED,
      LedgerError::Forbidden { .. } => StatusCode::FORBIDDEN,
      LedgerError::ReceiptCollision { .. } | LedgerError::StoreUnavailable(_) => {
        StatusCode::SERVICE_UNAVAILABLE
      }
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Ledger(e) => e.code(),
      ApiError::BadRequest(_) => "bad_request",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if let ApiError::Ledger(e @ LedgerError::StoreUnavailable(_)) = &self {
      tracing::error!(error = %e, "store unavailable");
    }

    let body = Json(json!({ "error": self.to_string(), "code": self.code() }));
    let mut res = (status, body).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"tuition\""),
      );
    }
    res
  }
}
