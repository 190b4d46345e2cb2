//! Caller-resolving extractor.

use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};
use tuition_core::{Error as LedgerError, access::Caller};

use crate::{ApiState, error::ApiError};

/// Present in a handler means the request carried a credential the identity
/// provider accepted; holds the resolved caller.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Caller);

impl<S> FromRequestParts<ApiState<S>> for Authenticated
where
  S: Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let credential = parts
      .headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .ok_or(LedgerError::Unauthenticated)?;
    let caller = state.identities.identify(credential)?;
    Ok(Authenticated(caller))
  }
}
