//! ETag / If-Match plumbing for versioned records.
//!
//! A record's ETag is its `version` in double quotes. Writes accept an
//! `If-Match` header with or without the quotes; the store compares it with
//! the current version and rejects stale writes.

use axum::{
  Json,
  extract::FromRequestParts,
  http::{HeaderValue, StatusCode, header, request::Parts},
  response::{IntoResponse, Response},
};
use serde::Serialize;
use tuition_core::{
  catalog::CatalogEntry,
  curriculum::GradeSubject,
  enrollment::StudentSubject,
  record::RecordMeta,
  roster::{Parent, Student, Teacher},
};

use crate::error::ApiError;

/// A record carrying the optimistic-concurrency envelope.
pub trait Versioned {
  fn meta(&self) -> &RecordMeta;
}

macro_rules! versioned {
  ($($ty:ty),* $(,)?) => {
    $(impl Versioned for $ty {
      fn meta(&self) -> &RecordMeta { &self.meta }
    })*
  };
}

versioned!(CatalogEntry, GradeSubject, Teacher, Parent, Student, StudentSubject);

pub fn etag(version: i64) -> HeaderValue {
  // Digits and quotes only, always a valid header value.
  HeaderValue::from_str(&format!("\"{version}\"")).unwrap_or(HeaderValue::from_static("\"0\""))
}

/// Respond with `record` as JSON and its version as the `ETag`.
pub fn tagged<T: Versioned + Serialize>(status: StatusCode, record: T) -> Response {
  let tag = etag(record.meta().version);
  (status, [(header::ETAG, tag)], Json(record)).into_response()
}

/// The version named by an `If-Match` header, if one was sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct IfMatch(pub Option<i64>);

impl IfMatch {
  pub fn parse(value: &str) -> Result<Self, ApiError> {
    value
      .trim()
      .trim_matches('"')
      .parse()
      .map(|v| Self(Some(v)))
      .map_err(|_| ApiError::BadRequest(format!("invalid If-Match value {value:?}")))
  }
}

impl<S> FromRequestParts<S> for IfMatch
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    match parts.headers.get(header::IF_MATCH) {
      None => Ok(Self(None)),
      Some(raw) => {
        let value = raw
          .to_str()
          .map_err(|_| ApiError::BadRequest("If-Match is not ASCII".into()))?;
        Self::parse(value)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn if_match_accepts_quoted_and_bare() {
    assert_eq!(IfMatch::parse("\"3\"").unwrap().0, Some(3));
    assert_eq!(IfMatch::parse("7").unwrap().0, Some(7));
    assert!(IfMatch::parse("W/\"abc\"").is_err());
  }

  #[test]
  fn etag_is_quoted_version() {
    assert_eq!(etag(12), "\"12\"");
  }
}
