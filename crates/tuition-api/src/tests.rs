use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use tuition_core::{
  Error as LedgerError, Result as LedgerResult,
  access::{Caller, IdentityProvider, Role, RolePolicy},
};
use tuition_store_sqlite::SqliteStore;

use crate::{ApiState, api_router};

/// Accepts `Test <role> [<party uuid>]` as a credential.
struct TestIdentities;

impl IdentityProvider for TestIdentities {
  fn identify(&self, credential: &str) -> LedgerResult<Caller> {
    let mut parts = credential.split_whitespace();
    if parts.next() != Some("Test") {
      return Err(LedgerError::Unauthenticated);
    }
    let role: Role = parts
      .next()
      .and_then(|r| r.parse().ok())
      .ok_or(LedgerError::Unauthenticated)?;
    let party_id = parts.next().and_then(|id| id.parse().ok());
    Ok(Caller { username: format!("test-{role}"), role, party_id })
  }
}

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(ApiState {
    store:      Arc::new(store),
    gate:       Arc::new(RolePolicy),
    identities: Arc::new(TestIdentities),
  })
}

const PRINCIPAL: &str = "Test principal";

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  auth: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
  send_if_match(app, method, uri, auth, None, body).await
}

async fn send_if_match(
  app: &Router,
  method: &str,
  uri: &str,
  auth: Option<&str>,
  if_match: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
  let mut req = Request::builder().method(method).uri(uri);
  if let Some(auth) = auth {
    req = req.header(header::AUTHORIZATION, auth);
  }
  if let Some(tag) = if_match {
    req = req.header(header::IF_MATCH, tag);
  }
  let req = match body {
    Some(body) => req
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => req.body(Body::empty()).unwrap(),
  };

  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let etag = res
    .headers()
    .get(header::ETAG)
    .map(|v| v.to_str().unwrap().to_owned());
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, etag, json)
}

async fn post(app: &Router, uri: &str, body: Value) -> Value {
  let (status, _, json) = send(app, "POST", uri, Some(PRINCIPAL), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "POST {uri}: {json}");
  json
}

/// Ids of a grade, subject, mapping, teacher, parent and enrolled student.
struct School {
  grade:   String,
  subject: String,
  teacher: String,
  parent:  String,
  student: String,
}

async fn school(app: &Router) -> School {
  let grade = post(app, "/grades", json!({ "name": "Grade 5" })).await;
  let subject = post(app, "/subjects", json!({ "name": "Math" })).await;
  post(
    app,
    "/grade-subjects",
    json!({ "grade_id": grade["id"], "subject_id": subject["id"] }),
  )
  .await;
  let teacher = post(app, "/teachers", json!({ "name": "Ada" })).await;
  let parent = post(app, "/parents", json!({ "name": "Pat" })).await;
  let enrolled = post(
    app,
    "/students",
    json!({
      "name": "Sam",
      "parent_id": parent["parent_id"],
      "grade_id": grade["id"],
      "subjects": [{ "subject_id": subject["id"], "teacher_id": teacher["teacher_id"] }],
    }),
  )
  .await;
  assert_eq!(enrolled["enrollments"].as_array().unwrap().len(), 1);

  let id = |v: &Value| v.as_str().unwrap().to_owned();
  School {
    grade:   id(&grade["id"]),
    subject: id(&subject["id"]),
    teacher: id(&teacher["teacher_id"]),
    parent:  id(&parent["parent_id"]),
    student: id(&enrolled["student"]["student_id"]),
  }
}

// ─── Access ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_credentials_are_challenged() {
  let app = app().await;
  let req = Request::builder().uri("/grades").body(Body::empty()).unwrap();
  let res = app.oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn students_may_read_but_not_manage() {
  let app = app().await;
  let (status, _, body) = send(
    &app,
    "POST",
    "/grades",
    Some("Test student"),
    Some(json!({ "name": "Grade 1" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["code"], "forbidden");

  let (status, _, body) = send(&app, "GET", "/grades", Some("Test student"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!([]));
}

// ─── Versioning ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn stale_if_match_is_rejected() {
  let app = app().await;
  let (status, etag, grade) = send(
    &app,
    "POST",
    "/grades",
    Some(PRINCIPAL),
    Some(json!({ "name": "Grade 5" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(etag.as_deref(), Some("\"1\""));
  let uri = format!("/grades/{}", grade["id"].as_str().unwrap());

  let (status, etag, renamed) = send_if_match(
    &app,
    "PATCH",
    &uri,
    Some(PRINCIPAL),
    Some("\"1\""),
    Some(json!({ "name": "Grade Five" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(etag.as_deref(), Some("\"2\""));
  assert_eq!(renamed["name"], "Grade Five");

  let (status, _, body) = send_if_match(
    &app,
    "PATCH",
    &uri,
    Some(PRINCIPAL),
    Some("1"),
    Some(json!({ "name": "Grade 5" })),
  )
  .await;
  assert_eq!(status, StatusCode::PRECONDITION_FAILED);
  assert_eq!(body["code"], "concurrent_modification");

  let (status, etag, _) = send(&app, "GET", &uri, Some(PRINCIPAL), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(etag.as_deref(), Some("\"2\""));
}

#[tokio::test]
async fn unknown_record_is_not_found() {
  let app = app().await;
  let uri = format!("/teachers/{}", uuid::Uuid::new_v4());
  let (status, _, body) = send(&app, "GET", &uri, Some(PRINCIPAL), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["code"], "not_found");
}

// ─── Ledger flows ────────────────────────────────────────────────────────────

#[tokio::test]
async fn unmapped_subject_cannot_be_enrolled() {
  let app = app().await;
  let school = school(&app).await;
  let art = post(&app, "/subjects", json!({ "name": "Art" })).await;

  let (status, _, body) = send(
    &app,
    "POST",
    "/enrollments",
    Some(PRINCIPAL),
    Some(json!({
      "student_id": school.student,
      "subject_id": art["id"],
      "teacher_id": school.teacher,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["code"], "subject_not_offered_for_grade");
}

#[tokio::test]
async fn mapped_subject_cannot_be_archived() {
  let app = app().await;
  let school = school(&app).await;
  let (status, _, body) = send(
    &app,
    "PUT",
    &format!("/subjects/{}/status", school.subject),
    Some(PRINCIPAL),
    Some(json!({ "status": "archive" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["code"], "has_active_dependents");
}

#[tokio::test]
async fn principal_records_payment_for_parent() {
  let app = app().await;
  let school = school(&app).await;
  let fee = post(
    &app,
    "/fees",
    json!({
      "grade_id": school.grade,
      "subject_id": school.subject,
      "teacher_id": school.teacher,
      "amount": 500,
      "valid_from": "2020-01-01",
    }),
  )
  .await;

  let (status, _, current) = send(
    &app,
    "GET",
    &format!(
      "/fees/current?grade_id={}&subject_id={}&teacher_id={}",
      school.grade, school.subject, school.teacher
    ),
    Some(PRINCIPAL),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(current["fee_id"], fee["fee_id"]);

  let payment = json!({
    "student_id": school.student,
    "fee_id": fee["fee_id"],
    "parent_id": school.parent,
    "amount_paid": 500,
    "payment_date": "2024-02-01",
  });

  // Parents read the ledger but the principal records the payment.
  let parent = format!("Test parent {}", school.parent);
  let (status, _, body) =
    send(&app, "POST", "/remittances", Some(&parent), Some(payment.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["code"], "forbidden");

  let (status, _, paid) =
    send(&app, "POST", "/remittances", Some(PRINCIPAL), Some(payment.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(paid["recorded_by"], "test-principal");
  assert_eq!(paid["parent_id"], school.parent.as_str());
  assert!(paid["receipt_number"].as_str().unwrap().starts_with("RCT-"));

  let (status, _, body) =
    send(&app, "POST", "/remittances", Some(PRINCIPAL), Some(payment)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["code"], "already_paid");

  let (status, _, ledger) = send(
    &app,
    "GET",
    &format!("/remittances?student_id={}", school.student),
    Some(&parent),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(ledger.as_array().unwrap().len(), 1);

  // Parents cannot void; principals can, and the void is audited.
  let void_uri = format!("/remittances/{}/void", paid["remittance_id"].as_str().unwrap());
  let reason = json!({ "reason": "entered twice" });
  let (status, _, _) =
    send(&app, "POST", &void_uri, Some(&parent), Some(reason.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _, entry) =
    send(&app, "POST", &void_uri, Some(PRINCIPAL), Some(reason)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(entry["actor"], "test-principal");

  let (_, _, audit) = send(&app, "GET", "/audit", Some(PRINCIPAL), None).await;
  assert_eq!(audit.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn teacher_change_returns_both_enrollments() {
  let app = app().await;
  let school = school(&app).await;
  let other = post(&app, "/teachers", json!({ "name": "Grace" })).await;

  let (_, _, list) = send(
    &app,
    "GET",
    &format!("/enrollments?student_id={}&status=live", school.student),
    Some("Test teacher"),
    None,
  )
  .await;
  let enrollment = list[0]["enrollment_id"].as_str().unwrap().to_owned();

  let (status, _, change) = send_if_match(
    &app,
    "POST",
    &format!("/enrollments/{enrollment}/teacher"),
    Some("Test teacher"),
    Some("\"1\""),
    Some(json!({ "teacher_id": other["teacher_id"] })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(change["previous"]["status"], "archive");
  assert_eq!(change["current"]["teacher_id"], other["teacher_id"]);
}
