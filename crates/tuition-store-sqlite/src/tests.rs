//! Integration tests for `SqliteStore` against an in-memory database.

use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use tuition_core::{
  Error as CoreError, Status,
  catalog::{CatalogKind, CatalogPatch, NewCatalogEntry},
  curriculum::NewGradeSubject,
  enrollment::{NewEnrollment, SubjectChoice},
  fee::{NewFee, RateKey},
  remittance::{NewRemittance, RemittanceVoid},
  roster::{Contact, NewParent, NewStudent, NewTeacher, StudentPatch},
  store::LedgerStore,
};
use uuid::Uuid;

use crate::{SqliteStore, ops::unique_violation};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A database file in its own temp directory, removed on drop.
struct Scratch {
  dir:  PathBuf,
  path: PathBuf,
}

impl Scratch {
  fn new() -> Self {
    let dir = std::env::temp_dir().join(format!("tuition-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("ledger.sqlite3");
    Self { dir, path }
  }
}

impl Drop for Scratch {
  fn drop(&mut self) { std::fs::remove_dir_all(&self.dir).ok(); }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Unwrap the domain error out of a store failure.
fn domain<T: std::fmt::Debug>(res: crate::Result<T>) -> CoreError {
  CoreError::from(res.expect_err("expected a ledger error"))
}

/// Grade 5 with Math mapped, one teacher, one parent and a student enrolled
/// in Math under that teacher.
struct School {
  grade:      Uuid,
  subject:    Uuid,
  mapping:    Uuid,
  teacher:    Uuid,
  parent:     Uuid,
  student:    Uuid,
  enrollment: Uuid,
}

async fn school(s: &SqliteStore) -> School {
  let grade = s
    .create_catalog_entry(CatalogKind::Grade, NewCatalogEntry::new("Grade 5"))
    .await
    .unwrap()
    .id;
  let subject = s
    .create_catalog_entry(CatalogKind::Subject, NewCatalogEntry::new("Math"))
    .await
    .unwrap()
    .id;
  let mapping = s
    .create_grade_subject(NewGradeSubject { grade_id: grade, subject_id: subject })
    .await
    .unwrap()
    .grade_subject_id;
  let teacher = teacher(s, "T1").await;
  let parent = s
    .create_parent(NewParent { name: "P1".into(), contact: Contact::default() })
    .await
    .unwrap()
    .parent_id;
  let created = s
    .create_student(NewStudent {
      name:      "S1".into(),
      contact:   Contact::default(),
      parent_id: parent,
      grade_id:  grade,
      subjects:  vec![SubjectChoice { subject_id: subject, teacher_id: teacher }],
    })
    .await
    .unwrap();
  School {
    grade,
    subject,
    mapping,
    teacher,
    parent,
    student: created.student.student_id,
    enrollment: created.enrollments[0].enrollment_id,
  }
}

async fn teacher(s: &SqliteStore, name: &str) -> Uuid {
  s.create_teacher(NewTeacher {
    name:          name.into(),
    contact:       Contact::default(),
    qualification: None,
  })
  .await
  .unwrap()
  .teacher_id
}

async fn second_student(s: &SqliteStore, school: &School) -> crate::Result<Uuid> {
  let created = s
    .create_student(NewStudent {
      name:      "S2".into(),
      contact:   Contact::default(),
      parent_id: school.parent,
      grade_id:  school.grade,
      subjects:  vec![SubjectChoice { subject_id: school.subject, teacher_id: school.teacher }],
    })
    .await?;
  Ok(created.student.student_id)
}

fn rate(school: &School, amount: i64, valid_from: NaiveDate) -> NewFee {
  NewFee {
    grade_id: school.grade,
    subject_id: school.subject,
    teacher_id: school.teacher,
    amount,
    valid_from,
  }
}

fn payment(school: &School, fee_id: Uuid) -> NewRemittance {
  NewRemittance {
    student_id:   school.student,
    fee_id,
    parent_id:    school.parent,
    amount_paid:  500,
    payment_date: date(2024, 2, 1),
    recorded_by:  "p1".into(),
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_round_trips() {
  let s = store().await;
  let created = s
    .create_catalog_entry(CatalogKind::Subject, NewCatalogEntry {
      name:        "Science".into(),
      description: Some("Lab work".into()),
    })
    .await
    .unwrap();

  let fetched = s
    .get_catalog_entry(CatalogKind::Subject, created.id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched, created);
  assert_eq!(fetched.meta.status, Status::Live);
  assert_eq!(fetched.meta.version, 1);

  // Grades and subjects are separate collections.
  assert!(
    s.get_catalog_entry(CatalogKind::Grade, created.id)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn live_names_are_unique_per_kind() {
  let s = store().await;
  let first = s
    .create_catalog_entry(CatalogKind::Grade, NewCatalogEntry::new("Grade 5"))
    .await
    .unwrap();
  let err = domain(
    s.create_catalog_entry(CatalogKind::Grade, NewCatalogEntry::new("Grade 5"))
      .await,
  );
  assert!(matches!(err, CoreError::DuplicateName { .. }));

  // The same name is fine in the other catalog and once the first is archived.
  s.create_catalog_entry(CatalogKind::Subject, NewCatalogEntry::new("Grade 5"))
    .await
    .unwrap();
  s.set_catalog_status(CatalogKind::Grade, first.id, Status::Archive, None)
    .await
    .unwrap();
  s.create_catalog_entry(CatalogKind::Grade, NewCatalogEntry::new("Grade 5"))
    .await
    .unwrap();

  // Restoring the archived one would now clash.
  let err = domain(
    s.set_catalog_status(CatalogKind::Grade, first.id, Status::Live, None)
      .await,
  );
  assert!(matches!(err, CoreError::DuplicateName { .. }));
}

#[tokio::test]
async fn set_status_to_current_value_is_a_no_op() {
  let s = store().await;
  let entry = s
    .create_catalog_entry(CatalogKind::Grade, NewCatalogEntry::new("Grade 1"))
    .await
    .unwrap();
  let same = s
    .set_catalog_status(CatalogKind::Grade, entry.id, Status::Live, Some(1))
    .await
    .unwrap();
  assert_eq!(same, entry);
}

#[tokio::test]
async fn stale_version_is_rejected() {
  let s = store().await;
  let entry = s
    .create_catalog_entry(CatalogKind::Subject, NewCatalogEntry::new("Art"))
    .await
    .unwrap();
  let patch = CatalogPatch { name: Some("Fine Art".into()), description: None };
  let updated = s
    .update_catalog_entry(CatalogKind::Subject, entry.id, patch.clone(), Some(1))
    .await
    .unwrap();
  assert_eq!(updated.name, "Fine Art");
  assert_eq!(updated.meta.version, 2);

  let err = domain(
    s.update_catalog_entry(CatalogKind::Subject, entry.id, patch, Some(1))
      .await,
  );
  assert!(matches!(
    err,
    CoreError::ConcurrentModification { expected: 1, actual: 2, .. }
  ));
}

#[tokio::test]
async fn archiving_a_mapped_subject_is_blocked() {
  let s = store().await;
  let school = school(&s).await;
  let err = domain(
    s.set_catalog_status(CatalogKind::Subject, school.subject, Status::Archive, None)
      .await,
  );
  assert!(matches!(err, CoreError::HasActiveDependents { .. }));
}

#[tokio::test]
async fn missing_entry_is_not_found() {
  let s = store().await;
  let err = domain(
    s.set_catalog_status(CatalogKind::Grade, Uuid::new_v4(), Status::Archive, None)
      .await,
  );
  assert!(matches!(err, CoreError::NotFound { .. }));
  let err = domain(s.delete_catalog_entry(CatalogKind::Grade, Uuid::new_v4()).await);
  assert!(matches!(err, CoreError::NotFound { .. }));
}

// ─── Curriculum ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_mapping_until_archived() {
  let s = store().await;
  let school = school(&s).await;
  let pair = NewGradeSubject { grade_id: school.grade, subject_id: school.subject };

  let err = domain(s.create_grade_subject(pair).await);
  assert!(matches!(err, CoreError::DuplicateMapping { .. }));

  s.set_grade_subject_status(school.mapping, Status::Archive, None)
    .await
    .unwrap();
  let again = s.create_grade_subject(pair).await.unwrap();
  assert_eq!(again.grade_subject_id, school.mapping);
  assert_eq!(again.meta.status, Status::Live);
  assert_eq!(again.meta.version, 3);

  let live = s
    .list_grade_subjects(Some(school.grade), Some(Status::Live))
    .await
    .unwrap();
  assert_eq!(live.len(), 1);
}

#[tokio::test]
async fn mapping_requires_live_catalog_entries() {
  let s = store().await;
  let grade = s
    .create_catalog_entry(CatalogKind::Grade, NewCatalogEntry::new("Grade 2"))
    .await
    .unwrap();
  let err = domain(
    s.create_grade_subject(NewGradeSubject {
      grade_id:   grade.id,
      subject_id: Uuid::new_v4(),
    })
    .await,
  );
  assert!(matches!(err, CoreError::NotFound { .. }));
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_duplicate_enrollment() {
  let s = store().await;
  let school = school(&s).await;

  let e1 = s.get_enrollment(school.enrollment).await.unwrap().unwrap();
  assert_eq!(e1.grade_subject_id, school.mapping);
  assert_eq!(e1.meta.status, Status::Live);

  let err = domain(
    s.enroll(NewEnrollment {
      student_id: school.student,
      subject_id: school.subject,
      teacher_id: school.teacher,
    })
    .await,
  );
  assert!(matches!(err, CoreError::DuplicateEnrollment { .. }));
}

#[tokio::test]
async fn scenario_b_pay_once() {
  let s = store().await;
  let school = school(&s).await;
  let fee = s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();

  let paid = s.pay(payment(&school, fee.fee_id)).await.unwrap();
  assert!(paid.receipt_number.starts_with("RCT-20240201-"));
  assert_eq!(paid.enrollment_id, school.enrollment);

  let err = domain(s.pay(payment(&school, fee.fee_id)).await);
  match err {
    CoreError::AlreadyPaid { remittance_id, .. } => {
      assert_eq!(remittance_id, paid.remittance_id)
    }
    other => panic!("expected AlreadyPaid, got {other:?}"),
  }
  let ledger = s.list_remittances_by_student(school.student).await.unwrap();
  assert_eq!(ledger, vec![paid]);
}

#[tokio::test]
async fn scenario_c_archived_mapping_blocks_new_enrollments() {
  let s = store().await;
  let school = school(&s).await;
  let science = s
    .create_catalog_entry(CatalogKind::Subject, NewCatalogEntry::new("Science"))
    .await
    .unwrap()
    .id;
  s.create_grade_subject(NewGradeSubject { grade_id: school.grade, subject_id: science })
    .await
    .unwrap();
  let s2 = s
    .create_student(NewStudent {
      name:      "S2".into(),
      contact:   Contact::default(),
      parent_id: school.parent,
      grade_id:  school.grade,
      subjects:  vec![SubjectChoice { subject_id: science, teacher_id: school.teacher }],
    })
    .await
    .unwrap()
    .student
    .student_id;

  s.set_grade_subject_status(school.mapping, Status::Archive, None)
    .await
    .unwrap();

  let err = domain(
    s.enroll(NewEnrollment {
      student_id: s2,
      subject_id: school.subject,
      teacher_id: school.teacher,
    })
    .await,
  );
  assert!(matches!(err, CoreError::SubjectNotOfferedForGrade { .. }));
  assert_eq!(s.list_enrollments(Some(s2), None).await.unwrap().len(), 1);

  let e1 = s.get_enrollment(school.enrollment).await.unwrap().unwrap();
  assert_eq!(e1.meta.status, Status::Live);
}

#[tokio::test]
async fn scenario_d_mapped_subject_cannot_be_deleted() {
  let s = store().await;
  let school = school(&s).await;
  s.set_grade_subject_status(school.mapping, Status::Archive, None)
    .await
    .unwrap();
  let err = domain(
    s.delete_catalog_entry(CatalogKind::Subject, school.subject)
      .await,
  );
  assert!(matches!(err, CoreError::HasDependents { .. }));
}

// ─── Roster & enrollment ─────────────────────────────────────────────────────

#[tokio::test]
async fn unmapped_subject_is_not_offered() {
  let s = store().await;
  let school = school(&s).await;
  let art = s
    .create_catalog_entry(CatalogKind::Subject, NewCatalogEntry::new("Art"))
    .await
    .unwrap();
  let err = domain(
    s.enroll(NewEnrollment {
      student_id: school.student,
      subject_id: art.id,
      teacher_id: school.teacher,
    })
    .await,
  );
  assert!(matches!(err, CoreError::SubjectNotOfferedForGrade { .. }));
}

#[tokio::test]
async fn failed_initial_enrollment_writes_nothing() {
  let s = store().await;
  let school = school(&s).await;
  let result = s
    .create_student(NewStudent {
      name:      "S3".into(),
      contact:   Contact::default(),
      parent_id: school.parent,
      grade_id:  school.grade,
      subjects:  vec![
        SubjectChoice { subject_id: school.subject, teacher_id: school.teacher },
        SubjectChoice { subject_id: school.subject, teacher_id: Uuid::new_v4() },
      ],
    })
    .await;
  assert!(matches!(domain(result), CoreError::NotFound { .. }));

  assert_eq!(s.list_students(None).await.unwrap().len(), 1);
  assert_eq!(s.list_enrollments(None, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn change_teacher_archives_and_re_enrolls() {
  let s = store().await;
  let school = school(&s).await;
  let t2 = teacher(&s, "T2").await;

  let change = s
    .change_teacher(school.enrollment, t2, Some(1))
    .await
    .unwrap();
  assert_eq!(change.previous.enrollment_id, school.enrollment);
  assert_eq!(change.previous.meta.status, Status::Archive);
  assert_eq!(change.current.teacher_id, t2);
  assert_eq!(change.current.meta.status, Status::Live);

  let live = s
    .list_enrollments(Some(school.student), Some(Status::Live))
    .await
    .unwrap();
  assert_eq!(live, vec![change.current]);
}

#[tokio::test]
async fn grade_change_needs_enrollments_archived() {
  let s = store().await;
  let school = school(&s).await;
  let grade6 = s
    .create_catalog_entry(CatalogKind::Grade, NewCatalogEntry::new("Grade 6"))
    .await
    .unwrap();
  let patch = StudentPatch { grade_id: Some(grade6.id), ..Default::default() };

  let err = domain(s.update_student(school.student, patch.clone(), None).await);
  assert!(matches!(err, CoreError::HasActiveDependents { .. }));

  s.set_enrollment_status(school.enrollment, Status::Archive, None)
    .await
    .unwrap();
  let moved = s.update_student(school.student, patch, None).await.unwrap();
  assert_eq!(moved.grade_id, grade6.id);

  // The old enrollment's mapping is not the student's grade any more.
  let err = domain(
    s.set_enrollment_status(school.enrollment, Status::Live, None)
      .await,
  );
  assert!(matches!(err, CoreError::SubjectNotOfferedForGrade { .. }));
}

#[tokio::test]
async fn dependents_block_archive_and_delete() {
  let s = store().await;
  let school = school(&s).await;

  let err = domain(s.set_teacher_status(school.teacher, Status::Archive, None).await);
  assert!(matches!(err, CoreError::HasActiveDependents { .. }));
  let err = domain(s.set_parent_status(school.parent, Status::Archive, None).await);
  assert!(matches!(err, CoreError::HasActiveDependents { .. }));
  let err = domain(s.delete_student(school.student).await);
  assert!(matches!(err, CoreError::HasDependents { .. }));
  let err = domain(s.delete_grade_subject(school.mapping).await);
  assert!(matches!(err, CoreError::HasDependents { .. }));

  s.delete_enrollment(school.enrollment).await.unwrap();
  s.delete_student(school.student).await.unwrap();
  s.delete_parent(school.parent).await.unwrap();
  s.delete_grade_subject(school.mapping).await.unwrap();
  s.delete_catalog_entry(CatalogKind::Subject, school.subject)
    .await
    .unwrap();
}

// ─── Fees ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rates_resolve_by_date() {
  let s = store().await;
  let school = school(&s).await;
  let first = s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();
  let second = s.create_rate(rate(&school, 650, date(2024, 9, 1))).await.unwrap();
  let key = first.key();

  let resolved = s.resolve_current_rate(key, date(2024, 3, 1)).await.unwrap();
  assert_eq!(resolved, first);
  let resolved = s.resolve_current_rate(key, date(2025, 1, 1)).await.unwrap();
  assert_eq!(resolved, second);
  let err = domain(s.resolve_current_rate(key, date(2023, 6, 1)).await);
  assert!(matches!(err, CoreError::NotFound { .. }));

  assert_eq!(s.list_rates(key).await.unwrap(), vec![first, second]);
}

#[tokio::test]
async fn rates_must_move_forward() {
  let s = store().await;
  let school = school(&s).await;
  s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();

  let err = domain(s.create_rate(rate(&school, 550, date(2024, 1, 1))).await);
  assert!(matches!(err, CoreError::DuplicateRate { .. }));
  let err = domain(s.create_rate(rate(&school, 450, date(2023, 12, 1))).await);
  assert!(matches!(err, CoreError::DuplicateRate { .. }));
  let err = domain(s.create_rate(rate(&school, 0, date(2024, 6, 1))).await);
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn paid_rate_cannot_be_deleted() {
  let s = store().await;
  let school = school(&s).await;
  let fee = s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();
  s.pay(payment(&school, fee.fee_id)).await.unwrap();

  let err = domain(s.delete_rate(fee.fee_id).await);
  assert!(matches!(err, CoreError::HasDependents { .. }));
}

// ─── Remittances ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn payment_requires_matching_enrollment() {
  let s = store().await;
  let school = school(&s).await;
  let fee = s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();
  s.set_enrollment_status(school.enrollment, Status::Archive, None)
    .await
    .unwrap();

  let err = domain(s.pay(payment(&school, fee.fee_id)).await);
  assert!(matches!(err, CoreError::EnrollmentMismatch { .. }));
}

#[tokio::test]
async fn payment_by_another_parent_is_invalid() {
  let s = store().await;
  let school = school(&s).await;
  let fee = s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();
  let stranger = s
    .create_parent(NewParent { name: "P2".into(), contact: Contact::default() })
    .await
    .unwrap();

  let mut input = payment(&school, fee.fee_id);
  input.parent_id = stranger.parent_id;
  assert!(matches!(domain(s.pay(input).await), CoreError::Validation(_)));
}

#[tokio::test]
async fn exhausted_receipt_numbers_fail_cleanly() {
  let s = store()
    .await
    .with_receipt_issuer(Arc::new(|_: NaiveDate| "RCT-FIXED".to_owned()));
  let school = school(&s).await;
  let fee = s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();
  s.pay(payment(&school, fee.fee_id)).await.unwrap();

  let s2 = second_student(&s, &school).await.unwrap();
  let mut input = payment(&school, fee.fee_id);
  input.student_id = s2;
  let err = domain(s.pay(input).await);
  assert!(matches!(err, CoreError::ReceiptCollision { attempts: 5 }));
  assert_eq!(s.list_remittances_by_student(s2).await.unwrap(), vec![]);
}

#[tokio::test]
async fn void_removes_and_audits() {
  let s = store().await;
  let school = school(&s).await;
  let fee = s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();
  let paid = s.pay(payment(&school, fee.fee_id)).await.unwrap();

  let blank = RemittanceVoid { reason: " ".into(), actor: "admin".into() };
  let err = domain(s.void_remittance(paid.remittance_id, blank).await);
  assert!(matches!(err, CoreError::Validation(_)));

  let entry = s
    .void_remittance(paid.remittance_id, RemittanceVoid {
      reason: "entered twice".into(),
      actor:  "admin".into(),
    })
    .await
    .unwrap();
  assert_eq!(entry.entity_id, paid.remittance_id);
  assert_eq!(entry.snapshot["receipt_number"], paid.receipt_number.as_str());

  assert!(s.get_remittance(paid.remittance_id).await.unwrap().is_none());
  assert_eq!(s.list_audit().await.unwrap(), vec![entry]);

  // The fee can be paid again after a void.
  s.pay(payment(&school, fee.fee_id)).await.unwrap();
}

#[tokio::test]
async fn unknown_student_has_no_ledger() {
  let s = store().await;
  let err = domain(s.list_remittances_by_student(Uuid::new_v4()).await);
  assert!(matches!(err, CoreError::NotFound { .. }));
}

// ─── Concurrency & constraints ───────────────────────────────────────────────

#[tokio::test]
async fn concurrent_double_payment_inserts_once() {
  let db = Scratch::new();
  let a = SqliteStore::open(&db.path).await.unwrap();
  let b = SqliteStore::open(&db.path).await.unwrap();
  let school = school(&a).await;
  let fee = a.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();

  let (left, right) = tokio::join!(
    a.pay(payment(&school, fee.fee_id)),
    b.pay(payment(&school, fee.fee_id)),
  );
  let outcomes = [left, right];
  let successes = outcomes.iter().filter(|r| r.is_ok()).count();
  assert_eq!(successes, 1);
  for failure in outcomes.into_iter().filter_map(Result::err) {
    assert!(matches!(
      CoreError::from(failure),
      CoreError::AlreadyPaid { .. }
    ));
  }
  assert_eq!(a.list_remittances().await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_enrollment_inserts_once() {
  let db = Scratch::new();
  let a = SqliteStore::open(&db.path).await.unwrap();
  let b = SqliteStore::open(&db.path).await.unwrap();
  let school = school(&a).await;
  let t2 = teacher(&a, "T2").await;
  let input = NewEnrollment {
    student_id: school.student,
    subject_id: school.subject,
    teacher_id: t2,
  };

  let (left, right) = tokio::join!(a.enroll(input), b.enroll(input));
  let outcomes = [left, right];
  assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
  for failure in outcomes.into_iter().filter_map(Result::err) {
    assert!(matches!(
      CoreError::from(failure),
      CoreError::DuplicateEnrollment { teacher_id, .. } if teacher_id == t2
    ));
  }
  let live = b
    .list_enrollments(Some(school.student), Some(Status::Live))
    .await
    .unwrap();
  assert_eq!(live.len(), 2);
}

#[tokio::test]
async fn concurrent_mapping_inserts_once() {
  let db = Scratch::new();
  let a = SqliteStore::open(&db.path).await.unwrap();
  let b = SqliteStore::open(&db.path).await.unwrap();
  let school = school(&a).await;
  let art = a
    .create_catalog_entry(CatalogKind::Subject, NewCatalogEntry::new("Art"))
    .await
    .unwrap()
    .id;
  let input = NewGradeSubject { grade_id: school.grade, subject_id: art };

  let (left, right) = tokio::join!(
    a.create_grade_subject(input),
    b.create_grade_subject(input),
  );
  let outcomes = [left, right];
  assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
  for failure in outcomes.into_iter().filter_map(Result::err) {
    assert!(matches!(
      CoreError::from(failure),
      CoreError::DuplicateMapping { subject_id, .. } if subject_id == art
    ));
  }
  let mappings = a
    .list_grade_subjects(Some(school.grade), Some(Status::Live))
    .await
    .unwrap();
  assert_eq!(mappings.len(), 2);
}

/// Writes that skip the store's own checks still cannot create a second
/// Live row where one is already Live; an archived copy is accepted.
#[tokio::test]
async fn live_duplicates_are_rejected_by_the_schema() {
  let db = Scratch::new();
  let s = SqliteStore::open(&db.path).await.unwrap();
  school(&s).await;
  let raw = rusqlite::Connection::open(&db.path).unwrap();

  let tables = [
    ("grades", "grade_id", "name, description"),
    ("subjects", "subject_id", "name, description"),
    ("grade_subjects", "grade_subject_id", "grade_id, subject_id"),
    (
      "student_subjects",
      "enrollment_id",
      "student_id, subject_id, teacher_id, grade_subject_id",
    ),
  ];
  for (table, id_col, columns) in tables {
    let copy = format!(
      "INSERT INTO {table} ({id_col}, {columns}, status, version, created_at, updated_at)
       SELECT ?1, {columns}, ?2, version, created_at, updated_at
       FROM {table} WHERE status = 'live'"
    );

    let err = raw
      .execute(&copy, [Uuid::new_v4().to_string(), "live".into()])
      .expect_err(table);
    let err = crate::Error::from(err);
    let message = unique_violation(&err).unwrap_or_else(|| panic!("{table}: {err}"));
    assert!(message.contains(&format!("{table}.")), "{table}: {message}");

    let archived = raw
      .execute(&copy, [Uuid::new_v4().to_string(), "archive".into()])
      .unwrap();
    assert_eq!(archived, 1, "{table}");
  }
}

#[tokio::test]
async fn rate_key_filters_history() {
  let s = store().await;
  let school = school(&s).await;
  let t2 = teacher(&s, "T2").await;
  s.create_rate(rate(&school, 500, date(2024, 1, 1))).await.unwrap();

  let other = RateKey {
    grade_id:   school.grade,
    subject_id: school.subject,
    teacher_id: t2,
  };
  assert!(s.list_rates(other).await.unwrap().is_empty());
  assert_eq!(s.list_fees().await.unwrap().len(), 1);
}
