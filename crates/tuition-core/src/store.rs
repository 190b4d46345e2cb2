//! The `LedgerStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `tuition-store-sqlite`).
//! Higher layers (`tuition-api`, `tuition-server`) depend on this abstraction,
//! not on any concrete backend.
//!
//! Every method is one atomic unit: a rejected call leaves all entities
//! unchanged. Backends must back each "duplicate" rule with a real uniqueness
//! constraint, not only a pre-check query.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  audit::AuditEntry,
  catalog::{CatalogEntry, CatalogKind, CatalogPatch, NewCatalogEntry},
  curriculum::{GradeSubject, NewGradeSubject},
  enrollment::{NewEnrollment, StudentSubject, TeacherChange},
  fee::{Fee, NewFee, RateKey},
  record::Status,
  remittance::{FeeRemittance, NewRemittance, RemittanceVoid},
  roster::{
    EnrolledStudent, NewParent, NewStudent, NewTeacher, Parent, ParentPatch,
    Student, StudentPatch, Teacher, TeacherPatch,
  },
};

/// Abstraction over a ledger backend.
///
/// `expected_version`, where accepted, makes the write conditional on the
/// record's current version and fails with
/// [`ConcurrentModification`](crate::Error::ConcurrentModification) otherwise.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait LedgerStore: Send + Sync {
  /// Backend error; converts into the domain taxonomy without losing the kind
  /// of domain failures.
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Catalog (Grade, Subject) ──────────────────────────────────────────

  /// Create a Live entry. Fails with `DuplicateName` if an active entry of
  /// the same kind already has the name.
  fn create_catalog_entry(
    &self,
    kind: CatalogKind,
    input: NewCatalogEntry,
  ) -> impl Future<Output = Result<CatalogEntry, Self::Error>> + Send + '_;

  fn get_catalog_entry(
    &self,
    kind: CatalogKind,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CatalogEntry>, Self::Error>> + Send + '_;

  fn list_catalog_entries(
    &self,
    kind: CatalogKind,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  fn update_catalog_entry(
    &self,
    kind: CatalogKind,
    id: Uuid,
    patch: CatalogPatch,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<CatalogEntry, Self::Error>> + Send + '_;

  /// Archiving fails with `HasActiveDependents` while Live mappings (or, for
  /// a grade, Live students) reference the entry.
  fn set_catalog_status(
    &self,
    kind: CatalogKind,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<CatalogEntry, Self::Error>> + Send + '_;

  /// Fails with `HasDependents` if any mapping, student or fee, of any
  /// status, references the entry.
  fn delete_catalog_entry(
    &self,
    kind: CatalogKind,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Curriculum (GradeSubject) ─────────────────────────────────────────

  /// Map a Live subject onto a Live grade. An archived mapping for the same
  /// pair is reactivated instead of inserting a second row.
  fn create_grade_subject(
    &self,
    input: NewGradeSubject,
  ) -> impl Future<Output = Result<GradeSubject, Self::Error>> + Send + '_;

  fn get_grade_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<GradeSubject>, Self::Error>> + Send + '_;

  fn list_grade_subjects(
    &self,
    grade_id: Option<Uuid>,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<GradeSubject>, Self::Error>> + Send + '_;

  /// Archiving never cascades to existing enrollments; it only blocks new
  /// ones.
  fn set_grade_subject_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<GradeSubject, Self::Error>> + Send + '_;

  fn delete_grade_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Roster: teachers ──────────────────────────────────────────────────

  fn create_teacher(
    &self,
    input: NewTeacher,
  ) -> impl Future<Output = Result<Teacher, Self::Error>> + Send + '_;

  fn get_teacher(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Teacher>, Self::Error>> + Send + '_;

  fn list_teachers(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<Teacher>, Self::Error>> + Send + '_;

  fn update_teacher(
    &self,
    id: Uuid,
    patch: TeacherPatch,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<Teacher, Self::Error>> + Send + '_;

  fn set_teacher_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<Teacher, Self::Error>> + Send + '_;

  fn delete_teacher(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Roster: parents ───────────────────────────────────────────────────

  fn create_parent(
    &self,
    input: NewParent,
  ) -> impl Future<Output = Result<Parent, Self::Error>> + Send + '_;

  fn get_parent(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Parent>, Self::Error>> + Send + '_;

  fn list_parents(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<Parent>, Self::Error>> + Send + '_;

  fn update_parent(
    &self,
    id: Uuid,
    patch: ParentPatch,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<Parent, Self::Error>> + Send + '_;

  fn set_parent_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<Parent, Self::Error>> + Send + '_;

  fn delete_parent(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Roster: students ──────────────────────────────────────────────────

  /// Create a student together with its initial enrollments; if any
  /// enrollment is rejected nothing is written.
  fn create_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<EnrolledStudent, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn list_students(
    &self,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  fn update_student(
    &self,
    id: Uuid,
    patch: StudentPatch,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn set_student_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn delete_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Enrollment ledger ─────────────────────────────────────────────────

  /// Enroll a Live student in a subject offered for the student's grade,
  /// under a Live teacher.
  fn enroll(
    &self,
    input: NewEnrollment,
  ) -> impl Future<Output = Result<StudentSubject, Self::Error>> + Send + '_;

  fn get_enrollment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<StudentSubject>, Self::Error>> + Send + '_;

  fn list_enrollments(
    &self,
    student_id: Option<Uuid>,
    status: Option<Status>,
  ) -> impl Future<Output = Result<Vec<StudentSubject>, Self::Error>> + Send + '_;

  /// Archive the enrollment and enroll the same student in the same subject
  /// under `teacher_id`, atomically.
  fn change_teacher(
    &self,
    id: Uuid,
    teacher_id: Uuid,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<TeacherChange, Self::Error>> + Send + '_;

  fn set_enrollment_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> impl Future<Output = Result<StudentSubject, Self::Error>> + Send + '_;

  fn delete_enrollment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Fee schedule ──────────────────────────────────────────────────────

  /// Record a new, immutable rate for a Live grade/subject/teacher triple.
  fn create_rate(
    &self,
    input: NewFee,
  ) -> impl Future<Output = Result<Fee, Self::Error>> + Send + '_;

  fn get_fee(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Fee>, Self::Error>> + Send + '_;

  fn list_fees(
    &self,
  ) -> impl Future<Output = Result<Vec<Fee>, Self::Error>> + Send + '_;

  /// All rates ever recorded for `key`, oldest first.
  fn list_rates(
    &self,
    key: RateKey,
  ) -> impl Future<Output = Result<Vec<Fee>, Self::Error>> + Send + '_;

  /// The rate in effect for `key` on `as_of`; `NotFound` if none.
  fn resolve_current_rate(
    &self,
    key: RateKey,
    as_of: NaiveDate,
  ) -> impl Future<Output = Result<Fee, Self::Error>> + Send + '_;

  /// Remove a rate that no remittance references.
  fn delete_rate(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Remittance ledger ─────────────────────────────────────────────────

  /// Record a payment. At most one remittance exists per (student, fee);
  /// a second attempt fails with `AlreadyPaid`.
  fn pay(
    &self,
    input: NewRemittance,
  ) -> impl Future<Output = Result<FeeRemittance, Self::Error>> + Send + '_;

  fn get_remittance(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FeeRemittance>, Self::Error>> + Send + '_;

  /// `NotFound` if the student does not exist.
  fn list_remittances_by_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<FeeRemittance>, Self::Error>> + Send + '_;

  fn list_remittances(
    &self,
  ) -> impl Future<Output = Result<Vec<FeeRemittance>, Self::Error>> + Send + '_;

  /// Administrative correction: remove a remittance and append an audit
  /// entry recording who removed it and why.
  fn void_remittance(
    &self,
    id: Uuid,
    request: RemittanceVoid,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  fn list_audit(
    &self,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;
}
