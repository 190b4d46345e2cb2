//! [`SqliteStore`]: the SQLite implementation of [`LedgerStore`].

use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use rusqlite::TransactionBehavior;
use uuid::Uuid;

use tuition_core::{
  audit::AuditEntry,
  catalog::{CatalogEntry, CatalogKind, CatalogPatch, NewCatalogEntry},
  curriculum::{GradeSubject, NewGradeSubject},
  enrollment::{NewEnrollment, StudentSubject, TeacherChange},
  fee::{Fee, NewFee, RateKey},
  record::Status,
  remittance::{self, FeeRemittance, NewRemittance, RemittanceVoid},
  roster::{
    EnrolledStudent, NewParent, NewStudent, NewTeacher, Parent, ParentPatch,
    Student, StudentPatch, Teacher, TeacherPatch,
  },
  store::LedgerStore,
};

use crate::{Error, Result, ops, schema::SCHEMA};

/// Produces a receipt number for a payment date.
pub type ReceiptIssuer = Arc<dyn Fn(NaiveDate) -> String + Send + Sync>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tuition ledger backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  receipts: ReceiptIssuer,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Replace the receipt number generator.
  pub fn with_receipt_issuer(mut self, issuer: ReceiptIssuer) -> Self {
    self.receipts = issuer;
    self
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      receipts: Arc::new(remittance::issue_receipt_number),
    })
  }

  /// Run `op` inside a `BEGIN IMMEDIATE` transaction, committing only when it
  /// succeeds.
  async fn write<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = op(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }

  /// Run `op` inside a deferred (read) transaction.
  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        Ok(op(&tx))
      })
      .await?
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn create_catalog_entry(
    &self,
    kind: CatalogKind,
    input: NewCatalogEntry,
  ) -> Result<CatalogEntry> {
    let entry = self
      .write(move |conn| ops::catalog::create(conn, kind, input))
      .await?;
    tracing::info!(kind = ?kind, id = %entry.id, name = %entry.name, "catalog entry created");
    Ok(entry)
  }

  async fn get_catalog_entry(
    &self,
    kind: CatalogKind,
    id: Uuid,
  ) -> Result<Option<CatalogEntry>> {
    self.read(move |conn| ops::catalog::get(conn, kind, id)).await
  }

  async fn list_catalog_entries(
    &self,
    kind: CatalogKind,
    status: Option<Status>,
  ) -> Result<Vec<CatalogEntry>> {
    self.read(move |conn| ops::catalog::list(conn, kind, status)).await
  }

  async fn update_catalog_entry(
    &self,
    kind: CatalogKind,
    id: Uuid,
    patch: CatalogPatch,
    expected_version: Option<i64>,
  ) -> Result<CatalogEntry> {
    self
      .write(move |conn| {
        ops::catalog::update(conn, kind, id, patch, expected_version)
      })
      .await
  }

  async fn set_catalog_status(
    &self,
    kind: CatalogKind,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> Result<CatalogEntry> {
    let entry = self
      .write(move |conn| {
        ops::catalog::set_status(conn, kind, id, status, expected_version)
      })
      .await?;
    tracing::info!(kind = ?kind, %id, %status, "catalog entry status set");
    Ok(entry)
  }

  async fn delete_catalog_entry(&self, kind: CatalogKind, id: Uuid) -> Result<()> {
    self
      .write(move |conn| ops::catalog::delete(conn, kind, id))
      .await?;
    tracing::info!(kind = ?kind, %id, "catalog entry deleted");
    Ok(())
  }

  // ── Curriculum ────────────────────────────────────────────────────────────

  async fn create_grade_subject(
    &self,
    input: NewGradeSubject,
  ) -> Result<GradeSubject> {
    let mapping = self
      .write(move |conn| ops::curriculum::create(conn, input))
      .await?;
    tracing::info!(
      id = %mapping.grade_subject_id,
      grade = %mapping.grade_id,
      subject = %mapping.subject_id,
      "grade subject mapped"
    );
    Ok(mapping)
  }

  async fn get_grade_subject(&self, id: Uuid) -> Result<Option<GradeSubject>> {
    self.read(move |conn| ops::curriculum::get(conn, id)).await
  }

  async fn list_grade_subjects(
    &self,
    grade_id: Option<Uuid>,
    status: Option<Status>,
  ) -> Result<Vec<GradeSubject>> {
    self
      .read(move |conn| ops::curriculum::list(conn, grade_id, status))
      .await
  }

  async fn set_grade_subject_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> Result<GradeSubject> {
    self
      .write(move |conn| {
        ops::curriculum::set_status(conn, id, status, expected_version)
      })
      .await
  }

  async fn delete_grade_subject(&self, id: Uuid) -> Result<()> {
    self
      .write(move |conn| ops::curriculum::delete(conn, id))
      .await
  }

  // ── Teachers ──────────────────────────────────────────────────────────────

  async fn create_teacher(&self, input: NewTeacher) -> Result<Teacher> {
    self
      .write(move |conn| ops::roster::create_teacher(conn, input))
      .await
  }

  async fn get_teacher(&self, id: Uuid) -> Result<Option<Teacher>> {
    self.read(move |conn| ops::roster::get_teacher(conn, id)).await
  }

  async fn list_teachers(&self, status: Option<Status>) -> Result<Vec<Teacher>> {
    self
      .read(move |conn| ops::roster::list_teachers(conn, status))
      .await
  }

  async fn update_teacher(
    &self,
    id: Uuid,
    patch: TeacherPatch,
    expected_version: Option<i64>,
  ) -> Result<Teacher> {
    self
      .write(move |conn| {
        ops::roster::update_teacher(conn, id, patch, expected_version)
      })
      .await
  }

  async fn set_teacher_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> Result<Teacher> {
    self
      .write(move |conn| {
        ops::roster::set_teacher_status(conn, id, status, expected_version)
      })
      .await
  }

  async fn delete_teacher(&self, id: Uuid) -> Result<()> {
    self
      .write(move |conn| ops::roster::delete_teacher(conn, id))
      .await
  }

  // ── Parents ───────────────────────────────────────────────────────────────

  async fn create_parent(&self, input: NewParent) -> Result<Parent> {
    self
      .write(move |conn| ops::roster::create_parent(conn, input))
      .await
  }

  async fn get_parent(&self, id: Uuid) -> Result<Option<Parent>> {
    self.read(move |conn| ops::roster::get_parent(conn, id)).await
  }

  async fn list_parents(&self, status: Option<Status>) -> Result<Vec<Parent>> {
    self
      .read(move |conn| ops::roster::list_parents(conn, status))
      .await
  }

  async fn update_parent(
    &self,
    id: Uuid,
    patch: ParentPatch,
    expected_version: Option<i64>,
  ) -> Result<Parent> {
    self
      .write(move |conn| {
        ops::roster::update_parent(conn, id, patch, expected_version)
      })
      .await
  }

  async fn set_parent_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> Result<Parent> {
    self
      .write(move |conn| {
        ops::roster::set_parent_status(conn, id, status, expected_version)
      })
      .await
  }

  async fn delete_parent(&self, id: Uuid) -> Result<()> {
    self
      .write(move |conn| ops::roster::delete_parent(conn, id))
      .await
  }

  // ── Students ──────────────────────────────────────────────────────────────

  async fn create_student(&self, input: NewStudent) -> Result<EnrolledStudent> {
    let created = self
      .write(move |conn| ops::roster::create_student(conn, input))
      .await?;
    tracing::info!(
      id = %created.student.student_id,
      enrollments = created.enrollments.len(),
      "student created"
    );
    Ok(created)
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    self.read(move |conn| ops::roster::get_student(conn, id)).await
  }

  async fn list_students(&self, status: Option<Status>) -> Result<Vec<Student>> {
    self
      .read(move |conn| ops::roster::list_students(conn, status))
      .await
  }

  async fn update_student(
    &self,
    id: Uuid,
    patch: StudentPatch,
    expected_version: Option<i64>,
  ) -> Result<Student> {
    self
      .write(move |conn| {
        ops::roster::update_student(conn, id, patch, expected_version)
      })
      .await
  }

  async fn set_student_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> Result<Student> {
    self
      .write(move |conn| {
        ops::roster::set_student_status(conn, id, status, expected_version)
      })
      .await
  }

  async fn delete_student(&self, id: Uuid) -> Result<()> {
    self
      .write(move |conn| ops::roster::delete_student(conn, id))
      .await
  }

  // ── Enrollments ───────────────────────────────────────────────────────────

  async fn enroll(&self, input: NewEnrollment) -> Result<StudentSubject> {
    let enrollment = self
      .write(move |conn| ops::enrollment::enroll(conn, input))
      .await?;
    tracing::info!(
      id = %enrollment.enrollment_id,
      student = %enrollment.student_id,
      subject = %enrollment.subject_id,
      teacher = %enrollment.teacher_id,
      "student enrolled"
    );
    Ok(enrollment)
  }

  async fn get_enrollment(&self, id: Uuid) -> Result<Option<StudentSubject>> {
    self.read(move |conn| ops::enrollment::get(conn, id)).await
  }

  async fn list_enrollments(
    &self,
    student_id: Option<Uuid>,
    status: Option<Status>,
  ) -> Result<Vec<StudentSubject>> {
    self
      .read(move |conn| ops::enrollment::list(conn, student_id, status))
      .await
  }

  async fn change_teacher(
    &self,
    id: Uuid,
    teacher_id: Uuid,
    expected_version: Option<i64>,
  ) -> Result<TeacherChange> {
    let change = self
      .write(move |conn| {
        ops::enrollment::change_teacher(conn, id, teacher_id, expected_version)
      })
      .await?;
    tracing::info!(
      previous = %change.previous.enrollment_id,
      current = %change.current.enrollment_id,
      teacher = %teacher_id,
      "enrollment teacher changed"
    );
    Ok(change)
  }

  async fn set_enrollment_status(
    &self,
    id: Uuid,
    status: Status,
    expected_version: Option<i64>,
  ) -> Result<StudentSubject> {
    self
      .write(move |conn| {
        ops::enrollment::set_status(conn, id, status, expected_version)
      })
      .await
  }

  async fn delete_enrollment(&self, id: Uuid) -> Result<()> {
    self
      .write(move |conn| ops::enrollment::delete(conn, id))
      .await
  }

  // ── Fees ──────────────────────────────────────────────────────────────────

  async fn create_rate(&self, input: NewFee) -> Result<Fee> {
    let rate = self.write(move |conn| ops::fees::create(conn, input)).await?;
    tracing::info!(
      id = %rate.fee_id,
      key = %rate.key(),
      amount = rate.amount,
      valid_from = %rate.valid_from,
      "rate recorded"
    );
    Ok(rate)
  }

  async fn get_fee(&self, id: Uuid) -> Result<Option<Fee>> {
    self.read(move |conn| ops::fees::get(conn, id)).await
  }

  async fn list_fees(&self) -> Result<Vec<Fee>> {
    self.read(ops::fees::list).await
  }

  async fn list_rates(&self, key: RateKey) -> Result<Vec<Fee>> {
    self.read(move |conn| ops::fees::list_rates(conn, key)).await
  }

  async fn resolve_current_rate(
    &self,
    key: RateKey,
    as_of: NaiveDate,
  ) -> Result<Fee> {
    self
      .read(move |conn| ops::fees::resolve_current(conn, key, as_of))
      .await
  }

  async fn delete_rate(&self, id: Uuid) -> Result<()> {
    self.write(move |conn| ops::fees::delete(conn, id)).await?;
    tracing::info!(%id, "rate deleted");
    Ok(())
  }

  // ── Remittances ───────────────────────────────────────────────────────────

  async fn pay(&self, input: NewRemittance) -> Result<FeeRemittance> {
    let issue = Arc::clone(&self.receipts);
    let remittance = self
      .write(move |conn| ops::remittances::pay(conn, input, &*issue))
      .await?;
    tracing::info!(
      id = %remittance.remittance_id,
      student = %remittance.student_id,
      fee = %remittance.fee_id,
      receipt = %remittance.receipt_number,
      "remittance recorded"
    );
    Ok(remittance)
  }

  async fn get_remittance(&self, id: Uuid) -> Result<Option<FeeRemittance>> {
    self.read(move |conn| ops::remittances::get(conn, id)).await
  }

  async fn list_remittances_by_student(
    &self,
    student_id: Uuid,
  ) -> Result<Vec<FeeRemittance>> {
    self
      .read(move |conn| ops::remittances::list_by_student(conn, student_id))
      .await
  }

  async fn list_remittances(&self) -> Result<Vec<FeeRemittance>> {
    self.read(ops::remittances::list).await
  }

  async fn void_remittance(
    &self,
    id: Uuid,
    request: RemittanceVoid,
  ) -> Result<AuditEntry> {
    let entry = self
      .write(move |conn| ops::remittances::void(conn, id, request))
      .await?;
    tracing::warn!(
      remittance = %id,
      actor = %entry.actor,
      reason = %entry.reason,
      "remittance voided"
    );
    Ok(entry)
  }

  async fn list_audit(&self) -> Result<Vec<AuditEntry>> {
    self.read(ops::remittances::list_audit).await
  }
}
