//! Remittance ledger and audit log operations.

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};
use tuition_core::{
  Error as CoreError,
  audit::{AuditAction, AuditEntry},
  record::Entity,
  remittance::{FeeRemittance, NewRemittance, RECEIPT_ATTEMPTS, RemittanceVoid},
};
use uuid::Uuid;

use super::{fees, query_rows, roster, unique_violation};
use crate::{
  Result,
  encode::{
    AUDIT_COLUMNS, REMITTANCE_COLUMNS, RawAuditEntry, RawRemittance, decode_uuid,
    encode_date, encode_dt, encode_uuid,
  },
};

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<FeeRemittance>> {
  conn
    .query_row(
      &format!(
        "SELECT {REMITTANCE_COLUMNS} FROM fee_remittances WHERE remittance_id = ?1"
      ),
      [encode_uuid(id)],
      RawRemittance::from_row,
    )
    .optional()?
    .map(RawRemittance::into_remittance)
    .transpose()
}

pub fn list(conn: &Connection) -> Result<Vec<FeeRemittance>> {
  query_rows(
    conn,
    &format!(
      "SELECT {REMITTANCE_COLUMNS} FROM fee_remittances ORDER BY payment_date, created_at"
    ),
    [],
    RawRemittance::from_row,
  )?
  .into_iter()
  .map(RawRemittance::into_remittance)
  .collect()
}

pub fn list_by_student(
  conn: &Connection,
  student_id: Uuid,
) -> Result<Vec<FeeRemittance>> {
  roster::require_student(conn, student_id)?;
  query_rows(
    conn,
    &format!(
      "SELECT {REMITTANCE_COLUMNS} FROM fee_remittances WHERE student_id = ?1
       ORDER BY payment_date, created_at"
    ),
    [encode_uuid(student_id)],
    RawRemittance::from_row,
  )?
  .into_iter()
  .map(RawRemittance::into_remittance)
  .collect()
}

fn existing_payment(
  conn: &Connection,
  student_id: Uuid,
  fee_id: Uuid,
) -> Result<Option<Uuid>> {
  let id: Option<String> = conn
    .query_row(
      "SELECT remittance_id FROM fee_remittances WHERE student_id = ?1 AND fee_id = ?2",
      [encode_uuid(student_id), encode_uuid(fee_id)],
      |r| r.get(0),
    )
    .optional()?;
  id.as_deref().map(decode_uuid).transpose()
}

fn already_paid(student_id: Uuid, fee_id: Uuid, remittance_id: Uuid) -> CoreError {
  CoreError::AlreadyPaid { student_id, fee_id, remittance_id }
}

/// Record a payment for one fee of one student.
///
/// The student must be enrolled (Live) in the fee's subject under the fee's
/// teacher, in the fee's grade, and the payer must be the student's guardian.
/// Receipt numbers come from `issue`; a colliding number is retried up to
/// [`RECEIPT_ATTEMPTS`] times.
pub fn pay(
  conn: &Connection,
  input: NewRemittance,
  issue: &dyn Fn(NaiveDate) -> String,
) -> Result<FeeRemittance> {
  input.validate()?;
  let student = roster::require_student(conn, input.student_id)?;
  let fee = fees::get(conn, input.fee_id)?
    .ok_or(CoreError::not_found(Entity::Fee, input.fee_id))?;
  if roster::get_parent(conn, input.parent_id)?.is_none() {
    return Err(CoreError::not_found(Entity::Parent, input.parent_id).into());
  }
  if student.parent_id != input.parent_id {
    return Err(
      CoreError::Validation(format!(
        "parent {} is not the guardian of student {}",
        input.parent_id, input.student_id
      ))
      .into(),
    );
  }

  let mismatch = || CoreError::EnrollmentMismatch {
    student_id: input.student_id,
    fee_id:     input.fee_id,
  };
  if fee.grade_id != student.grade_id {
    return Err(mismatch().into());
  }
  let enrollment: Option<String> = conn
    .query_row(
      "SELECT enrollment_id FROM student_subjects
       WHERE student_id = ?1 AND subject_id = ?2 AND teacher_id = ?3
         AND status = 'live'",
      [
        encode_uuid(input.student_id),
        encode_uuid(fee.subject_id),
        encode_uuid(fee.teacher_id),
      ],
      |r| r.get(0),
    )
    .optional()?;
  let enrollment_id = decode_uuid(&enrollment.ok_or_else(mismatch)?)?;

  if let Some(paid) = existing_payment(conn, input.student_id, input.fee_id)? {
    return Err(already_paid(input.student_id, input.fee_id, paid).into());
  }

  let created_at = Utc::now();
  for attempt in 1..=RECEIPT_ATTEMPTS {
    let remittance = FeeRemittance {
      remittance_id: Uuid::new_v4(),
      student_id: input.student_id,
      fee_id: input.fee_id,
      parent_id: input.parent_id,
      enrollment_id,
      amount_paid: input.amount_paid,
      payment_date: input.payment_date,
      receipt_number: issue(input.payment_date),
      recorded_by: input.recorded_by.clone(),
      created_at,
    };
    let inserted = conn.execute(
      &format!(
        "INSERT INTO fee_remittances ({REMITTANCE_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
      ),
      params![
        encode_uuid(remittance.remittance_id),
        encode_uuid(remittance.student_id),
        encode_uuid(remittance.fee_id),
        encode_uuid(remittance.parent_id),
        encode_uuid(remittance.enrollment_id),
        remittance.amount_paid,
        encode_date(remittance.payment_date),
        remittance.receipt_number,
        remittance.recorded_by,
        encode_dt(remittance.created_at),
      ],
    );

    let err = match inserted {
      Ok(_) => return Ok(remittance),
      Err(e) => crate::Error::from(e),
    };
    let receipt_taken =
      unique_violation(&err).map(|msg| msg.contains("receipt_number"));
    match receipt_taken {
      Some(true) => {
        tracing::warn!(
          attempt,
          receipt = %remittance.receipt_number,
          "receipt number collision, reissuing"
        );
      }
      Some(false) => {
        let paid = existing_payment(conn, input.student_id, input.fee_id)?
          .unwrap_or(remittance.remittance_id);
        return Err(already_paid(input.student_id, input.fee_id, paid).into());
      }
      None => return Err(err),
    }
  }
  Err(CoreError::ReceiptCollision { attempts: RECEIPT_ATTEMPTS }.into())
}

/// Remove a remittance and append an audit entry carrying its snapshot.
pub fn void(
  conn: &Connection,
  id: Uuid,
  request: RemittanceVoid,
) -> Result<AuditEntry> {
  let request = request.normalized()?;
  let remittance =
    get(conn, id)?.ok_or(CoreError::not_found(Entity::Remittance, id))?;

  let entry = AuditEntry {
    audit_id:    Uuid::new_v4(),
    entity:      Entity::Remittance,
    entity_id:   id,
    action:      AuditAction::Void,
    reason:      request.reason,
    actor:       request.actor,
    snapshot:    serde_json::to_value(&remittance)?,
    recorded_at: Utc::now(),
  };
  conn.execute(
    "DELETE FROM fee_remittances WHERE remittance_id = ?1",
    [encode_uuid(id)],
  )?;
  conn.execute(
    &format!("INSERT INTO audit_log ({AUDIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
    params![
      encode_uuid(entry.audit_id),
      entry.entity.to_string(),
      encode_uuid(entry.entity_id),
      entry.action.to_string(),
      entry.reason,
      entry.actor,
      entry.snapshot.to_string(),
      encode_dt(entry.recorded_at),
    ],
  )?;
  Ok(entry)
}

pub fn list_audit(conn: &Connection) -> Result<Vec<AuditEntry>> {
  query_rows(
    conn,
    &format!("SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY recorded_at"),
    [],
    RawAuditEntry::from_row,
  )?
  .into_iter()
  .map(RawAuditEntry::into_entry)
  .collect()
}
