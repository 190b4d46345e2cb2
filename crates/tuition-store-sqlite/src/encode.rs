//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD` (so they
//! compare correctly as text), UUIDs are hyphenated lowercase strings and
//! contacts are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use tuition_core::{
  audit::{AuditAction, AuditEntry},
  catalog::{CatalogEntry, CatalogKind},
  curriculum::GradeSubject,
  enrollment::StudentSubject,
  fee::Fee,
  record::{Entity, RecordMeta, Status},
  remittance::FeeRemittance,
  roster::{Contact, Parent, Student, Teacher},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn decode_status(s: &str) -> Result<Status> {
  Status::from_str(s).map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

pub fn encode_contact(c: &Contact) -> Result<String> {
  Ok(serde_json::to_string(c)?)
}

pub fn decode_contact(s: &str) -> Result<Contact> { Ok(serde_json::from_str(s)?) }

// ─── Shared envelope ─────────────────────────────────────────────────────────

/// Raw `status, version, created_at, updated_at` columns.
pub struct RawMeta {
  pub status:     String,
  pub version:    i64,
  pub created_at: String,
  pub updated_at: String,
}

impl RawMeta {
  /// Read the four envelope columns starting at `first`.
  fn read(row: &Row<'_>, first: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      status:     row.get(first)?,
      version:    row.get(first + 1)?,
      created_at: row.get(first + 2)?,
      updated_at: row.get(first + 3)?,
    })
  }

  fn into_meta(self) -> Result<RecordMeta> {
    Ok(RecordMeta {
      status:     decode_status(&self.status)?,
      version:    self.version,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Column list shared by `grades` and `subjects`; the id column comes first
/// and is aliased by the caller.
pub const CATALOG_COLUMNS: &str =
  "name, description, status, version, created_at, updated_at";

pub struct RawCatalogEntry {
  pub id:          String,
  pub name:        String,
  pub description: Option<String>,
  pub meta:        RawMeta,
}

impl RawCatalogEntry {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      meta:        RawMeta::read(row, 3)?,
    })
  }

  pub fn into_entry(self, kind: CatalogKind) -> Result<CatalogEntry> {
    Ok(CatalogEntry {
      id: decode_uuid(&self.id)?,
      kind,
      name: self.name,
      description: self.description,
      meta: self.meta.into_meta()?,
    })
  }
}

// ─── Curriculum ──────────────────────────────────────────────────────────────

pub const GRADE_SUBJECT_COLUMNS: &str = "grade_subject_id, grade_id, subject_id, \
   status, version, created_at, updated_at";

pub struct RawGradeSubject {
  pub grade_subject_id: String,
  pub grade_id:         String,
  pub subject_id:       String,
  pub meta:             RawMeta,
}

impl RawGradeSubject {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      grade_subject_id: row.get(0)?,
      grade_id:         row.get(1)?,
      subject_id:       row.get(2)?,
      meta:             RawMeta::read(row, 3)?,
    })
  }

  pub fn into_grade_subject(self) -> Result<GradeSubject> {
    Ok(GradeSubject {
      grade_subject_id: decode_uuid(&self.grade_subject_id)?,
      grade_id:         decode_uuid(&self.grade_id)?,
      subject_id:       decode_uuid(&self.subject_id)?,
      meta:             self.meta.into_meta()?,
    })
  }
}

// ─── Roster ──────────────────────────────────────────────────────────────────

pub const TEACHER_COLUMNS: &str = "teacher_id, name, contact, qualification, \
   status, version, created_at, updated_at";

pub struct RawTeacher {
  pub teacher_id:    String,
  pub name:          String,
  pub contact:       String,
  pub qualification: Option<String>,
  pub meta:          RawMeta,
}

impl RawTeacher {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      teacher_id:    row.get(0)?,
      name:          row.get(1)?,
      contact:       row.get(2)?,
      qualification: row.get(3)?,
      meta:          RawMeta::read(row, 4)?,
    })
  }

  pub fn into_teacher(self) -> Result<Teacher> {
    Ok(Teacher {
      teacher_id:    decode_uuid(&self.teacher_id)?,
      name:          self.name,
      contact:       decode_contact(&self.contact)?,
      qualification: self.qualification,
      meta:          self.meta.into_meta()?,
    })
  }
}

pub const PARENT_COLUMNS: &str =
  "parent_id, name, contact, status, version, created_at, updated_at";

pub struct RawParent {
  pub parent_id: String,
  pub name:      String,
  pub contact:   String,
  pub meta:      RawMeta,
}

impl RawParent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      parent_id: row.get(0)?,
      name:      row.get(1)?,
      contact:   row.get(2)?,
      meta:      RawMeta::read(row, 3)?,
    })
  }

  pub fn into_parent(self) -> Result<Parent> {
    Ok(Parent {
      parent_id: decode_uuid(&self.parent_id)?,
      name:      self.name,
      contact:   decode_contact(&self.contact)?,
      meta:      self.meta.into_meta()?,
    })
  }
}

pub const STUDENT_COLUMNS: &str = "student_id, name, contact, parent_id, grade_id, \
   status, version, created_at, updated_at";

pub struct RawStudent {
  pub student_id: String,
  pub name:       String,
  pub contact:    String,
  pub parent_id:  String,
  pub grade_id:   String,
  pub meta:       RawMeta,
}

impl RawStudent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id: row.get(0)?,
      name:       row.get(1)?,
      contact:    row.get(2)?,
      parent_id:  row.get(3)?,
      grade_id:   row.get(4)?,
      meta:       RawMeta::read(row, 5)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id: decode_uuid(&self.student_id)?,
      name:       self.name,
      contact:    decode_contact(&self.contact)?,
      parent_id:  decode_uuid(&self.parent_id)?,
      grade_id:   decode_uuid(&self.grade_id)?,
      meta:       self.meta.into_meta()?,
    })
  }
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

pub const ENROLLMENT_COLUMNS: &str = "enrollment_id, student_id, subject_id, teacher_id, \
   grade_subject_id, status, version, created_at, updated_at";

pub struct RawEnrollment {
  pub enrollment_id:    String,
  pub student_id:       String,
  pub subject_id:       String,
  pub teacher_id:       String,
  pub grade_subject_id: String,
  pub meta:             RawMeta,
}

impl RawEnrollment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      enrollment_id:    row.get(0)?,
      student_id:       row.get(1)?,
      subject_id:       row.get(2)?,
      teacher_id:       row.get(3)?,
      grade_subject_id: row.get(4)?,
      meta:             RawMeta::read(row, 5)?,
    })
  }

  pub fn into_enrollment(self) -> Result<StudentSubject> {
    Ok(StudentSubject {
      enrollment_id:    decode_uuid(&self.enrollment_id)?,
      student_id:       decode_uuid(&self.student_id)?,
      subject_id:       decode_uuid(&self.subject_id)?,
      teacher_id:       decode_uuid(&self.teacher_id)?,
      grade_subject_id: decode_uuid(&self.grade_subject_id)?,
      meta:             self.meta.into_meta()?,
    })
  }
}

// ─── Fees ────────────────────────────────────────────────────────────────────

pub const FEE_COLUMNS: &str =
  "fee_id, grade_id, subject_id, teacher_id, amount, valid_from, created_at";

pub struct RawFee {
  pub fee_id:     String,
  pub grade_id:   String,
  pub subject_id: String,
  pub teacher_id: String,
  pub amount:     i64,
  pub valid_from: String,
  pub created_at: String,
}

impl RawFee {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fee_id:     row.get(0)?,
      grade_id:   row.get(1)?,
      subject_id: row.get(2)?,
      teacher_id: row.get(3)?,
      amount:     row.get(4)?,
      valid_from: row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_fee(self) -> Result<Fee> {
    Ok(Fee {
      fee_id:     decode_uuid(&self.fee_id)?,
      grade_id:   decode_uuid(&self.grade_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      teacher_id: decode_uuid(&self.teacher_id)?,
      amount:     self.amount,
      valid_from: decode_date(&self.valid_from)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

// ─── Remittances ─────────────────────────────────────────────────────────────

pub const REMITTANCE_COLUMNS: &str = "remittance_id, student_id, fee_id, parent_id, \
   enrollment_id, amount_paid, payment_date, receipt_number, recorded_by, created_at";

pub struct RawRemittance {
  pub remittance_id:  String,
  pub student_id:     String,
  pub fee_id:         String,
  pub parent_id:      String,
  pub enrollment_id:  String,
  pub amount_paid:    i64,
  pub payment_date:   String,
  pub receipt_number: String,
  pub recorded_by:    String,
  pub created_at:     String,
}

impl RawRemittance {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      remittance_id:  row.get(0)?,
      student_id:     row.get(1)?,
      fee_id:         row.get(2)?,
      parent_id:      row.get(3)?,
      enrollment_id:  row.get(4)?,
      amount_paid:    row.get(5)?,
      payment_date:   row.get(6)?,
      receipt_number: row.get(7)?,
      recorded_by:    row.get(8)?,
      created_at:     row.get(9)?,
    })
  }

  pub fn into_remittance(self) -> Result<FeeRemittance> {
    Ok(FeeRemittance {
      remittance_id:  decode_uuid(&self.remittance_id)?,
      student_id:     decode_uuid(&self.student_id)?,
      fee_id:         decode_uuid(&self.fee_id)?,
      parent_id:      decode_uuid(&self.parent_id)?,
      enrollment_id:  decode_uuid(&self.enrollment_id)?,
      amount_paid:    self.amount_paid,
      payment_date:   decode_date(&self.payment_date)?,
      receipt_number: self.receipt_number,
      recorded_by:    self.recorded_by,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

// ─── Audit ───────────────────────────────────────────────────────────────────

pub const AUDIT_COLUMNS: &str =
  "audit_id, entity, entity_id, action, reason, actor, snapshot, recorded_at";

pub struct RawAuditEntry {
  pub audit_id:    String,
  pub entity:      String,
  pub entity_id:   String,
  pub action:      String,
  pub reason:      String,
  pub actor:       String,
  pub snapshot:    String,
  pub recorded_at: String,
}

impl RawAuditEntry {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      audit_id:    row.get(0)?,
      entity:      row.get(1)?,
      entity_id:   row.get(2)?,
      action:      row.get(3)?,
      reason:      row.get(4)?,
      actor:       row.get(5)?,
      snapshot:    row.get(6)?,
      recorded_at: row.get(7)?,
    })
  }

  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      audit_id:    decode_uuid(&self.audit_id)?,
      entity:      Entity::from_str(&self.entity)
        .map_err(|_| Error::Decode(format!("unknown entity: {:?}", self.entity)))?,
      entity_id:   decode_uuid(&self.entity_id)?,
      action:      AuditAction::from_str(&self.action)
        .map_err(|_| Error::Decode(format!("unknown action: {:?}", self.action)))?,
      reason:      self.reason,
      actor:       self.actor,
      snapshot:    serde_json::from_str(&self.snapshot)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_sort_lexically() {
    let a = encode_date(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
    let b = encode_date(NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
    assert!(a < b);
    assert_eq!(decode_date(&a).unwrap().to_string(), "2024-01-09");
  }

  #[test]
  fn unknown_status_is_a_decode_error() {
    assert!(matches!(decode_status("deleted"), Err(Error::Decode(_))));
  }
}
