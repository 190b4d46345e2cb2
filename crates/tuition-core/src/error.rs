//! Error types for `tuition-core`.
//!
//! Every rejected ledger operation surfaces one of these kinds unchanged, so
//! the API layer can pick the matching client-facing status.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  access::{Operation, Role},
  record::Entity,
};

#[derive(Debug, Error)]
pub enum Error {
  /// A reference does not resolve, or resolves to an Archive record where a
  /// Live one is required.
  #[error("{entity} not found: {key}")]
  NotFound { entity: Entity, key: String },

  #[error("an active {entity} named {name:?} already exists")]
  DuplicateName { entity: Entity, name: String },

  #[error("grade {grade_id} already has an active mapping for subject {subject_id}")]
  DuplicateMapping { grade_id: Uuid, subject_id: Uuid },

  #[error(
    "student {student_id} is already enrolled in subject {subject_id} with teacher {teacher_id}"
  )]
  DuplicateEnrollment {
    student_id: Uuid,
    subject_id: Uuid,
    teacher_id: Uuid,
  },

  #[error("a rate effective on or after {valid_from} already exists for this grade/subject/teacher")]
  DuplicateRate {
    grade_id:   Uuid,
    subject_id: Uuid,
    teacher_id: Uuid,
    valid_from: NaiveDate,
  },

  #[error("{entity} {id} is still referenced and cannot be deleted")]
  HasDependents { entity: Entity, id: Uuid },

  #[error("{entity} {id} has active dependents")]
  HasActiveDependents { entity: Entity, id: Uuid },

  #[error("subject {subject_id} is not offered for grade {grade_id}")]
  SubjectNotOfferedForGrade { grade_id: Uuid, subject_id: Uuid },

  #[error("student {student_id} has no active enrollment matching fee {fee_id}")]
  EnrollmentMismatch { student_id: Uuid, fee_id: Uuid },

  #[error("fee {fee_id} is already paid for student {student_id} (remittance {remittance_id})")]
  AlreadyPaid {
    student_id:    Uuid,
    fee_id:        Uuid,
    remittance_id: Uuid,
  },

  #[error("could not issue a unique receipt number after {attempts} attempts")]
  ReceiptCollision { attempts: u32 },

  #[error("{entity} {id} was modified concurrently (expected version {expected}, found {actual})")]
  ConcurrentModification {
    entity:   Entity,
    id:       Uuid,
    expected: i64,
    actual:   i64,
  },

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("missing or invalid credentials")]
  Unauthenticated,

  #[error("role {role} may not {operation}")]
  Forbidden { role: Role, operation: Operation },

  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Shorthand for an unresolvable id.
  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, key: id.to_string() }
  }

  /// Stable machine-readable name for the error kind.
  pub fn code(&self) -> &'static str {
    match self {
      Self::NotFound { .. } => "not_found",
      Self::DuplicateName { .. } => "duplicate_name",
      Self::DuplicateMapping { .. } => "duplicate_mapping",
      Self::DuplicateEnrollment { .. } => "duplicate_enrollment",
      Self::DuplicateRate { .. } => "duplicate_rate",
      Self::HasDependents { .. } => "has_dependents",
      Self::HasActiveDependents { .. } => "has_active_dependents",
      Self::SubjectNotOfferedForGrade { .. } => "subject_not_offered_for_grade",
      Self::EnrollmentMismatch { .. } => "enrollment_mismatch",
      Self::AlreadyPaid { .. } => "already_paid",
      Self::ReceiptCollision { .. } => "receipt_collision",
      Self::ConcurrentModification { .. } => "concurrent_modification",
      Self::Validation(_) => "validation_error",
      Self::Unauthenticated => "unauthenticated",
      Self::Forbidden { .. } => "forbidden",
      Self::StoreUnavailable(_) => "store_unavailable",
    }
  }

  /// Whether the caller may retry unchanged after backing off.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StoreUnavailable(_) | Self::ReceiptCollision { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
