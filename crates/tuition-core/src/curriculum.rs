//! Grade×Subject curriculum mappings.
//!
//! A mapping authorizes a Subject to be taught within a Grade. It is the only
//! legal unit that enrollments and fees attach to. At most one Live mapping
//! exists per (grade, subject) pair; re-adding an archived pair reactivates
//! the archived record rather than inserting a duplicate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::RecordMeta;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSubject {
  pub grade_subject_id: Uuid,
  pub grade_id:         Uuid,
  pub subject_id:       Uuid,
  #[serde(flatten)]
  pub meta:             RecordMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGradeSubject {
  pub grade_id:   Uuid,
  pub subject_id: Uuid,
}
