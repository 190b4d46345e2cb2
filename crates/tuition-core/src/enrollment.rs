//! Student×Subject enrollments under a specific Teacher.
//!
//! An enrollment is the join point where the roster meets the curriculum.
//! Changing teacher archives the old record and creates a new one, so
//! historical fee and attendance joins keep pointing at stable rows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::RecordMeta;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSubject {
  pub enrollment_id:    Uuid,
  pub student_id:       Uuid,
  pub subject_id:       Uuid,
  pub teacher_id:       Uuid,
  /// The curriculum mapping that authorized this enrollment.
  pub grade_subject_id: Uuid,
  #[serde(flatten)]
  pub meta:             RecordMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEnrollment {
  pub student_id: Uuid,
  pub subject_id: Uuid,
  pub teacher_id: Uuid,
}

/// One (subject, teacher) entry in a new student's initial enrollment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectChoice {
  pub subject_id: Uuid,
  pub teacher_id: Uuid,
}

impl SubjectChoice {
  pub fn for_student(self, student_id: Uuid) -> NewEnrollment {
    NewEnrollment {
      student_id,
      subject_id: self.subject_id,
      teacher_id: self.teacher_id,
    }
  }
}

/// Outcome of a teacher change: the archived enrollment and its replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherChange {
  pub previous: StudentSubject,
  pub current:  StudentSubject,
}
