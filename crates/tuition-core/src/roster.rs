//! Roster records: Teachers, Parents and Students.
//!
//! Roster entities are independent of the curriculum but referenced by it:
//! enrollments point at teachers and students, students point at their
//! guardian and their grade.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::required_name,
  enrollment::{StudentSubject, SubjectChoice},
  record::RecordMeta,
};

/// How to reach a person. Stored as a single JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub email:   Option<String>,
  pub phone:   Option<String>,
  pub address: Option<String>,
}

// ─── Teacher ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
  pub teacher_id:    Uuid,
  pub name:          String,
  pub contact:       Contact,
  pub qualification: Option<String>,
  #[serde(flatten)]
  pub meta:          RecordMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeacher {
  pub name:          String,
  #[serde(default)]
  pub contact:       Contact,
  #[serde(default)]
  pub qualification: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeacherPatch {
  pub name:          Option<String>,
  pub contact:       Option<Contact>,
  pub qualification: Option<String>,
}

impl NewTeacher {
  pub fn normalized(mut self) -> Result<Self> {
    self.name = required_name(&self.name)?;
    Ok(self)
  }
}

impl TeacherPatch {
  pub fn apply(self, teacher: &mut Teacher) -> Result<()> {
    if let Some(name) = self.name {
      teacher.name = required_name(&name)?;
    }
    if let Some(contact) = self.contact {
      teacher.contact = contact;
    }
    if let Some(qualification) = self.qualification {
      teacher.qualification = Some(qualification);
    }
    Ok(())
  }
}

// ─── Parent ──────────────────────────────────────────────────────────────────

/// A student's guardian; owns the fee remittances made for that student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
  pub parent_id: Uuid,
  pub name:      String,
  pub contact:   Contact,
  #[serde(flatten)]
  pub meta:      RecordMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParent {
  pub name:    String,
  #[serde(default)]
  pub contact: Contact,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParentPatch {
  pub name:    Option<String>,
  pub contact: Option<Contact>,
}

impl NewParent {
  pub fn normalized(mut self) -> Result<Self> {
    self.name = required_name(&self.name)?;
    Ok(self)
  }
}

impl ParentPatch {
  pub fn apply(self, parent: &mut Parent) -> Result<()> {
    if let Some(name) = self.name {
      parent.name = required_name(&name)?;
    }
    if let Some(contact) = self.contact {
      parent.contact = contact;
    }
    Ok(())
  }
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub student_id: Uuid,
  pub name:       String,
  pub contact:    Contact,
  pub parent_id:  Uuid,
  pub grade_id:   Uuid,
  #[serde(flatten)]
  pub meta:       RecordMeta,
}

/// A student is created together with at least one enrollment; the whole
/// request succeeds or nothing is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
  pub name:      String,
  #[serde(default)]
  pub contact:   Contact,
  pub parent_id: Uuid,
  pub grade_id:  Uuid,
  pub subjects:  Vec<SubjectChoice>,
}

impl NewStudent {
  pub fn normalized(mut self) -> Result<Self> {
    self.name = required_name(&self.name)?;
    if self.subjects.is_empty() {
      return Err(Error::Validation(
        "a student must be enrolled in at least one subject".into(),
      ));
    }
    Ok(self)
  }
}

/// Partial update. Changing `grade_id` is only allowed while the student has
/// no Live enrollments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentPatch {
  pub name:      Option<String>,
  pub contact:   Option<Contact>,
  pub parent_id: Option<Uuid>,
  pub grade_id:  Option<Uuid>,
}

impl StudentPatch {
  pub fn apply(self, student: &mut Student) -> Result<()> {
    if let Some(name) = self.name {
      student.name = required_name(&name)?;
    }
    if let Some(contact) = self.contact {
      student.contact = contact;
    }
    if let Some(parent_id) = self.parent_id {
      student.parent_id = parent_id;
    }
    if let Some(grade_id) = self.grade_id {
      student.grade_id = grade_id;
    }
    Ok(())
  }
}

/// A newly created student with the enrollments created alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledStudent {
  pub student:     Student,
  pub enrollments: Vec<StudentSubject>,
}
