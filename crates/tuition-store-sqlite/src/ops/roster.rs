//! Teacher, Parent and Student operations.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use tuition_core::{
  Error as CoreError,
  record::{RecordMeta, Status},
  roster::{
    EnrolledStudent, NewParent, NewStudent, NewTeacher, Parent, ParentPatch,
    Student, StudentPatch, Teacher, TeacherPatch,
  },
};
use uuid::Uuid;

use super::{
  GRADES, PARENTS, STUDENTS, TEACHERS, Table, bump, check_version, count,
  delete_row, enrollment, query_rows, require_live, status_filter, status_text,
  write_status,
};
use crate::{
  Result,
  encode::{
    PARENT_COLUMNS, RawParent, RawStudent, RawTeacher, STUDENT_COLUMNS,
    TEACHER_COLUMNS, encode_contact, encode_dt, encode_uuid,
  },
};

/// Fail with `error` when the `SELECT COUNT(*)` query finds anything.
fn refuse_if_any(
  conn: &Connection,
  queries: &[&str],
  id: Uuid,
  error: CoreError,
) -> Result<()> {
  let key = encode_uuid(id);
  for sql in queries {
    if count(conn, sql, [&key])? > 0 {
      return Err(error.into());
    }
  }
  Ok(())
}

fn active_dependents(table: &Table, id: Uuid) -> CoreError {
  CoreError::HasActiveDependents { entity: table.entity, id }
}

fn dependents(table: &Table, id: Uuid) -> CoreError {
  CoreError::HasDependents { entity: table.entity, id }
}

// ─── Teachers ────────────────────────────────────────────────────────────────

pub fn get_teacher(conn: &Connection, id: Uuid) -> Result<Option<Teacher>> {
  conn
    .query_row(
      &format!("SELECT {TEACHER_COLUMNS} FROM teachers WHERE teacher_id = ?1"),
      [encode_uuid(id)],
      RawTeacher::from_row,
    )
    .optional()?
    .map(RawTeacher::into_teacher)
    .transpose()
}

fn require_teacher(conn: &Connection, id: Uuid) -> Result<Teacher> {
  get_teacher(conn, id)?
    .ok_or_else(|| CoreError::not_found(TEACHERS.entity, id).into())
}

pub fn list_teachers(
  conn: &Connection,
  status: Option<Status>,
) -> Result<Vec<Teacher>> {
  query_rows(
    conn,
    &format!(
      "SELECT {TEACHER_COLUMNS} FROM teachers
       WHERE (?1 IS NULL OR status = ?1) ORDER BY name, created_at"
    ),
    [status_filter(status)],
    RawTeacher::from_row,
  )?
  .into_iter()
  .map(RawTeacher::into_teacher)
  .collect()
}

pub fn create_teacher(conn: &Connection, input: NewTeacher) -> Result<Teacher> {
  let input = input.normalized()?;
  let now = Utc::now();
  let teacher = Teacher {
    teacher_id:    Uuid::new_v4(),
    name:          input.name,
    contact:       input.contact,
    qualification: input.qualification,
    meta:          RecordMeta::new(now),
  };
  conn.execute(
    &format!(
      "INSERT INTO teachers ({TEACHER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    ),
    params![
      encode_uuid(teacher.teacher_id),
      teacher.name,
      encode_contact(&teacher.contact)?,
      teacher.qualification,
      status_text(teacher.meta.status),
      teacher.meta.version,
      encode_dt(now),
      encode_dt(now),
    ],
  )?;
  Ok(teacher)
}

pub fn update_teacher(
  conn: &Connection,
  id: Uuid,
  patch: TeacherPatch,
  expected_version: Option<i64>,
) -> Result<Teacher> {
  let mut teacher = require_teacher(conn, id)?;
  check_version(&TEACHERS, id, teacher.meta.version, expected_version)?;
  patch.apply(&mut teacher)?;
  let contact = encode_contact(&teacher.contact)?;
  bump(
    conn,
    &TEACHERS,
    id,
    teacher.meta.version,
    "name = ?1, contact = ?2, qualification = ?3",
    params![teacher.name, contact, teacher.qualification],
  )?;
  require_teacher(conn, id)
}

pub fn set_teacher_status(
  conn: &Connection,
  id: Uuid,
  status: Status,
  expected_version: Option<i64>,
) -> Result<Teacher> {
  let teacher = require_teacher(conn, id)?;
  check_version(&TEACHERS, id, teacher.meta.version, expected_version)?;
  if teacher.meta.status == status {
    return Ok(teacher);
  }
  if status == Status::Archive {
    refuse_if_any(
      conn,
      &["SELECT COUNT(*) FROM student_subjects
         WHERE teacher_id = ?1 AND status = 'live'"],
      id,
      active_dependents(&TEACHERS, id),
    )?;
  }
  write_status(conn, &TEACHERS, id, teacher.meta.version, status)?;
  require_teacher(conn, id)
}

pub fn delete_teacher(conn: &Connection, id: Uuid) -> Result<()> {
  require_teacher(conn, id)?;
  refuse_if_any(
    conn,
    &[
      "SELECT COUNT(*) FROM student_subjects WHERE teacher_id = ?1",
      "SELECT COUNT(*) FROM fees WHERE teacher_id = ?1",
    ],
    id,
    dependents(&TEACHERS, id),
  )?;
  delete_row(conn, &TEACHERS, id)
}

// ─── Parents ─────────────────────────────────────────────────────────────────

pub fn get_parent(conn: &Connection, id: Uuid) -> Result<Option<Parent>> {
  conn
    .query_row(
      &format!("SELECT {PARENT_COLUMNS} FROM parents WHERE parent_id = ?1"),
      [encode_uuid(id)],
      RawParent::from_row,
    )
    .optional()?
    .map(RawParent::into_parent)
    .transpose()
}

fn require_parent(conn: &Connection, id: Uuid) -> Result<Parent> {
  get_parent(conn, id)?
    .ok_or_else(|| CoreError::not_found(PARENTS.entity, id).into())
}

pub fn list_parents(
  conn: &Connection,
  status: Option<Status>,
) -> Result<Vec<Parent>> {
  query_rows(
    conn,
    &format!(
      "SELECT {PARENT_COLUMNS} FROM parents
       WHERE (?1 IS NULL OR status = ?1) ORDER BY name, created_at"
    ),
    [status_filter(status)],
    RawParent::from_row,
  )?
  .into_iter()
  .map(RawParent::into_parent)
  .collect()
}

pub fn create_parent(conn: &Connection, input: NewParent) -> Result<Parent> {
  let input = input.normalized()?;
  let now = Utc::now();
  let parent = Parent {
    parent_id: Uuid::new_v4(),
    name:      input.name,
    contact:   input.contact,
    meta:      RecordMeta::new(now),
  };
  conn.execute(
    &format!(
      "INSERT INTO parents ({PARENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    ),
    params![
      encode_uuid(parent.parent_id),
      parent.name,
      encode_contact(&parent.contact)?,
      status_text(parent.meta.status),
      parent.meta.version,
      encode_dt(now),
      encode_dt(now),
    ],
  )?;
  Ok(parent)
}

pub fn update_parent(
  conn: &Connection,
  id: Uuid,
  patch: ParentPatch,
  expected_version: Option<i64>,
) -> Result<Parent> {
  let mut parent = require_parent(conn, id)?;
  check_version(&PARENTS, id, parent.meta.version, expected_version)?;
  patch.apply(&mut parent)?;
  let contact = encode_contact(&parent.contact)?;
  bump(
    conn,
    &PARENTS,
    id,
    parent.meta.version,
    "name = ?1, contact = ?2",
    params![parent.name, contact],
  )?;
  require_parent(conn, id)
}

pub fn set_parent_status(
  conn: &Connection,
  id: Uuid,
  status: Status,
  expected_version: Option<i64>,
) -> Result<Parent> {
  let parent = require_parent(conn, id)?;
  check_version(&PARENTS, id, parent.meta.version, expected_version)?;
  if parent.meta.status == status {
    return Ok(parent);
  }
  if status == Status::Archive {
    refuse_if_any(
      conn,
      &["SELECT COUNT(*) FROM students WHERE parent_id = ?1 AND status = 'live'"],
      id,
      active_dependents(&PARENTS, id),
    )?;
  }
  write_status(conn, &PARENTS, id, parent.meta.version, status)?;
  require_parent(conn, id)
}

pub fn delete_parent(conn: &Connection, id: Uuid) -> Result<()> {
  require_parent(conn, id)?;
  refuse_if_any(
    conn,
    &[
      "SELECT COUNT(*) FROM students WHERE parent_id = ?1",
      "SELECT COUNT(*) FROM fee_remittances WHERE parent_id = ?1",
    ],
    id,
    dependents(&PARENTS, id),
  )?;
  delete_row(conn, &PARENTS, id)
}

// ─── Students ────────────────────────────────────────────────────────────────

pub fn get_student(conn: &Connection, id: Uuid) -> Result<Option<Student>> {
  conn
    .query_row(
      &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1"),
      [encode_uuid(id)],
      RawStudent::from_row,
    )
    .optional()?
    .map(RawStudent::into_student)
    .transpose()
}

pub(super) fn require_student(conn: &Connection, id: Uuid) -> Result<Student> {
  get_student(conn, id)?
    .ok_or_else(|| CoreError::not_found(STUDENTS.entity, id).into())
}

pub fn list_students(
  conn: &Connection,
  status: Option<Status>,
) -> Result<Vec<Student>> {
  query_rows(
    conn,
    &format!(
      "SELECT {STUDENT_COLUMNS} FROM students
       WHERE (?1 IS NULL OR status = ?1) ORDER BY name, created_at"
    ),
    [status_filter(status)],
    RawStudent::from_row,
  )?
  .into_iter()
  .map(RawStudent::into_student)
  .collect()
}

/// Insert the student and every initial enrollment. Any rejected enrollment
/// fails the call, and the enclosing transaction discards the student too.
pub fn create_student(
  conn: &Connection,
  input: NewStudent,
) -> Result<EnrolledStudent> {
  let input = input.normalized()?;
  require_live(conn, &PARENTS, input.parent_id)?;
  require_live(conn, &GRADES, input.grade_id)?;

  let now = Utc::now();
  let student = Student {
    student_id: Uuid::new_v4(),
    name:       input.name,
    contact:    input.contact,
    parent_id:  input.parent_id,
    grade_id:   input.grade_id,
    meta:       RecordMeta::new(now),
  };
  conn.execute(
    &format!(
      "INSERT INTO students ({STUDENT_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ),
    params![
      encode_uuid(student.student_id),
      student.name,
      encode_contact(&student.contact)?,
      encode_uuid(student.parent_id),
      encode_uuid(student.grade_id),
      status_text(student.meta.status),
      student.meta.version,
      encode_dt(now),
      encode_dt(now),
    ],
  )?;

  let enrollments = input
    .subjects
    .into_iter()
    .map(|choice| enrollment::enroll(conn, choice.for_student(student.student_id)))
    .collect::<Result<Vec<_>>>()?;
  Ok(EnrolledStudent { student, enrollments })
}

fn live_enrollments(conn: &Connection, student_id: Uuid) -> Result<i64> {
  count(
    conn,
    "SELECT COUNT(*) FROM student_subjects WHERE student_id = ?1 AND status = 'live'",
    [encode_uuid(student_id)],
  )
}

pub fn update_student(
  conn: &Connection,
  id: Uuid,
  patch: StudentPatch,
  expected_version: Option<i64>,
) -> Result<Student> {
  let mut student = require_student(conn, id)?;
  check_version(&STUDENTS, id, student.meta.version, expected_version)?;
  let before = (student.parent_id, student.grade_id);
  patch.apply(&mut student)?;

  if student.parent_id != before.0 {
    require_live(conn, &PARENTS, student.parent_id)?;
  }
  if student.grade_id != before.1 {
    require_live(conn, &GRADES, student.grade_id)?;
    if live_enrollments(conn, id)? > 0 {
      return Err(active_dependents(&STUDENTS, id).into());
    }
  }

  let contact = encode_contact(&student.contact)?;
  let parent = encode_uuid(student.parent_id);
  let grade = encode_uuid(student.grade_id);
  bump(
    conn,
    &STUDENTS,
    id,
    student.meta.version,
    "name = ?1, contact = ?2, parent_id = ?3, grade_id = ?4",
    params![student.name, contact, parent, grade],
  )?;
  require_student(conn, id)
}

/// Archiving requires the student's enrollments to be archived first;
/// restoring requires a Live guardian and grade.
pub fn set_student_status(
  conn: &Connection,
  id: Uuid,
  status: Status,
  expected_version: Option<i64>,
) -> Result<Student> {
  let student = require_student(conn, id)?;
  check_version(&STUDENTS, id, student.meta.version, expected_version)?;
  if student.meta.status == status {
    return Ok(student);
  }
  match status {
    Status::Live => {
      require_live(conn, &PARENTS, student.parent_id)?;
      require_live(conn, &GRADES, student.grade_id)?;
    }
    Status::Archive => {
      if live_enrollments(conn, id)? > 0 {
        return Err(active_dependents(&STUDENTS, id).into());
      }
    }
  }
  write_status(conn, &STUDENTS, id, student.meta.version, status)?;
  require_student(conn, id)
}

pub fn delete_student(conn: &Connection, id: Uuid) -> Result<()> {
  require_student(conn, id)?;
  refuse_if_any(
    conn,
    &[
      "SELECT COUNT(*) FROM student_subjects WHERE student_id = ?1",
      "SELECT COUNT(*) FROM fee_remittances WHERE student_id = ?1",
    ],
    id,
    dependents(&STUDENTS, id),
  )?;
  delete_row(conn, &STUDENTS, id)
}
