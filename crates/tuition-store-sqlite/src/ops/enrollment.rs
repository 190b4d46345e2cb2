//! Student×Subject enrollment operations.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use tuition_core::{
  Error as CoreError,
  enrollment::{NewEnrollment, StudentSubject, TeacherChange},
  record::{RecordMeta, Status},
};
use uuid::Uuid;

use super::{
  ENROLLMENTS, STUDENTS, TEACHERS, check_version, count, curriculum::live_mapping,
  delete_row, or_duplicate, query_rows, require_live, roster::require_student,
  status_filter, status_text, write_status,
};
use crate::{
  Result,
  encode::{ENROLLMENT_COLUMNS, RawEnrollment, encode_dt, encode_uuid},
};

fn duplicate(input: NewEnrollment) -> CoreError {
  CoreError::DuplicateEnrollment {
    student_id: input.student_id,
    subject_id: input.subject_id,
    teacher_id: input.teacher_id,
  }
}

fn ensure_triple_free(
  conn: &Connection,
  input: NewEnrollment,
  except: Option<Uuid>,
) -> Result<()> {
  let live = count(
    conn,
    "SELECT COUNT(*) FROM student_subjects
     WHERE student_id = ?1 AND subject_id = ?2 AND teacher_id = ?3
       AND status = 'live' AND enrollment_id IS NOT ?4",
    params![
      encode_uuid(input.student_id),
      encode_uuid(input.subject_id),
      encode_uuid(input.teacher_id),
      except.map(encode_uuid),
    ],
  )?;
  if live > 0 {
    return Err(duplicate(input).into());
  }
  Ok(())
}

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<StudentSubject>> {
  conn
    .query_row(
      &format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM student_subjects WHERE enrollment_id = ?1"
      ),
      [encode_uuid(id)],
      RawEnrollment::from_row,
    )
    .optional()?
    .map(RawEnrollment::into_enrollment)
    .transpose()
}

fn require(conn: &Connection, id: Uuid) -> Result<StudentSubject> {
  get(conn, id)?
    .ok_or_else(|| CoreError::not_found(ENROLLMENTS.entity, id).into())
}

pub fn list(
  conn: &Connection,
  student_id: Option<Uuid>,
  status: Option<Status>,
) -> Result<Vec<StudentSubject>> {
  let sql = format!(
    "SELECT {ENROLLMENT_COLUMNS} FROM student_subjects
     WHERE (?1 IS NULL OR student_id = ?1) AND (?2 IS NULL OR status = ?2)
     ORDER BY created_at"
  );
  query_rows(
    conn,
    &sql,
    params![student_id.map(encode_uuid), status_filter(status)],
    RawEnrollment::from_row,
  )?
  .into_iter()
  .map(RawEnrollment::into_enrollment)
  .collect()
}

/// Resolve the student, the Live mapping for the student's grade and the
/// teacher, then insert a Live enrollment unless the triple is already Live.
pub fn enroll(conn: &Connection, input: NewEnrollment) -> Result<StudentSubject> {
  let student = require_student(conn, input.student_id)?;
  if !student.meta.status.is_live() {
    return Err(CoreError::not_found(STUDENTS.entity, input.student_id).into());
  }
  let grade_subject_id = live_mapping(conn, student.grade_id, input.subject_id)?
    .ok_or(CoreError::SubjectNotOfferedForGrade {
      grade_id:   student.grade_id,
      subject_id: input.subject_id,
    })?;
  require_live(conn, &TEACHERS, input.teacher_id)?;
  ensure_triple_free(conn, input, None)?;

  let now = Utc::now();
  let enrollment = StudentSubject {
    enrollment_id: Uuid::new_v4(),
    student_id: input.student_id,
    subject_id: input.subject_id,
    teacher_id: input.teacher_id,
    grade_subject_id,
    meta: RecordMeta::new(now),
  };
  let inserted = conn
    .execute(
      &format!(
        "INSERT INTO student_subjects ({ENROLLMENT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
      ),
      params![
        encode_uuid(enrollment.enrollment_id),
        encode_uuid(enrollment.student_id),
        encode_uuid(enrollment.subject_id),
        encode_uuid(enrollment.teacher_id),
        encode_uuid(grade_subject_id),
        status_text(enrollment.meta.status),
        enrollment.meta.version,
        encode_dt(now),
        encode_dt(now),
      ],
    )
    .map_err(Into::into);
  or_duplicate(inserted, || duplicate(input))?;
  Ok(enrollment)
}

/// Archive a Live enrollment and enroll the same student in the same subject
/// under `teacher_id`.
pub fn change_teacher(
  conn: &Connection,
  id: Uuid,
  teacher_id: Uuid,
  expected_version: Option<i64>,
) -> Result<TeacherChange> {
  let previous = require(conn, id)?;
  check_version(&ENROLLMENTS, id, previous.meta.version, expected_version)?;
  if !previous.meta.status.is_live() {
    return Err(
      CoreError::Validation(format!(
        "enrollment {id} is archived; restore it before changing teacher"
      ))
      .into(),
    );
  }
  let input = NewEnrollment {
    student_id: previous.student_id,
    subject_id: previous.subject_id,
    teacher_id,
  };
  if teacher_id == previous.teacher_id {
    return Err(duplicate(input).into());
  }

  write_status(conn, &ENROLLMENTS, id, previous.meta.version, Status::Archive)?;
  let current = enroll(conn, input)?;
  Ok(TeacherChange { previous: require(conn, id)?, current })
}

/// Archiving is never blocked. Restoring re-runs the enrollment checks
/// against the mapping the enrollment was made under.
pub fn set_status(
  conn: &Connection,
  id: Uuid,
  status: Status,
  expected_version: Option<i64>,
) -> Result<StudentSubject> {
  let enrollment = require(conn, id)?;
  check_version(&ENROLLMENTS, id, enrollment.meta.version, expected_version)?;
  if enrollment.meta.status == status {
    return Ok(enrollment);
  }

  let input = NewEnrollment {
    student_id: enrollment.student_id,
    subject_id: enrollment.subject_id,
    teacher_id: enrollment.teacher_id,
  };
  if status.is_live() {
    require_live(conn, &STUDENTS, enrollment.student_id)?;
    require_live(conn, &TEACHERS, enrollment.teacher_id)?;
    let student = require_student(conn, enrollment.student_id)?;
    if live_mapping(conn, student.grade_id, enrollment.subject_id)?
      != Some(enrollment.grade_subject_id)
    {
      return Err(
        CoreError::SubjectNotOfferedForGrade {
          grade_id:   student.grade_id,
          subject_id: enrollment.subject_id,
        }
        .into(),
      );
    }
    ensure_triple_free(conn, input, Some(id))?;
  }
  let written =
    write_status(conn, &ENROLLMENTS, id, enrollment.meta.version, status);
  or_duplicate(written, || duplicate(input))?;
  require(conn, id)
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<()> {
  require(conn, id)?;
  let paid = count(
    conn,
    "SELECT COUNT(*) FROM fee_remittances WHERE enrollment_id = ?1",
    [encode_uuid(id)],
  )?;
  if paid > 0 {
    return Err(
      CoreError::HasDependents { entity: ENROLLMENTS.entity, id }.into(),
    );
  }
  delete_row(conn, &ENROLLMENTS, id)
}
