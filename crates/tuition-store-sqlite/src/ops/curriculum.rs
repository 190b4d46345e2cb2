//! Grade×Subject mapping operations.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use tuition_core::{
  Error as CoreError,
  curriculum::{GradeSubject, NewGradeSubject},
  record::{RecordMeta, Status},
};
use uuid::Uuid;

use super::{
  GRADE_SUBJECTS, GRADES, SUBJECTS, check_version, count, delete_row,
  or_duplicate, query_rows, require_live, status_filter, status_text,
  write_status,
};
use crate::{
  Result,
  encode::{
    GRADE_SUBJECT_COLUMNS, RawGradeSubject, decode_uuid, encode_dt, encode_uuid,
  },
};

fn duplicate(grade_id: Uuid, subject_id: Uuid) -> CoreError {
  CoreError::DuplicateMapping { grade_id, subject_id }
}

/// The Live mapping for a pair, if any.
pub fn live_mapping(
  conn: &Connection,
  grade_id: Uuid,
  subject_id: Uuid,
) -> Result<Option<Uuid>> {
  let id: Option<String> = conn
    .query_row(
      "SELECT grade_subject_id FROM grade_subjects
       WHERE grade_id = ?1 AND subject_id = ?2 AND status = 'live'",
      [encode_uuid(grade_id), encode_uuid(subject_id)],
      |r| r.get(0),
    )
    .optional()?;
  id.as_deref().map(decode_uuid).transpose()
}

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<GradeSubject>> {
  conn
    .query_row(
      &format!(
        "SELECT {GRADE_SUBJECT_COLUMNS} FROM grade_subjects WHERE grade_subject_id = ?1"
      ),
      [encode_uuid(id)],
      RawGradeSubject::from_row,
    )
    .optional()?
    .map(RawGradeSubject::into_grade_subject)
    .transpose()
}

fn require(conn: &Connection, id: Uuid) -> Result<GradeSubject> {
  get(conn, id)?
    .ok_or_else(|| CoreError::not_found(GRADE_SUBJECTS.entity, id).into())
}

pub fn list(
  conn: &Connection,
  grade_id: Option<Uuid>,
  status: Option<Status>,
) -> Result<Vec<GradeSubject>> {
  let sql = format!(
    "SELECT {GRADE_SUBJECT_COLUMNS} FROM grade_subjects
     WHERE (?1 IS NULL OR grade_id = ?1) AND (?2 IS NULL OR status = ?2)
     ORDER BY created_at"
  );
  query_rows(
    conn,
    &sql,
    params![grade_id.map(encode_uuid), status_filter(status)],
    RawGradeSubject::from_row,
  )?
  .into_iter()
  .map(RawGradeSubject::into_grade_subject)
  .collect()
}

/// Map a subject onto a grade. An archived mapping for the same pair comes
/// back to Live instead of a second row being inserted.
pub fn create(conn: &Connection, input: NewGradeSubject) -> Result<GradeSubject> {
  let NewGradeSubject { grade_id, subject_id } = input;
  require_live(conn, &GRADES, grade_id)?;
  require_live(conn, &SUBJECTS, subject_id)?;
  if live_mapping(conn, grade_id, subject_id)?.is_some() {
    return Err(duplicate(grade_id, subject_id).into());
  }

  let archived: Option<(String, i64)> = conn
    .query_row(
      "SELECT grade_subject_id, version FROM grade_subjects
       WHERE grade_id = ?1 AND subject_id = ?2
       ORDER BY updated_at DESC LIMIT 1",
      [encode_uuid(grade_id), encode_uuid(subject_id)],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?;
  if let Some((id, version)) = archived {
    let id = decode_uuid(&id)?;
    let written = write_status(conn, &GRADE_SUBJECTS, id, version, Status::Live);
    or_duplicate(written, || duplicate(grade_id, subject_id))?;
    return require(conn, id);
  }

  let now = Utc::now();
  let mapping = GradeSubject {
    grade_subject_id: Uuid::new_v4(),
    grade_id,
    subject_id,
    meta: RecordMeta::new(now),
  };
  let inserted = conn
    .execute(
      &format!(
        "INSERT INTO grade_subjects ({GRADE_SUBJECT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
      ),
      params![
        encode_uuid(mapping.grade_subject_id),
        encode_uuid(grade_id),
        encode_uuid(subject_id),
        status_text(mapping.meta.status),
        mapping.meta.version,
        encode_dt(now),
        encode_dt(now),
      ],
    )
    .map_err(Into::into);
  or_duplicate(inserted, || duplicate(grade_id, subject_id))?;
  Ok(mapping)
}

/// Archiving never touches existing enrollments. Restoring re-checks the
/// grade, the subject and pair uniqueness.
pub fn set_status(
  conn: &Connection,
  id: Uuid,
  status: Status,
  expected_version: Option<i64>,
) -> Result<GradeSubject> {
  let mapping = require(conn, id)?;
  check_version(&GRADE_SUBJECTS, id, mapping.meta.version, expected_version)?;
  if mapping.meta.status == status {
    return Ok(mapping);
  }

  let (grade_id, subject_id) = (mapping.grade_id, mapping.subject_id);
  if status.is_live() {
    require_live(conn, &GRADES, grade_id)?;
    require_live(conn, &SUBJECTS, subject_id)?;
    if live_mapping(conn, grade_id, subject_id)?.is_some() {
      return Err(duplicate(grade_id, subject_id).into());
    }
  }
  let written =
    write_status(conn, &GRADE_SUBJECTS, id, mapping.meta.version, status);
  or_duplicate(written, || duplicate(grade_id, subject_id))?;
  require(conn, id)
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<()> {
  let mapping = require(conn, id)?;
  let grade = encode_uuid(mapping.grade_id);
  let subject = encode_uuid(mapping.subject_id);

  let enrollments = count(
    conn,
    "SELECT COUNT(*) FROM student_subjects e
     JOIN students s ON s.student_id = e.student_id
     WHERE e.grade_subject_id = ?1
        OR (s.grade_id = ?2 AND e.subject_id = ?3)",
    params![encode_uuid(id), grade, subject],
  )?;
  let fees = count(
    conn,
    "SELECT COUNT(*) FROM fees WHERE grade_id = ?1 AND subject_id = ?2",
    [&grade, &subject],
  )?;
  if enrollments + fees > 0 {
    return Err(
      CoreError::HasDependents { entity: GRADE_SUBJECTS.entity, id }.into(),
    );
  }
  delete_row(conn, &GRADE_SUBJECTS, id)
}
