//! Ledger operations, one module per component.
//!
//! Every function here runs against a connection that is already inside a
//! transaction opened by [`SqliteStore`](crate::SqliteStore), so a rejected
//! call rolls back everything it wrote. Pre-checks produce precise domain
//! errors; the UNIQUE indexes in [`crate::schema`] are the backstop and are
//! mapped to the same errors.

pub mod catalog;
pub mod curriculum;
pub mod enrollment;
pub mod fees;
pub mod remittances;
pub mod roster;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, Params, Row, ToSql, ffi, params};
use tuition_core::{
  Error as CoreError,
  catalog::CatalogKind,
  record::{Entity, Status},
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{decode_status, encode_dt, encode_uuid},
};

// ─── Tables ──────────────────────────────────────────────────────────────────

/// A versioned collection and its primary-key column.
pub struct Table {
  pub name:   &'static str,
  pub id_col: &'static str,
  pub entity: Entity,
}

pub static GRADES: Table =
  Table { name: "grades", id_col: "grade_id", entity: Entity::Grade };
pub static SUBJECTS: Table =
  Table { name: "subjects", id_col: "subject_id", entity: Entity::Subject };
pub static GRADE_SUBJECTS: Table = Table {
  name:   "grade_subjects",
  id_col: "grade_subject_id",
  entity: Entity::GradeSubject,
};
pub static TEACHERS: Table =
  Table { name: "teachers", id_col: "teacher_id", entity: Entity::Teacher };
pub static PARENTS: Table =
  Table { name: "parents", id_col: "parent_id", entity: Entity::Parent };
pub static STUDENTS: Table =
  Table { name: "students", id_col: "student_id", entity: Entity::Student };
pub static ENROLLMENTS: Table = Table {
  name:   "student_subjects",
  id_col: "enrollment_id",
  entity: Entity::Enrollment,
};

pub fn catalog_table(kind: CatalogKind) -> &'static Table {
  match kind {
    CatalogKind::Grade => &GRADES,
    CatalogKind::Subject => &SUBJECTS,
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Prepare `sql`, map every row with `f` and collect.
pub fn query_rows<R>(
  conn: &Connection,
  sql: &str,
  params: impl Params,
  f: impl FnMut(&Row<'_>) -> rusqlite::Result<R>,
) -> Result<Vec<R>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params, f)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Run a `SELECT COUNT(*) ...` query.
pub fn count(conn: &Connection, sql: &str, params: impl Params) -> Result<i64> {
  Ok(conn.query_row(sql, params, |r| r.get(0))?)
}

/// Current status and version of a row, or `None` when absent.
pub fn row_state(
  conn: &Connection,
  table: &Table,
  id: Uuid,
) -> Result<Option<(Status, i64)>> {
  let sql = format!(
    "SELECT status, version FROM {} WHERE {} = ?1",
    table.name, table.id_col
  );
  let raw: Option<(String, i64)> = conn
    .query_row(&sql, [encode_uuid(id)], |r| Ok((r.get(0)?, r.get(1)?)))
    .optional()?;
  raw
    .map(|(status, version)| Ok((decode_status(&status)?, version)))
    .transpose()
}

/// Resolve a reference that must exist and be Live. Absent and archived
/// records are both `NotFound`.
pub fn require_live(conn: &Connection, table: &Table, id: Uuid) -> Result<()> {
  match row_state(conn, table, id)? {
    Some((Status::Live, _)) => Ok(()),
    _ => Err(CoreError::not_found(table.entity, id).into()),
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn check_version(
  table: &Table,
  id: Uuid,
  actual: i64,
  expected: Option<i64>,
) -> Result<()> {
  match expected {
    Some(expected) if expected != actual => Err(
      CoreError::ConcurrentModification {
        entity: table.entity,
        id,
        expected,
        actual,
      }
      .into(),
    ),
    _ => Ok(()),
  }
}

/// Apply `assignments` (an SQL `SET` fragment using `?1..?n` for `values`)
/// to one row, bumping its version and `updated_at`, provided the row is
/// still at `version`.
pub fn bump(
  conn: &Connection,
  table: &Table,
  id: Uuid,
  version: i64,
  assignments: &str,
  values: &[&dyn ToSql],
) -> Result<()> {
  let n = values.len();
  let sql = format!(
    "UPDATE {table} SET {assignments}, version = version + 1, updated_at = ?{at}
     WHERE {id_col} = ?{id_at} AND version = ?{ver_at}",
    table = table.name,
    id_col = table.id_col,
    at = n + 1,
    id_at = n + 2,
    ver_at = n + 3,
  );
  let now = encode_dt(Utc::now());
  let id_str = encode_uuid(id);
  let mut params: Vec<&dyn ToSql> = values.to_vec();
  params.push(&now);
  params.push(&id_str);
  params.push(&version);

  if conn.execute(&sql, params.as_slice())? == 0 {
    let actual = row_state(conn, table, id)?
      .map(|(_, v)| v)
      .ok_or_else(|| CoreError::not_found(table.entity, id))?;
    return Err(
      CoreError::ConcurrentModification {
        entity: table.entity,
        id,
        expected: version,
        actual,
      }
      .into(),
    );
  }
  Ok(())
}

/// Move a row to `status` with a version bump.
pub fn write_status(
  conn: &Connection,
  table: &Table,
  id: Uuid,
  version: i64,
  status: Status,
) -> Result<()> {
  let text = status_text(status);
  bump(conn, table, id, version, "status = ?1", params![text])
}

/// Hard-delete a row. A foreign-key violation means something still
/// references it.
pub fn delete_row(conn: &Connection, table: &Table, id: Uuid) -> Result<()> {
  let sql = format!("DELETE FROM {} WHERE {} = ?1", table.name, table.id_col);
  match conn.execute(&sql, [encode_uuid(id)]) {
    Ok(0) => Err(CoreError::not_found(table.entity, id).into()),
    Ok(_) => Ok(()),
    Err(rusqlite::Error::SqliteFailure(f, _))
      if f.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
    {
      Err(CoreError::HasDependents { entity: table.entity, id }.into())
    }
    Err(e) => Err(e.into()),
  }
}

// ─── Constraint mapping ──────────────────────────────────────────────────────

/// The UNIQUE constraint message (e.g. `"UNIQUE constraint failed:
/// fee_remittances.receipt_number"`) if `e` is a uniqueness violation.
pub fn unique_violation(e: &Error) -> Option<&str> {
  match e {
    Error::Sqlite(rusqlite::Error::SqliteFailure(f, msg))
      if f.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
    {
      Some(msg.as_deref().unwrap_or_default())
    }
    _ => None,
  }
}

/// Map a UNIQUE violation to the domain error produced by `dup`.
pub fn or_duplicate<T>(res: Result<T>, dup: impl FnOnce() -> CoreError) -> Result<T> {
  match res {
    Err(e) if unique_violation(&e).is_some() => Err(dup().into()),
    other => other,
  }
}

pub fn status_text(status: Status) -> &'static str {
  match status {
    Status::Live => "live",
    Status::Archive => "archive",
  }
}

/// Bind value for `(?n IS NULL OR status = ?n)` list filters.
pub fn status_filter(status: Option<Status>) -> Option<&'static str> {
  status.map(status_text)
}
