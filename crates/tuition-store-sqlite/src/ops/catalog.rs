//! Grade and Subject catalog operations.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use tuition_core::{
  Error as CoreError,
  catalog::{CatalogEntry, CatalogKind, CatalogPatch, NewCatalogEntry},
  record::{RecordMeta, Status},
};
use uuid::Uuid;

use super::{
  Table, bump, catalog_table, check_version, count, delete_row, or_duplicate,
  query_rows, status_filter, status_text, write_status,
};
use crate::{
  Result,
  encode::{CATALOG_COLUMNS, RawCatalogEntry, encode_dt, encode_uuid},
};

fn select_sql(table: &Table) -> String {
  format!("SELECT {}, {CATALOG_COLUMNS} FROM {}", table.id_col, table.name)
}

/// Fails with `DuplicateName` if another Live entry of the same kind already
/// uses `name`.
fn ensure_name_free(
  conn: &Connection,
  kind: CatalogKind,
  name: &str,
  except: Option<Uuid>,
) -> Result<()> {
  let table = catalog_table(kind);
  let sql = format!(
    "SELECT COUNT(*) FROM {} WHERE name = ?1 AND status = 'live' AND {} IS NOT ?2",
    table.name, table.id_col
  );
  let taken = count(conn, &sql, params![name, except.map(encode_uuid)])?;
  if taken > 0 {
    return Err(duplicate(kind, name).into());
  }
  Ok(())
}

fn duplicate(kind: CatalogKind, name: &str) -> CoreError {
  CoreError::DuplicateName { entity: kind.entity(), name: name.to_owned() }
}

pub fn get(
  conn: &Connection,
  kind: CatalogKind,
  id: Uuid,
) -> Result<Option<CatalogEntry>> {
  let table = catalog_table(kind);
  let sql = format!("{} WHERE {} = ?1", select_sql(table), table.id_col);
  conn
    .query_row(&sql, [encode_uuid(id)], RawCatalogEntry::from_row)
    .optional()?
    .map(|raw| raw.into_entry(kind))
    .transpose()
}

fn require(conn: &Connection, kind: CatalogKind, id: Uuid) -> Result<CatalogEntry> {
  get(conn, kind, id)?
    .ok_or_else(|| CoreError::not_found(kind.entity(), id).into())
}

pub fn list(
  conn: &Connection,
  kind: CatalogKind,
  status: Option<Status>,
) -> Result<Vec<CatalogEntry>> {
  let table = catalog_table(kind);
  let sql = format!(
    "{} WHERE (?1 IS NULL OR status = ?1) ORDER BY name, created_at",
    select_sql(table)
  );
  query_rows(conn, &sql, [status_filter(status)], RawCatalogEntry::from_row)?
    .into_iter()
    .map(|raw| raw.into_entry(kind))
    .collect()
}

pub fn create(
  conn: &Connection,
  kind: CatalogKind,
  input: NewCatalogEntry,
) -> Result<CatalogEntry> {
  let input = input.normalized()?;
  ensure_name_free(conn, kind, &input.name, None)?;

  let now = Utc::now();
  let entry = CatalogEntry {
    id: Uuid::new_v4(),
    kind,
    name: input.name,
    description: input.description,
    meta: RecordMeta::new(now),
  };
  let table = catalog_table(kind);
  let sql = format!(
    "INSERT INTO {} ({}, {CATALOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    table.name, table.id_col
  );
  let inserted = conn
    .execute(&sql, params![
      encode_uuid(entry.id),
      entry.name,
      entry.description,
      status_text(entry.meta.status),
      entry.meta.version,
      encode_dt(now),
      encode_dt(now),
    ])
    .map_err(Into::into);
  or_duplicate(inserted, || duplicate(kind, &entry.name))?;
  Ok(entry)
}

pub fn update(
  conn: &Connection,
  kind: CatalogKind,
  id: Uuid,
  patch: CatalogPatch,
  expected_version: Option<i64>,
) -> Result<CatalogEntry> {
  let table = catalog_table(kind);
  let mut entry = require(conn, kind, id)?;
  check_version(table, id, entry.meta.version, expected_version)?;

  let version = entry.meta.version;
  patch.apply(&mut entry)?;
  if entry.meta.status.is_live() {
    ensure_name_free(conn, kind, &entry.name, Some(id))?;
  }
  let written = bump(
    conn,
    table,
    id,
    version,
    "name = ?1, description = ?2",
    params![entry.name, entry.description],
  );
  or_duplicate(written, || duplicate(kind, &entry.name))?;
  require(conn, kind, id)
}

pub fn set_status(
  conn: &Connection,
  kind: CatalogKind,
  id: Uuid,
  status: Status,
  expected_version: Option<i64>,
) -> Result<CatalogEntry> {
  let table = catalog_table(kind);
  let entry = require(conn, kind, id)?;
  check_version(table, id, entry.meta.version, expected_version)?;
  if entry.meta.status == status {
    return Ok(entry);
  }

  match status {
    Status::Live => ensure_name_free(conn, kind, &entry.name, Some(id))?,
    Status::Archive => ensure_no_live_dependents(conn, kind, id)?,
  }
  let written = write_status(conn, table, id, entry.meta.version, status);
  or_duplicate(written, || duplicate(kind, &entry.name))?;
  require(conn, kind, id)
}

/// Live mappings, and for grades Live students, keep an entry from being
/// archived.
fn ensure_no_live_dependents(
  conn: &Connection,
  kind: CatalogKind,
  id: Uuid,
) -> Result<()> {
  let table = catalog_table(kind);
  let key = encode_uuid(id);
  let mut live = count(
    conn,
    &format!(
      "SELECT COUNT(*) FROM grade_subjects WHERE {} = ?1 AND status = 'live'",
      table.id_col
    ),
    [&key],
  )?;
  if kind == CatalogKind::Grade {
    live += count(
      conn,
      "SELECT COUNT(*) FROM students WHERE grade_id = ?1 AND status = 'live'",
      [&key],
    )?;
  }
  if live > 0 {
    return Err(
      CoreError::HasActiveDependents { entity: kind.entity(), id }.into(),
    );
  }
  Ok(())
}

pub fn delete(conn: &Connection, kind: CatalogKind, id: Uuid) -> Result<()> {
  let table = catalog_table(kind);
  if get(conn, kind, id)?.is_none() {
    return Err(CoreError::not_found(kind.entity(), id).into());
  }

  let key = encode_uuid(id);
  let col = table.id_col;
  let mut refs = count(
    conn,
    &format!("SELECT COUNT(*) FROM grade_subjects WHERE {col} = ?1"),
    [&key],
  )?;
  refs += count(conn, &format!("SELECT COUNT(*) FROM fees WHERE {col} = ?1"), [
    &key,
  ])?;
  if kind == CatalogKind::Grade {
    refs += count(conn, "SELECT COUNT(*) FROM students WHERE grade_id = ?1", [
      &key,
    ])?;
  }
  if refs > 0 {
    return Err(CoreError::HasDependents { entity: kind.entity(), id }.into());
  }
  delete_row(conn, table, id)
}
