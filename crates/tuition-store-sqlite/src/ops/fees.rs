//! Fee schedule operations. Rates are insert-only.

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};
use tuition_core::{
  Error as CoreError,
  fee::{self, Fee, NewFee, RateKey},
  record::Entity,
};
use uuid::Uuid;

use super::{
  GRADES, SUBJECTS, TEACHERS, count, curriculum::live_mapping, or_duplicate,
  query_rows, require_live,
};
use crate::{
  Result,
  encode::{FEE_COLUMNS, RawFee, encode_date, encode_dt, encode_uuid},
};

fn duplicate(input: &NewFee) -> CoreError {
  CoreError::DuplicateRate {
    grade_id:   input.grade_id,
    subject_id: input.subject_id,
    teacher_id: input.teacher_id,
    valid_from: input.valid_from,
  }
}

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<Fee>> {
  conn
    .query_row(
      &format!("SELECT {FEE_COLUMNS} FROM fees WHERE fee_id = ?1"),
      [encode_uuid(id)],
      RawFee::from_row,
    )
    .optional()?
    .map(RawFee::into_fee)
    .transpose()
}

pub fn list(conn: &Connection) -> Result<Vec<Fee>> {
  query_rows(
    conn,
    &format!(
      "SELECT {FEE_COLUMNS} FROM fees
       ORDER BY grade_id, subject_id, teacher_id, valid_from"
    ),
    [],
    RawFee::from_row,
  )?
  .into_iter()
  .map(RawFee::into_fee)
  .collect()
}

/// Every rate recorded for `key`, oldest first.
pub fn list_rates(conn: &Connection, key: RateKey) -> Result<Vec<Fee>> {
  query_rows(
    conn,
    &format!(
      "SELECT {FEE_COLUMNS} FROM fees
       WHERE grade_id = ?1 AND subject_id = ?2 AND teacher_id = ?3
       ORDER BY valid_from"
    ),
    [
      encode_uuid(key.grade_id),
      encode_uuid(key.subject_id),
      encode_uuid(key.teacher_id),
    ],
    RawFee::from_row,
  )?
  .into_iter()
  .map(RawFee::into_fee)
  .collect()
}

/// Record a rate for a Live grade, subject and teacher whose subject is
/// currently offered for the grade. It must start after every earlier rate
/// of the same triple.
pub fn create(conn: &Connection, input: NewFee) -> Result<Fee> {
  input.validate()?;
  require_live(conn, &GRADES, input.grade_id)?;
  require_live(conn, &SUBJECTS, input.subject_id)?;
  require_live(conn, &TEACHERS, input.teacher_id)?;
  if live_mapping(conn, input.grade_id, input.subject_id)?.is_none() {
    return Err(
      CoreError::SubjectNotOfferedForGrade {
        grade_id:   input.grade_id,
        subject_id: input.subject_id,
      }
      .into(),
    );
  }
  fee::check_supersedes(&list_rates(conn, input.key())?, &input)?;

  let rate = Fee {
    fee_id:     Uuid::new_v4(),
    grade_id:   input.grade_id,
    subject_id: input.subject_id,
    teacher_id: input.teacher_id,
    amount:     input.amount,
    valid_from: input.valid_from,
    created_at: Utc::now(),
  };
  let inserted = conn
    .execute(
      &format!("INSERT INTO fees ({FEE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
      params![
        encode_uuid(rate.fee_id),
        encode_uuid(rate.grade_id),
        encode_uuid(rate.subject_id),
        encode_uuid(rate.teacher_id),
        rate.amount,
        encode_date(rate.valid_from),
        encode_dt(rate.created_at),
      ],
    )
    .map_err(Into::into);
  or_duplicate(inserted, || duplicate(&input))?;
  Ok(rate)
}

pub fn resolve_current(
  conn: &Connection,
  key: RateKey,
  as_of: NaiveDate,
) -> Result<Fee> {
  let rates = list_rates(conn, key)?;
  fee::current_rate(&rates, as_of).cloned().ok_or_else(|| {
    CoreError::NotFound {
      entity: Entity::Fee,
      key:    format!("{key} as of {as_of}"),
    }
    .into()
  })
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<()> {
  let key = encode_uuid(id);
  if get(conn, id)?.is_none() {
    return Err(CoreError::not_found(Entity::Fee, id).into());
  }
  let paid = count(
    conn,
    "SELECT COUNT(*) FROM fee_remittances WHERE fee_id = ?1",
    [&key],
  )?;
  if paid > 0 {
    return Err(CoreError::HasDependents { entity: Entity::Fee, id }.into());
  }
  conn.execute("DELETE FROM fees WHERE fee_id = ?1", [&key])?;
  Ok(())
}
