//! Fee rates for a Grade/Subject/Teacher triple.
//!
//! Rates are immutable. A rate change is a new [`Fee`] with a later
//! `valid_from`; historical remittances keep referencing the rate they paid.
//! The rate in effect on a date is the latest one starting on or before it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Identifies the billable unit a rate applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateKey {
  pub grade_id:   Uuid,
  pub subject_id: Uuid,
  pub teacher_id: Uuid,
}

impl std::fmt::Display for RateKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "grade {} / subject {} / teacher {}",
      self.grade_id, self.subject_id, self.teacher_id
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
  pub fee_id:     Uuid,
  pub grade_id:   Uuid,
  pub subject_id: Uuid,
  pub teacher_id: Uuid,
  /// In the smallest currency unit.
  pub amount:     i64,
  pub valid_from: NaiveDate,
  pub created_at: DateTime<Utc>,
}

impl Fee {
  pub fn key(&self) -> RateKey {
    RateKey {
      grade_id:   self.grade_id,
      subject_id: self.subject_id,
      teacher_id: self.teacher_id,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFee {
  pub grade_id:   Uuid,
  pub subject_id: Uuid,
  pub teacher_id: Uuid,
  pub amount:     i64,
  pub valid_from: NaiveDate,
}

impl NewFee {
  pub fn key(&self) -> RateKey {
    RateKey {
      grade_id:   self.grade_id,
      subject_id: self.subject_id,
      teacher_id: self.teacher_id,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.amount <= 0 {
      return Err(Error::Validation(format!(
        "fee amount must be positive, got {}",
        self.amount
      )));
    }
    Ok(())
  }
}

// ─── Rate windows ────────────────────────────────────────────────────────────

/// A rate together with the date its successor takes over (exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
  #[serde(flatten)]
  pub fee:         Fee,
  /// `None` for the open-ended, most recent rate.
  pub valid_until: Option<NaiveDate>,
}

/// The rate in effect on `as_of`: the latest `valid_from` not after it.
pub fn current_rate(rates: &[Fee], as_of: NaiveDate) -> Option<&Fee> {
  rates
    .iter()
    .filter(|f| f.valid_from <= as_of)
    .max_by_key(|f| f.valid_from)
}

/// Order a triple's rates and close each window at the next rate's start.
pub fn rate_history(mut rates: Vec<Fee>) -> Vec<RateWindow> {
  rates.sort_by_key(|f| f.valid_from);
  let starts: Vec<NaiveDate> = rates.iter().map(|f| f.valid_from).collect();
  rates
    .into_iter()
    .enumerate()
    .map(|(i, fee)| RateWindow {
      fee,
      valid_until: starts.get(i + 1).copied(),
    })
    .collect()
}

/// A new rate must start strictly after every existing rate of its triple,
/// so no past date ever changes which rate resolves for it.
pub fn check_supersedes(existing: &[Fee], new: &NewFee) -> Result<()> {
  if existing.iter().any(|f| f.valid_from >= new.valid_from) {
    let key = new.key();
    return Err(Error::DuplicateRate {
      grade_id:   key.grade_id,
      subject_id: key.subject_id,
      teacher_id: key.teacher_id,
      valid_from: new.valid_from,
    });
  }
  Ok(())
}
