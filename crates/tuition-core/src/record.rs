//! Shared record envelope: the Live/Archive status, optimistic version and
//! server-assigned timestamps carried by every mutable ledger entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Two-state lifecycle. Archive suppresses new references without deleting
/// history.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
  #[default]
  Live,
  Archive,
}

impl Status {
  pub fn is_live(self) -> bool { matches!(self, Self::Live) }
}

// ─── Entity ──────────────────────────────────────────────────────────────────

/// Names each addressable collection; used in errors and audit entries.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Grade,
  Subject,
  GradeSubject,
  Teacher,
  Parent,
  Student,
  Enrollment,
  Fee,
  Remittance,
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// Lifecycle metadata flattened into every versioned record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
  pub status:     Status,
  /// Starts at 1; bumped by every state-changing write.
  pub version:    i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl RecordMeta {
  /// Metadata for a freshly created, Live record.
  pub fn new(now: DateTime<Utc>) -> Self {
    Self {
      status:     Status::Live,
      version:    1,
      created_at: now,
      updated_at: now,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn status_text_round_trips() {
    assert_eq!(Status::Live.as_ref(), "live");
    assert_eq!(Status::from_str("archive").unwrap(), Status::Archive);
    assert!(Status::from_str("deleted").is_err());
  }

  #[test]
  fn entity_names_are_snake_case() {
    assert_eq!(Entity::GradeSubject.to_string(), "grade_subject");
    assert_eq!(
      serde_json::to_string(&Entity::Remittance).unwrap(),
      "\"remittance\""
    );
  }

  #[test]
  fn new_records_start_live_at_version_one() {
    let meta = RecordMeta::new(Utc::now());
    assert!(meta.status.is_live());
    assert_eq!(meta.version, 1);
    assert_eq!(meta.created_at, meta.updated_at);
  }
}
