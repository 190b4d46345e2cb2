//! Append-only audit log for administrative corrections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::record::Entity;

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
pub enum AuditAction {
  Void,
}

/// Records that a ledger record was removed, by whom and why, with a JSON
/// snapshot of the removed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
  pub audit_id:    Uuid,
  pub entity:      Entity,
  pub entity_id:   Uuid,
  pub action:      AuditAction,
  pub reason:      String,
  pub actor:       String,
  pub snapshot:    serde_json::Value,
  pub recorded_at: DateTime<Utc>,
}
