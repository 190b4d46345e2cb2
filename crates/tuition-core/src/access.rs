//! Caller identity and role-based authorization.
//!
//! Credentials never reach the ledger. An [`IdentityProvider`] turns an opaque
//! credential into a [`Caller`], and an [`AccessGate`] decides whether that
//! caller may perform an [`Operation`]. Both run before any store call; the
//! resolved caller is passed explicitly, never looked up from ambient state.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// The four dashboard roles.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Principal,
  Teacher,
  Parent,
  Student,
}

/// Coarse-grained entry points guarded by the gate.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
  ReadLedger,
  ReadAudit,
  ManageCatalog,
  ManageCurriculum,
  ManageRoster,
  ManageEnrollment,
  ManageFees,
  RecordPayment,
  VoidPayment,
}

/// An authenticated principal, resolved per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
  pub username: String,
  pub role:     Role,
  /// The Parent/Teacher/Student record this login acts for, if any.
  pub party_id: Option<Uuid>,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Resolves the caller behind an opaque credential (e.g. an `Authorization`
/// header value).
pub trait IdentityProvider: Send + Sync {
  fn identify(&self, credential: &str) -> Result<Caller>;
}

/// Decides whether a caller may perform an operation.
pub trait AccessGate: Send + Sync {
  fn authorize(&self, caller: &Caller, operation: Operation) -> Result<()>;
}

// ─── Default policy ──────────────────────────────────────────────────────────

/// The fixed role table. Principals manage everything and teachers manage
/// enrollments. Parents and students only read; a payment made by a parent
/// is recorded by a principal against that parent's id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl RolePolicy {
  pub fn allows(role: Role, operation: Operation) -> bool {
    use Operation::*;
    match role {
      Role::Principal => true,
      Role::Teacher => matches!(operation, ReadLedger | ManageEnrollment),
      Role::Parent | Role::Student => matches!(operation, ReadLedger),
    }
  }
}

impl AccessGate for RolePolicy {
  fn authorize(&self, caller: &Caller, operation: Operation) -> Result<()> {
    if Self::allows(caller.role, operation) {
      Ok(())
    } else {
      Err(Error::Forbidden { role: caller.role, operation })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn caller(role: Role, party_id: Option<Uuid>) -> Caller {
    Caller { username: "u".into(), role, party_id }
  }

  #[test]
  fn principal_may_do_everything() {
    let gate = RolePolicy;
    let p = caller(Role::Principal, None);
    for op in [
      Operation::ManageCatalog,
      Operation::ManageFees,
      Operation::VoidPayment,
      Operation::ReadAudit,
    ] {
      assert!(gate.authorize(&p, op).is_ok(), "{op}");
    }
  }

  #[test]
  fn students_and_parents_are_read_only() {
    let gate = RolePolicy;
    for role in [Role::Student, Role::Parent] {
      let c = caller(role, Some(Uuid::new_v4()));
      assert!(gate.authorize(&c, Operation::ReadLedger).is_ok());
      for op in [
        Operation::RecordPayment,
        Operation::VoidPayment,
        Operation::ManageRoster,
        Operation::ManageEnrollment,
        Operation::ReadAudit,
      ] {
        assert!(
          matches!(gate.authorize(&c, op), Err(Error::Forbidden { .. })),
          "{role} {op}"
        );
      }
    }
  }

  #[test]
  fn teachers_manage_enrollments_only() {
    let t = caller(Role::Teacher, None);
    assert!(RolePolicy.authorize(&t, Operation::ManageEnrollment).is_ok());
    assert!(RolePolicy.authorize(&t, Operation::ManageFees).is_err());
  }

  #[test]
  fn role_deserialises_from_lowercase() {
    let r: Role = serde_json::from_str("\"principal\"").unwrap();
    assert_eq!(r, Role::Principal);
  }
}
