//! Fee remittances: append-only payment records.
//!
//! A remittance settles one fee for one student and is owned by the paying
//! parent. It is never updated; the only removal path is an administrative
//! void, which leaves an [`AuditEntry`](crate::audit::AuditEntry) behind.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// How many receipt numbers to try before giving up with
/// [`Error::ReceiptCollision`].
pub const RECEIPT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRemittance {
  pub remittance_id:  Uuid,
  pub student_id:     Uuid,
  pub fee_id:         Uuid,
  pub parent_id:      Uuid,
  /// The enrollment this payment settles, resolved when it was recorded.
  pub enrollment_id:  Uuid,
  pub amount_paid:    i64,
  pub payment_date:   NaiveDate,
  /// Globally unique and immutable.
  pub receipt_number: String,
  /// Username of whoever recorded the payment.
  pub recorded_by:    String,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRemittance {
  pub student_id:   Uuid,
  pub fee_id:       Uuid,
  pub parent_id:    Uuid,
  pub amount_paid:  i64,
  pub payment_date: NaiveDate,
  pub recorded_by:  String,
}

impl NewRemittance {
  pub fn validate(&self) -> Result<()> {
    if self.amount_paid <= 0 {
      return Err(Error::Validation(format!(
        "amount paid must be positive, got {}",
        self.amount_paid
      )));
    }
    Ok(())
  }
}

/// Administrative correction request. Both fields are mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemittanceVoid {
  pub reason: String,
  pub actor:  String,
}

impl RemittanceVoid {
  pub fn normalized(mut self) -> Result<Self> {
    self.reason = self.reason.trim().to_owned();
    if self.reason.is_empty() {
      return Err(Error::Validation("a void requires a reason".into()));
    }
    if self.actor.trim().is_empty() {
      return Err(Error::Validation("a void requires an actor".into()));
    }
    Ok(self)
  }
}

/// Issue a fresh receipt number of the form `RCT-YYYYMMDD-XXXXXXXXXX`.
///
/// Ten random hex digits; uniqueness is enforced by the store, which retries
/// on collision.
pub fn issue_receipt_number(payment_date: NaiveDate) -> String {
  let entropy = Uuid::new_v4();
  format!(
    "RCT-{}-{}",
    payment_date.format("%Y%m%d"),
    hex::encode_upper(&entropy.as_bytes()[..5])
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn receipt_numbers_have_expected_shape() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    let receipt = issue_receipt_number(date);
    assert!(receipt.starts_with("RCT-20240105-"), "{receipt}");
    assert_eq!(receipt.len(), "RCT-20240105-".len() + 10);
    assert_ne!(receipt, issue_receipt_number(date));
  }

  #[test]
  fn void_requires_reason() {
    let void = RemittanceVoid { reason: "  ".into(), actor: "admin".into() };
    assert!(matches!(void.normalized(), Err(Error::Validation(_))));
  }

  #[test]
  fn zero_payment_is_invalid() {
    let input = NewRemittance {
      student_id:   Uuid::nil(),
      fee_id:       Uuid::nil(),
      parent_id:    Uuid::nil(),
      amount_paid:  0,
      payment_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
      recorded_by:  "p".into(),
    };
    assert!(input.validate().is_err());
  }
}
