//! Catalog entries: Grades and Subjects.
//!
//! Both are leaf records with only a name, a description and a status, so
//! they share one shape distinguished by [`CatalogKind`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, record::{Entity, RecordMeta}};

/// Which catalog collection an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
  Grade,
  Subject,
}

impl CatalogKind {
  pub fn entity(self) -> Entity {
    match self {
      Self::Grade => Entity::Grade,
      Self::Subject => Entity::Subject,
    }
  }
}

/// A Grade (e.g. "Grade 5") or a Subject (e.g. "Math").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
  pub id:          Uuid,
  pub kind:        CatalogKind,
  pub name:        String,
  pub description: Option<String>,
  #[serde(flatten)]
  pub meta:        RecordMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCatalogEntry {
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewCatalogEntry {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), description: None }
  }

  /// Trim the name and reject an empty one.
  pub fn normalized(mut self) -> Result<Self> {
    self.name = required_name(&self.name)?;
    Ok(self)
  }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
}

/// Trimmed, non-empty display name.
pub(crate) fn required_name(name: &str) -> Result<String> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation("name must not be empty".into()));
  }
  Ok(trimmed.to_owned())
}

impl CatalogPatch {
  pub fn apply(self, entry: &mut CatalogEntry) -> Result<()> {
    if let Some(name) = self.name {
      entry.name = required_name(&name)?;
    }
    if let Some(description) = self.description {
      entry.description = Some(description);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  #[test]
  fn blank_names_are_rejected() {
    let err = NewCatalogEntry::new("   ").normalized().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn names_are_trimmed() {
    let entry = NewCatalogEntry::new("  Grade 5 ").normalized().unwrap();
    assert_eq!(entry.name, "Grade 5");
  }

  #[test]
  fn patch_merges_present_fields() {
    let mut entry = CatalogEntry {
      id:          Uuid::new_v4(),
      kind:        CatalogKind::Subject,
      name:        "Math".into(),
      description: None,
      meta:        RecordMeta::new(Utc::now()),
    };
    CatalogPatch { name: None, description: Some("Arithmetic".into()) }
      .apply(&mut entry)
      .unwrap();
    assert_eq!(entry.name, "Math");
    assert_eq!(entry.description.as_deref(), Some("Arithmetic"));
  }
}
