//! HTTP Basic verification against the configured user directory.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;
use tuition_core::{
  Error, Result,
  access::{Caller, IdentityProvider, Role},
};
use uuid::Uuid;

/// One login accepted by this server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
  /// The Parent/Teacher/Student record this login acts for.
  #[serde(default)]
  pub party_id:      Option<Uuid>,
}

/// [`IdentityProvider`] over a fixed list of users.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
  users: Vec<UserEntry>,
}

impl UserDirectory {
  pub fn new(users: Vec<UserEntry>) -> Self { Self { users } }

  fn verify(&self, username: &str, password: &str) -> Result<&UserEntry> {
    let user = self
      .users
      .iter()
      .find(|u| u.username == username)
      .ok_or(Error::Unauthenticated)?;

    let parsed_hash =
      PasswordHash::new(&user.password_hash).map_err(|_| Error::Unauthenticated)?;
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed_hash)
      .map_err(|_| Error::Unauthenticated)?;
    Ok(user)
  }
}

impl IdentityProvider for UserDirectory {
  fn identify(&self, credential: &str) -> Result<Caller> {
    let encoded = credential
      .strip_prefix("Basic ")
      .ok_or(Error::Unauthenticated)?;

    let decoded = B64.decode(encoded.trim()).map_err(|_| Error::Unauthenticated)?;
    let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthenticated)?;
    let (username, password) = creds.split_once(':').ok_or(Error::Unauthenticated)?;

    let user = self.verify(username, password)?;
    Ok(Caller {
      username: user.username.clone(),
      role:     user.role,
      party_id: user.party_id,
    })
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use rand_core::OsRng;

  use super::*;

  pub(crate) fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  pub(crate) fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  fn directory(party_id: Option<Uuid>) -> UserDirectory {
    UserDirectory::new(vec![UserEntry {
      username: "pat".into(),
      password_hash: hash("secret"),
      role: Role::Parent,
      party_id,
    }])
  }

  #[test]
  fn correct_credentials_resolve_caller() {
    let party = Uuid::new_v4();
    let caller = directory(Some(party)).identify(&basic("pat", "secret")).unwrap();
    assert_eq!(caller.username, "pat");
    assert_eq!(caller.role, Role::Parent);
    assert_eq!(caller.party_id, Some(party));
  }

  #[test]
  fn wrong_password() {
    let res = directory(None).identify(&basic("pat", "wrong"));
    assert!(matches!(res, Err(Error::Unauthenticated)));
  }

  #[test]
  fn unknown_user() {
    let res = directory(None).identify(&basic("sam", "secret"));
    assert!(matches!(res, Err(Error::Unauthenticated)));
  }

  #[test]
  fn invalid_base64() {
    let res = directory(None).identify("Basic !!!not-base64!!!");
    assert!(matches!(res, Err(Error::Unauthenticated)));
  }

  #[test]
  fn other_schemes_are_rejected() {
    let res = directory(None).identify("Bearer abc");
    assert!(matches!(res, Err(Error::Unauthenticated)));
  }
}
