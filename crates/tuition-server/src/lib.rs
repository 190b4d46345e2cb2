//! HTTP server wiring for the tuition ledger.
//!
//! Mounts the [`tuition_api`] router under `/api`, authenticates callers with
//! HTTP Basic against the configured [`UserDirectory`] and authorizes them
//! with the fixed [`RolePolicy`].

pub mod auth;

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tuition_api::{ApiState, api_router};
use tuition_core::{access::RolePolicy, store::LedgerStore};

pub use auth::{UserDirectory, UserEntry};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TUITION_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub users:      Vec<UserEntry>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("tuition.sqlite3") }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router for `store`.
pub fn app<S>(store: S, users: Vec<UserEntry>) -> Router
where
  S: LedgerStore + 'static,
{
  let state = ApiState {
    store:      Arc::new(store),
    gate:       Arc::new(RolePolicy),
    identities: Arc::new(UserDirectory::new(users)),
  };

  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}
