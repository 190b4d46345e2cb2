//! SQLite backend for the tuition ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every ledger call is a single SQLite
//! transaction.

mod encode;
mod ops;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{ReceiptIssuer, SqliteStore};

#[cfg(test)]
mod tests;
