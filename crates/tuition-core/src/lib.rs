//! Core types and trait definitions for the tuition enrollment & fee ledger.
//!
//! No HTTP or database dependencies; every other crate builds on this one.

pub mod access;
pub mod audit;
pub mod catalog;
pub mod curriculum;
pub mod enrollment;
pub mod error;
pub mod fee;
pub mod record;
pub mod remittance;
pub mod roster;
pub mod store;

pub use error::{Error, Result};
pub use record::{Entity, RecordMeta, Status};
