//! SQLite backend for the Ballot voting service.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Because every call is serialised onto
//! that one connection, and vote casting additionally runs inside
//! `BEGIN IMMEDIATE`, concurrent ballots can neither lose an increment nor
//! both pass the has-voted check.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
