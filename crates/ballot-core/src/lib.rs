//! Core types and trait definitions for the Ballot voting service.
//!
//! Domain records, the error type handlers return, pure result and turnout
//! arithmetic, and the repository traits a storage backend implements. No
//! HTTP or SQL lives here.

pub mod alert;
pub mod analytics;
pub mod audit;
pub mod election;
pub mod error;
pub mod id;
pub mod observer;
pub mod store;
pub mod user;

pub use error::{Entity, Error, ErrorKind, Result};
