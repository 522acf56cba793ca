//! Database layer - connection management and repositories
//!
//! # Design Principles
//!
//! - One memoized client per process - repositories borrow a `&Database`
//! - Repositories are stateless and cache nothing
//! - Upserts by fixed id, no check-then-insert
//! - Driver errors propagate unchanged; "not found" is `None`

pub mod connection;
pub mod repos;

pub use connection::{redact_uri, Connection, ConnectionManager};
pub use repos::*;
