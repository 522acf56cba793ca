//! Repository implementations for database access
//!
//! Each repository borrows the database handle for its lifetime and
//! maps documents by hand into the model types.

pub mod reports;
pub mod system;

pub use reports::ReportRepo;
pub use system::SystemRepo;
