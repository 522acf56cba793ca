//! Command implementations for lhdctl

pub mod prune;
pub mod report;
pub mod system;

pub use prune::run_prune;
pub use report::run_report;
pub use system::run_system;
