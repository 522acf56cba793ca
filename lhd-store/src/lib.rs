//! lhd-store: MongoDB persistence for LHD
//!
//! Stores periodic site-audit reports and the singleton worker status
//! record. Callers open a [`Connection`] through a [`ConnectionManager`]
//! and hand its database to the repositories in [`db`].

pub mod collections;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{load_dotenv, LhdConfig, RawPolicy};
pub use db::{Connection, ConnectionManager, ReportRepo, SystemRepo};
pub use error::{Result, StoreError};
pub use models::{NewReport, RawPayload, Report, SystemDelta, SystemInfo};
