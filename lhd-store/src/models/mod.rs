//! Document models for the audits and system collections

pub mod report;
pub mod system;
pub mod timestamp;

pub use report::{NewReport, RawPayload, Report};
pub use system::{SystemDelta, SystemInfo, SYSTEM_INFO_ENTRY_ID};
