//! Collection names shared with the worker and the HTTP API.

/// Audit reports, one document per audit run.
pub const AUDIT_COLLECTION: &str = "audits";

/// Singleton status record for the audit worker.
pub const SYSTEM_COLLECTION: &str = "system";
