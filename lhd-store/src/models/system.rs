//! Singleton worker status record.

use chrono::{DateTime, Utc};
use mongodb::bson::{Bson, Document};

use super::timestamp;
use crate::error::{Result, StoreError};

/// `_id` of the only document in the system collection
pub const SYSTEM_INFO_ENTRY_ID: i32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub worker_last_run: Option<DateTime<Utc>>,
    pub worker_is_running: bool,
}

impl SystemInfo {
    /// Fields that were never written read as their defaults.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let worker_last_run = match doc.get("worker_last_run") {
            None | Some(Bson::Null) => None,
            Some(value) => Some(timestamp::from_bson("worker_last_run", Some(value.clone()))?),
        };
        let worker_is_running = match doc.get("worker_is_running") {
            None | Some(Bson::Null) => false,
            Some(Bson::Boolean(running)) => *running,
            Some(other) => {
                return Err(StoreError::malformed(
                    "worker_is_running",
                    format!("has unexpected type {:?}", other.element_type()),
                ))
            }
        };

        Ok(Self {
            worker_last_run,
            worker_is_running,
        })
    }
}

/// Partial update of [`SystemInfo`]; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemDelta {
    pub worker_last_run: Option<DateTime<Utc>>,
    pub worker_is_running: Option<bool>,
}

impl SystemDelta {
    pub fn last_run(at: DateTime<Utc>) -> Self {
        Self {
            worker_last_run: Some(at),
            ..Self::default()
        }
    }

    pub fn running(is_running: bool) -> Self {
        Self {
            worker_is_running: Some(is_running),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.worker_last_run.is_none() && self.worker_is_running.is_none()
    }

    /// Body of the `$set` operator for this delta.
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(at) = self.worker_last_run {
            set.insert("worker_last_run", timestamp::to_bson_datetime(at));
        }
        if let Some(running) = self.worker_is_running {
            set.insert("worker_is_running", running);
        }
        set
    }
}
