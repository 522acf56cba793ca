//! System repository
//!
//! Reads and upserts the singleton worker status document.

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use mongodb::{Collection, Database};
use tracing::debug;

use crate::collections::SYSTEM_COLLECTION;
use crate::error::Result;
use crate::models::{timestamp, SystemDelta, SystemInfo, SYSTEM_INFO_ENTRY_ID};

/// System info repository
pub struct SystemRepo<'a> {
    db: &'a Database,
}

impl<'a> SystemRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<Document> {
        self.db.collection(SYSTEM_COLLECTION)
    }

    /// Get the system info object, `None` before the first write.
    pub async fn get_system_object(&self) -> Result<Option<SystemInfo>> {
        self.collection()
            .find_one(doc! { "_id": SYSTEM_INFO_ENTRY_ID })
            .await?
            .map(|doc| SystemInfo::from_document(&doc))
            .transpose()
    }

    pub async fn set_worker_last_run_date(&self, date: DateTime<Utc>) -> Result<()> {
        debug!("Set worker_last_run to {}", timestamp::to_iso(date));
        self.update_system_object(SystemDelta::last_run(date)).await
    }

    pub async fn set_worker_is_running(&self, is_running: bool) -> Result<()> {
        debug!("Set worker_is_running to {}", is_running);
        self.update_system_object(SystemDelta::running(is_running)).await
    }

    /// Record the end of a worker run in a single write.
    pub async fn finish_worker_run(&self, date: DateTime<Utc>) -> Result<()> {
        debug!("Finish worker run at {}", timestamp::to_iso(date));
        self.update_system_object(SystemDelta {
            worker_last_run: Some(date),
            worker_is_running: Some(false),
        })
        .await
    }

    /// Upsert by the fixed id, so the collection never holds more than one
    /// system document.
    async fn update_system_object(&self, delta: SystemDelta) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }

        self.collection()
            .update_one(
                doc! { "_id": SYSTEM_INFO_ENTRY_ID },
                doc! { "$set": delta.to_set_document() },
            )
            .upsert(true)
            .await?;
        Ok(())
    }
}
