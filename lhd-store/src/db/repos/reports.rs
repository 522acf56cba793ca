//! Report repository
//!
//! Queries over the audits collection:
//! - site lists and "latest" sort on createdAt descending
//! - raw payload retention flips `raw` to `false`, keeping the report
//! - age retention deletes whole reports

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::{Collection, Database, IndexModel};
use serde::Serialize;
use tracing::debug;

use crate::collections::AUDIT_COLLECTION;
use crate::config::RawPolicy;
use crate::error::{Result, StoreError};
use crate::models::{timestamp, NewReport, RawPayload, Report};

/// Report repository
pub struct ReportRepo<'a> {
    db: &'a Database,
}

impl<'a> ReportRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<Document> {
        self.db.collection(AUDIT_COLLECTION)
    }

    /// Create the index backing the per-site queries. Idempotent.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder().keys(newest_first_for_site()).build();
        self.collection().create_index(index).await?;
        Ok(())
    }

    /// Get a report by its hex id. `Ok(None)` when no such report exists.
    pub async fn get_report_by_id(&self, id: &str) -> Result<Option<Report>> {
        let id = ObjectId::parse_str(id).map_err(|_| StoreError::invalid_id(id))?;
        self.get_report(id).await
    }

    pub async fn get_report(&self, id: ObjectId) -> Result<Option<Report>> {
        self.collection()
            .find_one(doc! { "_id": id })
            .await?
            .map(Report::from_document)
            .transpose()
    }

    /// Most recent reports for a site, newest first, at most `limit`.
    pub async fn get_reports_by_site_id(&self, site_id: &str, limit: u32) -> Result<Vec<Report>> {
        // the driver treats limit 0 as "no limit"
        if limit == 0 {
            return Ok(Vec::new());
        }

        let docs: Vec<Document> = self
            .collection()
            .find(site_filter(site_id))
            .sort(newest_first())
            .limit(i64::from(limit))
            .await?
            .try_collect()
            .await?;

        docs.into_iter().map(Report::from_document).collect()
    }

    pub async fn get_latest_report_by_site_id(&self, site_id: &str) -> Result<Option<Report>> {
        self.collection()
            .find_one(site_filter(site_id))
            .sort(newest_first())
            .await?
            .map(Report::from_document)
            .transpose()
    }

    pub async fn count_for_site(&self, site_id: &str) -> Result<u64> {
        Ok(self.collection().count_documents(site_filter(site_id)).await?)
    }

    /// Insert a new report, returning its id.
    ///
    /// With [`RawPolicy::Store`] the raw payload is serialized to JSON into
    /// `raw`; with [`RawPolicy::Ignore`] `raw` is written as `null`.
    pub async fn save_report<T>(&self, report: NewReport, raw: &T, policy: RawPolicy) -> Result<ObjectId>
    where
        T: Serialize + ?Sized,
    {
        timestamp::check_sortable("createdAt", report.created_at)?;
        let raw = match policy {
            RawPolicy::Store => RawPayload::Stored(serde_json::to_string(raw)?),
            RawPolicy::Ignore => {
                debug!("Ignore raw data");
                RawPayload::Omitted
            }
        };
        let site_id = report.site_id.clone();

        let inserted = self.collection().insert_one(report.into_document(raw)).await?;
        let id = inserted
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::malformed("_id", "was not assigned an ObjectId"))?;

        debug!(site_id = %site_id, id = %id, "Saved report");
        Ok(id)
    }

    /// Free space by discarding raw payloads of all but the newest
    /// `max_raw_reports` reports that still hold one. Returns how many
    /// reports were modified.
    pub async fn clear_reports(&self, max_raw_reports: u64) -> Result<u64> {
        debug!("Clearing older entries - Max allowed: {}", max_raw_reports);

        let rows: Vec<Document> = self
            .collection()
            .find(raw_retained_filter())
            .sort(newest_first())
            .skip(max_raw_reports)
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;

        let ids = rows
            .iter()
            .map(|row| {
                row.get_object_id("_id")
                    .map_err(|e| StoreError::malformed("_id", e.to_string()))
            })
            .collect::<Result<Vec<ObjectId>>>()?;

        debug!("Found {} rows to clear", ids.len());
        if ids.is_empty() {
            return Ok(0);
        }

        let result = self
            .collection()
            .update_many(doc! { "_id": { "$in": ids } }, discard_raw_update())
            .await?;

        debug!("Cleared {} rows raw data", result.modified_count);
        Ok(result.modified_count)
    }

    /// Delete reports created more than `max_age` ago. Returns how many
    /// were removed.
    pub async fn remove_old_reports(&self, max_age: Duration) -> Result<u64> {
        match retention_cutoff(Utc::now(), max_age) {
            Some(cutoff) => self.remove_reports_older_than(cutoff).await,
            None => {
                debug!(?max_age, "Retention window predates all timestamps, nothing to remove");
                Ok(0)
            }
        }
    }

    pub async fn remove_reports_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let filter = older_than_filter(cutoff);

        let rows = self.collection().count_documents(filter.clone()).await?;
        debug!("Found {} reports to remove", rows);

        let result = self.collection().delete_many(filter).await?;
        debug!("Removed {} reports", result.deleted_count);
        Ok(result.deleted_count)
    }
}

fn site_filter(site_id: &str) -> Document {
    doc! { "siteId": site_id }
}

/// `_id` breaks ties between reports with the same timestamp.
fn newest_first() -> Document {
    doc! { "createdAt": -1, "_id": -1 }
}

fn newest_first_for_site() -> Document {
    doc! { "siteId": 1, "createdAt": -1 }
}

/// Reports whose raw payload has not been discarded yet, including ones
/// stored without raw data.
fn raw_retained_filter() -> Document {
    doc! { "raw": { "$ne": false } }
}

fn discard_raw_update() -> Document {
    doc! { "$set": { "raw": RawPayload::Discarded.to_bson() } }
}

// `$lt` only compares within one BSON type, so string and date values each
// need their own branch
fn older_than_filter(cutoff: DateTime<Utc>) -> Document {
    doc! {
        "$or": [
            { "createdAt": { "$lt": timestamp::to_iso(cutoff) } },
            { "createdAt": { "$lt": timestamp::to_bson_datetime(cutoff) } },
        ]
    }
}

fn retention_cutoff(now: DateTime<Utc>, max_age: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
}
