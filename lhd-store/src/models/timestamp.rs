//! Timestamp encoding for stored documents.
//!
//! Report `createdAt` values are ISO-8601 UTC strings with millisecond
//! precision (`2024-05-01T08:30:00.000Z`). Every value has the same width,
//! so `$lt`/`$gt` and sorts compare them chronologically. That only holds
//! for years 0000 through 9999: chrono writes other years with a sign and
//! extra digits, so [`check_sortable`] rejects them before a write.
//!
//! BSON dates are accepted on read. MongoDB orders values by type before
//! value, so date-typed `createdAt` values sort as a group after all string
//! values and only range filters written against dates match them.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use mongodb::bson::{self, Bson};

use crate::error::{Result, StoreError};

/// Format a timestamp the way `createdAt` is stored.
pub fn to_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Reject timestamps whose ISO form would not sort with the rest.
pub fn check_sortable(field: &'static str, at: DateTime<Utc>) -> Result<()> {
    if (0..=9999).contains(&at.year()) {
        Ok(())
    } else {
        Err(StoreError::malformed(
            field,
            format!("year {} is outside 0000-9999", at.year()),
        ))
    }
}

pub fn to_bson_datetime(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

pub fn from_bson_datetime(at: bson::DateTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(at.timestamp_millis())
        .ok_or_else(|| StoreError::malformed("timestamp", "is out of range"))
}

/// Read a timestamp field stored either as an ISO string or a BSON date.
pub fn from_bson(field: &'static str, value: Option<Bson>) -> Result<DateTime<Utc>> {
    match value {
        Some(Bson::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::malformed(field, format!("is not an ISO-8601 timestamp: {e}"))),
        Some(Bson::DateTime(at)) => from_bson_datetime(at),
        Some(other) => Err(StoreError::malformed(
            field,
            format!("has unexpected type {:?}", other.element_type()),
        )),
        None => Err(StoreError::malformed(field, "is missing")),
    }
}
