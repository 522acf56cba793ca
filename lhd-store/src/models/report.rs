//! Audit report documents.

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde_json::{Map, Value};

use super::timestamp;
use crate::error::{Result, StoreError};

/// Fields owned by the store. Audit payloads cannot override them.
const RESERVED_FIELDS: [&str; 4] = ["_id", "siteId", "createdAt", "raw"];

/// State of a report's `raw` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    /// JSON-serialized full audit result
    Stored(String),
    /// Never stored (`null` or absent)
    Omitted,
    /// Purged by retention; stored as `false`
    Discarded,
}

impl RawPayload {
    pub fn to_bson(&self) -> Bson {
        match self {
            RawPayload::Stored(json) => Bson::String(json.clone()),
            RawPayload::Omitted => Bson::Null,
            RawPayload::Discarded => Bson::Boolean(false),
        }
    }

    pub fn from_bson(value: Option<Bson>) -> Result<Self> {
        match value {
            None | Some(Bson::Null) => Ok(RawPayload::Omitted),
            Some(Bson::String(json)) => Ok(RawPayload::Stored(json)),
            Some(Bson::Boolean(false)) => Ok(RawPayload::Discarded),
            Some(Bson::Boolean(true)) => Err(StoreError::malformed("raw", "is `true`")),
            Some(other) => Err(StoreError::malformed(
                "raw",
                format!("has unexpected type {:?}", other.element_type()),
            )),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawPayload::Stored(json) => Some(json),
            _ => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, RawPayload::Discarded)
    }

    fn to_json(&self) -> Value {
        match self {
            RawPayload::Stored(json) => Value::String(json.clone()),
            RawPayload::Omitted => Value::Null,
            RawPayload::Discarded => Value::Bool(false),
        }
    }
}

/// Report read back from the audits collection
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: ObjectId,
    pub site_id: String,
    pub created_at: DateTime<Utc>,
    pub raw: RawPayload,
    /// Every other field of the document
    pub audit: Document,
}

impl Report {
    pub fn from_document(mut doc: Document) -> Result<Self> {
        let id = match doc.remove("_id") {
            Some(Bson::ObjectId(id)) => id,
            Some(other) => {
                return Err(StoreError::malformed(
                    "_id",
                    format!("has unexpected type {:?}", other.element_type()),
                ))
            }
            None => return Err(StoreError::malformed("_id", "is missing")),
        };
        let site_id = match doc.remove("siteId") {
            Some(Bson::String(site_id)) => site_id,
            Some(other) => {
                return Err(StoreError::malformed(
                    "siteId",
                    format!("has unexpected type {:?}", other.element_type()),
                ))
            }
            None => return Err(StoreError::malformed("siteId", "is missing")),
        };
        let created_at = timestamp::from_bson("createdAt", doc.remove("createdAt"))?;
        let raw = RawPayload::from_bson(doc.remove("raw"))?;

        Ok(Self {
            id,
            site_id,
            created_at,
            raw,
            audit: doc,
        })
    }

    /// Relaxed extended JSON view of the report, `_id` as a hex string.
    ///
    /// The raw payload can be megabytes, so it is only included on request.
    pub fn to_json(&self, include_raw: bool) -> Value {
        let mut map = Map::new();
        map.insert("_id".into(), Value::String(self.id.to_hex()));
        map.insert("siteId".into(), Value::String(self.site_id.clone()));
        map.insert(
            "createdAt".into(),
            Value::String(timestamp::to_iso(self.created_at)),
        );
        for (key, value) in &self.audit {
            map.insert(key.clone(), value.clone().into_relaxed_extjson());
        }
        if include_raw {
            map.insert("raw".into(), self.raw.to_json());
        }
        Value::Object(map)
    }
}

/// Report to insert. The id is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub site_id: String,
    pub created_at: DateTime<Utc>,
    pub audit: Document,
}

impl NewReport {
    pub fn new(site_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            site_id: site_id.into(),
            created_at,
            audit: Document::new(),
        }
    }

    pub fn with_audit(mut self, audit: Document) -> Self {
        self.audit = audit;
        self
    }

    /// Build the stored document. Reserved keys inside `audit` are dropped.
    pub fn into_document(self, raw: RawPayload) -> Document {
        let mut doc = doc! {
            "siteId": self.site_id,
            "createdAt": timestamp::to_iso(self.created_at),
        };
        for (key, value) in self.audit {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                tracing::debug!(field = %key, "Dropping reserved field from audit payload");
                continue;
            }
            doc.insert(key, value);
        }
        doc.insert("raw", raw.to_bson());
        doc
    }
}
