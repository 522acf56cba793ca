//! Repository tests against a live MongoDB
//!
//! Run with:
//!   LHD_TEST_MONGODB_URI=mongodb://localhost:27017 cargo test -p lhd-store -- --ignored
//!
//! Each test works in its own throwaway database.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use lhd_store::collections::{AUDIT_COLLECTION, SYSTEM_COLLECTION};
use lhd_store::{
    Connection, ConnectionManager, NewReport, RawPolicy, RawPayload, ReportRepo, SystemRepo,
};
use mongodb::bson::{doc, Document};
use serde_json::json;

async fn scratch_database() -> Connection {
    let uri = std::env::var("LHD_TEST_MONGODB_URI").expect("LHD_TEST_MONGODB_URI required");
    let client = ConnectionManager::new()
        .connect(&uri)
        .await
        .expect("connect failed");
    let name = format!("lhd_test_{}", uuid::Uuid::new_v4().simple());
    Connection::with_database(client, &name)
}

fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, n, 12, 0, 0).unwrap()
}

async fn seed(repo: &ReportRepo<'_>, site: &str, days: impl IntoIterator<Item = u32>) {
    for n in days {
        let report = NewReport::new(site, day(n)).with_audit(doc! { "day": n as i32 });
        repo.save_report(report, &json!({ "day": n }), RawPolicy::Store)
            .await
            .expect("save failed");
    }
}

fn days_of(reports: &[lhd_store::Report]) -> Vec<i32> {
    reports
        .iter()
        .map(|r| r.audit.get_i32("day").expect("day field"))
        .collect()
}

#[tokio::test]
#[ignore = "requires database"]
async fn site_reports_are_newest_first_and_limited() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());
    repo.ensure_indexes().await.expect("index failed");

    seed(&repo, "site-a", [2, 5, 1, 4, 3]).await;
    seed(&repo, "site-b", [6]).await;

    let reports = repo.get_reports_by_site_id("site-a", 3).await.unwrap();
    assert_eq!(days_of(&reports), vec![5, 4, 3]);
    assert!(reports.iter().all(|r| r.site_id == "site-a"));

    let all = repo.get_reports_by_site_id("site-a", 50).await.unwrap();
    assert_eq!(days_of(&all), vec![5, 4, 3, 2, 1]);

    assert!(repo.get_reports_by_site_id("site-a", 0).await.unwrap().is_empty());
    assert!(repo.get_reports_by_site_id("nobody", 10).await.unwrap().is_empty());
    assert_eq!(repo.count_for_site("site-a").await.unwrap(), 5);

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn latest_report_is_max_created_at() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());

    assert!(repo.get_latest_report_by_site_id("site-a").await.unwrap().is_none());

    seed(&repo, "site-a", [3, 9, 7]).await;
    seed(&repo, "site-b", [20]).await;

    let latest = repo
        .get_latest_report_by_site_id("site-a")
        .await
        .unwrap()
        .expect("latest report");
    assert_eq!(latest.created_at, day(9));

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn get_by_id_roundtrips_and_misses_are_none() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());

    let id = repo
        .save_report(
            NewReport::new("site-a", day(1)).with_audit(doc! { "performance": 0.71 }),
            &json!({ "categories": { "performance": { "score": 0.71 } } }),
            RawPolicy::Store,
        )
        .await
        .unwrap();

    let report = repo.get_report_by_id(&id.to_hex()).await.unwrap().expect("saved report");
    assert_eq!(report.id, id);
    assert_eq!(report.site_id, "site-a");
    assert_eq!(report.created_at, day(1));
    assert_eq!(report.audit.get_f64("performance").unwrap(), 0.71);
    let raw: serde_json::Value = serde_json::from_str(report.raw.as_str().expect("raw stored")).unwrap();
    assert_eq!(raw["categories"]["performance"]["score"], json!(0.71));

    let missing = mongodb::bson::oid::ObjectId::new().to_hex();
    assert!(repo.get_report_by_id(&missing).await.unwrap().is_none());
    assert!(repo.get_report_by_id("not-an-object-id").await.is_err());

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn ignore_policy_stores_null_raw() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());

    let id = repo
        .save_report(NewReport::new("site-a", day(1)), &json!({ "huge": true }), RawPolicy::Ignore)
        .await
        .unwrap();

    let stored: Document = conn
        .database()
        .collection::<Document>(AUDIT_COLLECTION)
        .find_one(doc! { "_id": id })
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_null("raw"));

    let report = repo.get_report(id).await.unwrap().unwrap();
    assert_eq!(report.raw, RawPayload::Omitted);

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn clear_reports_keeps_raw_for_newest_only() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());

    seed(&repo, "site-a", [1, 3, 5]).await;
    seed(&repo, "site-b", [2, 4]).await;

    let cleared = repo.clear_reports(2).await.unwrap();
    assert_eq!(cleared, 3);

    let mut with_raw = Vec::new();
    for site in ["site-a", "site-b"] {
        for report in repo.get_reports_by_site_id(site, 10).await.unwrap() {
            if report.raw.is_discarded() {
                continue;
            }
            with_raw.push(report.created_at);
        }
    }
    with_raw.sort();
    assert_eq!(with_raw, vec![day(4), day(5)]);

    // Already-discarded reports are not counted again
    assert_eq!(repo.clear_reports(2).await.unwrap(), 0);
    assert_eq!(repo.clear_reports(10).await.unwrap(), 0);

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn clear_reports_counts_null_raw_toward_kept_window() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());

    for (n, policy) in [
        (1, RawPolicy::Store),
        (2, RawPolicy::Ignore),
        (3, RawPolicy::Store),
        (4, RawPolicy::Ignore),
        (5, RawPolicy::Store),
    ] {
        let report = NewReport::new("site-a", day(n)).with_audit(doc! { "day": n as i32 });
        repo.save_report(report, &json!({ "day": n }), policy).await.unwrap();
    }

    // day4 holds a kept slot even though it never stored a payload
    assert_eq!(repo.clear_reports(2).await.unwrap(), 3);

    let reports = repo.get_reports_by_site_id("site-a", 10).await.unwrap();
    let raw_by_day: Vec<(i32, RawPayload)> = reports
        .iter()
        .map(|r| (r.audit.get_i32("day").unwrap(), r.raw.clone()))
        .collect();

    assert!(matches!(raw_by_day[0], (5, RawPayload::Stored(_))));
    assert_eq!(raw_by_day[1], (4, RawPayload::Omitted));
    assert_eq!(
        raw_by_day[2..],
        [
            (3, RawPayload::Discarded),
            (2, RawPayload::Discarded),
            (1, RawPayload::Discarded),
        ]
    );

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn remove_old_reports_deletes_by_age() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());

    let now = Utc::now();
    for age_days in [1_i64, 10, 40, 400] {
        let created_at = now - chrono::Duration::days(age_days);
        repo.save_report(NewReport::new("site-a", created_at), &json!({}), RawPolicy::Store)
            .await
            .unwrap();
    }

    let removed = repo
        .remove_old_reports(Duration::from_secs(30 * 86_400))
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let cutoff = now - chrono::Duration::days(30);
    let remaining = repo.get_reports_by_site_id("site-a", 10).await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|r| r.created_at >= cutoff));

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn remove_old_reports_matches_date_typed_created_at() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());
    let audits = conn.database().collection::<Document>(AUDIT_COLLECTION);

    // Written by another tool with a BSON date instead of an ISO string
    for n in [1_u32, 20] {
        audits
            .insert_one(doc! {
                "siteId": "site-a",
                "createdAt": mongodb::bson::DateTime::from_millis(day(n).timestamp_millis()),
                "raw": null,
            })
            .await
            .unwrap();
    }
    seed(&repo, "site-a", [2, 21]).await;

    let removed = repo.remove_reports_older_than(day(10)).await.unwrap();
    assert_eq!(removed, 2);

    let mut remaining: Vec<_> = repo
        .get_reports_by_site_id("site-a", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.created_at)
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec![day(20), day(21)]);

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn save_rejects_unsortable_created_at() {
    let conn = scratch_database().await;
    let repo = ReportRepo::new(conn.database());

    let far_future = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    let err = repo
        .save_report(NewReport::new("site-a", far_future), &json!({}), RawPolicy::Store)
        .await
        .unwrap_err();
    assert!(matches!(err, lhd_store::StoreError::Malformed { field: "createdAt", .. }));
    assert_eq!(repo.count_for_site("site-a").await.unwrap(), 0);

    conn.database().drop().await.unwrap();
}

#[tokio::test]
#[ignore = "requires database"]
async fn system_object_upserts_a_single_record() {
    let conn = scratch_database().await;
    let repo = SystemRepo::new(conn.database());

    assert!(repo.get_system_object().await.unwrap().is_none());

    repo.set_worker_is_running(true).await.unwrap();
    repo.set_worker_is_running(true).await.unwrap();
    repo.set_worker_last_run_date(day(2)).await.unwrap();

    let info = repo.get_system_object().await.unwrap().expect("system object");
    assert!(info.worker_is_running);
    assert_eq!(info.worker_last_run, Some(day(2)));

    repo.finish_worker_run(day(3)).await.unwrap();
    let info = repo.get_system_object().await.unwrap().unwrap();
    assert!(!info.worker_is_running);
    assert_eq!(info.worker_last_run, Some(day(3)));

    let count = conn
        .database()
        .collection::<Document>(SYSTEM_COLLECTION)
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(count, 1);

    conn.database().drop().await.unwrap();
}
