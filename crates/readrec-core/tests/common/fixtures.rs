//! Test fixture utilities: Chrome-style history databases on disk

use std::path::PathBuf;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::{params, Connection};
use tempfile::TempDir;

/// Microseconds between the Chrome epoch (1601) and the Unix epoch
const CHROME_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

/// Fixed reference time so runs are reproducible
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn to_chrome_time(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros() + CHROME_EPOCH_OFFSET_MICROS
}

/// One row of the `urls` table
pub struct Row<'a> {
    pub url: &'a str,
    pub title: Option<&'a str>,
    pub visit_count: i64,
    pub last_visit: DateTime<Utc>,
}

pub fn row<'a>(url: &'a str, title: &'a str, visit_count: i64, days: i64) -> Row<'a> {
    Row {
        url,
        title: Some(title),
        visit_count,
        last_visit: days_ago(days),
    }
}

/// A temporary `History` database; removed when dropped
pub struct HistoryFixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl HistoryFixture {
    pub fn new(rows: &[Row<'_>]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("History");
        let conn = Connection::open(&path).expect("open fixture db");
        conn.execute_batch(
            "CREATE TABLE urls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url LONGVARCHAR,
                title LONGVARCHAR,
                visit_count INTEGER DEFAULT 0 NOT NULL,
                typed_count INTEGER DEFAULT 0 NOT NULL,
                last_visit_time INTEGER NOT NULL,
                hidden INTEGER DEFAULT 0 NOT NULL
            );",
        )
        .expect("create urls table");
        for r in rows {
            conn.execute(
                "INSERT INTO urls (url, title, visit_count, last_visit_time) VALUES (?1, ?2, ?3, ?4)",
                params![r.url, r.title, r.visit_count, to_chrome_time(r.last_visit)],
            )
            .expect("insert row");
        }
        drop(conn);
        Self { _dir: dir, path }
    }
}
