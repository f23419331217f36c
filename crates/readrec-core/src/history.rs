//! Browser history access
//!
//! The Chrome `History` database is locked while the browser runs, so the
//! reader copies it into a temporary directory and queries the copy.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RecError, Result};
use crate::text::host_of;

/// One visited URL, after duplicate visits have been collapsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub url: String,
    pub host: String,
    pub title: String,
    /// Most recent visit
    pub visit_time: DateTime<Utc>,
    /// Total visits across all collapsed rows
    pub visit_count: u32,
}

impl VisitRecord {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        visit_time: DateTime<Utc>,
        visit_count: u32,
    ) -> Self {
        let url = url.into();
        Self {
            host: host_of(&url),
            url,
            title: title.into(),
            visit_time,
            visit_count,
        }
    }
}

/// Anything that can produce the visit history for a path
pub trait HistoryReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<VisitRecord>>;
}

/// Reads a Chromium-family `History` SQLite database
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeHistoryReader;

const HISTORY_QUERY: &str = "SELECT url, title, visit_count, last_visit_time \
     FROM urls \
     WHERE url LIKE 'http%' AND title IS NOT NULL AND title != ''";

impl HistoryReader for ChromeHistoryReader {
    fn read(&self, path: &Path) -> Result<Vec<VisitRecord>> {
        if !path.exists() {
            return Err(RecError::HistoryNotFound(path.to_path_buf()));
        }

        let tmp = tempfile::tempdir().map_err(|e| RecError::unreadable(path, e))?;
        let copy = tmp.path().join("History");
        std::fs::copy(path, &copy).map_err(|e| RecError::unreadable(path, e))?;

        // Recent visits may still sit in the write-ahead log
        let wal = wal_path(path);
        if wal.exists() {
            if let Err(e) = std::fs::copy(&wal, tmp.path().join("History-wal")) {
                tracing::debug!("Skipping history WAL {}: {}", wal.display(), e);
            }
        }

        let conn = rusqlite::Connection::open(&copy).map_err(|e| RecError::unreadable(path, e))?;
        let mut stmt = conn
            .prepare(HISTORY_QUERY)
            .map_err(|e| RecError::unreadable(path, e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            })
            .map_err(|e| RecError::unreadable(path, e))?;

        let mut records = Vec::new();
        for row in rows {
            let (url, title, visit_count, last_visit) =
                row.map_err(|e| RecError::unreadable(path, e))?;
            let visit_count = visit_count.unwrap_or(0).clamp(0, u32::MAX as i64) as u32;
            records.push(VisitRecord::new(
                url,
                title,
                chrome_time_to_utc(last_visit.unwrap_or(0)),
                visit_count,
            ));
        }

        let records = collapse_visits(records);
        tracing::info!("Read {} history records from {}", records.len(), path.display());
        Ok(records)
    }
}

fn wal_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("-wal");
    PathBuf::from(name)
}

/// Microseconds between 1601-01-01 and 1970-01-01
const CHROME_TO_UNIX_MICROS: i64 = 11_644_473_600_000_000;

/// Chrome stores microseconds since 1601-01-01 UTC
pub fn chrome_time_to_utc(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros.max(0) - CHROME_TO_UNIX_MICROS)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Collapse repeated URLs into one record with the latest visit time and
/// summed visit count. First-seen order is preserved.
pub fn collapse_visits(records: Vec<VisitRecord>) -> Vec<VisitRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<VisitRecord> = Vec::with_capacity(records.len());

    for record in records {
        match index.get(&record.url) {
            Some(&i) => {
                let existing = &mut out[i];
                existing.visit_count = existing.visit_count.saturating_add(record.visit_count);
                if record.visit_time > existing.visit_time {
                    existing.visit_time = record.visit_time;
                    existing.title = record.title;
                }
            }
            None => {
                index.insert(record.url.clone(), out.len());
                out.push(record);
            }
        }
    }
    out
}

/// Location of a Chrome profile's `History` file
pub fn resolve_history_path(profile: Option<&str>) -> PathBuf {
    let profile = profile.unwrap_or("Default");
    chrome_user_data_dir().join(profile).join("History")
}

fn chrome_user_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        dirs::config_dir()
            .unwrap_or_default()
            .join("Google")
            .join("Chrome")
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .unwrap_or_default()
            .join("Google")
            .join("Chrome")
            .join("User Data")
    } else {
        dirs::config_dir().unwrap_or_default().join("google-chrome")
    }
}

/// Expand a leading `~/` against the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
