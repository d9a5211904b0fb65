use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};

const CACHE_VERSION: u32 = 1;

/// One cached response body per request key, stored as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    expiry_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    version: u32,
    pub body: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub fetched_at: i64,
}

impl CacheEntry {
    pub fn new(body: String, etag: Option<String>, last_modified: Option<String>) -> Self {
        Self {
            version: CACHE_VERSION,
            body,
            etag,
            last_modified,
            fetched_at: Utc::now().timestamp(),
        }
    }

    pub fn age_secs(&self) -> i64 {
        (Utc::now().timestamp() - self.fetched_at).max(0)
    }
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, expiry_hours: u64) -> Self {
        Self {
            dir: dir.into(),
            expiry_secs: i64::try_from(expiry_hours)
                .unwrap_or(i64::MAX)
                .saturating_mul(3600),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Any readable entry, regardless of age.
    pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let raw = fs::read_to_string(self.entry_path(key)).ok()?;
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.version == CACHE_VERSION => Some(entry),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("cache entry {key} is corrupted, ignoring it: {err}");
                None
            }
        }
    }

    /// An entry younger than the configured expiry.
    pub fn lookup_fresh(&self, key: &str) -> Option<CacheEntry> {
        self.lookup(key).filter(|e| e.age_secs() < self.expiry_secs)
    }

    pub fn store(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create cache dir {}", self.dir.display()))?;
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(entry).context("serialize cache entry")?;
        fs::write(&tmp, json).context("write cache entry")?;
        fs::rename(&tmp, &path).context("swap cache entry")?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

/// Performs a GET, revalidating against `cached` when it carries validators.
/// A `304 Not Modified` answer returns the cached entry with a fresh
/// timestamp.
pub fn fetch_revalidated(
    client: &Client,
    url: &str,
    cached: Option<&CacheEntry>,
) -> Result<CacheEntry> {
    let mut req = client.get(url);
    if let Some(entry) = cached {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let headers = resp.headers().clone();
    if status == StatusCode::NOT_MODIFIED {
        if let Some(entry) = cached {
            return Ok(CacheEntry::new(
                entry.body.clone(),
                entry.etag.clone(),
                entry.last_modified.clone(),
            ));
        }
        return Err(anyhow::anyhow!("received 304 without cache body"));
    }

    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {}: {}", status, body));
    }

    let etag = headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    Ok(CacheEntry::new(body, etag, last_modified))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_entry_round_trips_and_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().join("cache"), 24);
        let entry = CacheEntry::new("{\"ok\":true}".to_string(), Some("\"abc\"".to_string()), None);
        cache.store("bootstrap", &entry).unwrap();

        let fresh = cache.lookup_fresh("bootstrap").expect("entry should be fresh");
        assert_eq!(fresh.body, "{\"ok\":true}");
        assert_eq!(fresh.etag.as_deref(), Some("\"abc\""));
    }

    #[test]
    fn expired_entry_is_only_returned_by_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), 1);
        let mut entry = CacheEntry::new("old".to_string(), None, None);
        entry.fetched_at -= 2 * 3600;
        cache.store("period_3", &entry).unwrap();

        assert!(cache.lookup_fresh("period_3").is_none());
        assert_eq!(cache.lookup("period_3").map(|e| e.body), Some("old".to_string()));
    }

    #[test]
    fn huge_expiry_never_marks_entries_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), u64::MAX);
        let mut entry = CacheEntry::new("kept".to_string(), None, None);
        entry.fetched_at -= 365 * 24 * 3600;
        cache.store("period_1", &entry).unwrap();

        assert_eq!(cache.lookup_fresh("period_1").map(|e| e.body), Some("kept".to_string()));
    }

    #[test]
    fn corrupted_entry_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bootstrap.json"), "{not json").unwrap();
        let cache = ResponseCache::new(dir.path(), 24);
        assert!(cache.lookup("bootstrap").is_none());
    }
}
