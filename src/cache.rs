//! On-disk HTTP response cache.
//!
//! Each successful response is stored as one JSON file named after the
//! SHA-256 of the full request URL. Entries older than the configured TTL
//! are treated as misses and overwritten on the next fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, SearchError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub stored_at: DateTime<Utc>,
    pub status: u16,
    /// Raw `Link` header, needed to keep paginating from cache.
    pub link: Option<String>,
    pub rate_limit_remaining: Option<u32>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        if dir.is_file() {
            return Err(SearchError::Cache {
                message: format!("cache path '{}' is a file, not a directory", dir.display()),
            });
        }
        Ok(ResponseCache { dir, ttl })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a fully-qualified request URL.
    pub fn key(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(url)))
    }

    fn is_fresh(&self, entry: &CachedResponse, now: DateTime<Utc>) -> bool {
        match (now - entry.stored_at).to_std() {
            Ok(age) => age < self.ttl,
            // stored_at in the future: clock moved backwards, keep the entry
            Err(_) => true,
        }
    }

    /// Fresh entry for `url`, if any.
    pub async fn get(&self, url: &str) -> Option<CachedResponse> {
        let path = self.entry_path(url);
        let entry = read_entry(&path).await?;
        if entry.url != url {
            warn!("Cache key collision for {}, ignoring entry", url);
            return None;
        }
        if !self.is_fresh(&entry, Utc::now()) {
            debug!("Cache entry expired for {}", url);
            return None;
        }
        debug!("Cache hit for {}", url);
        Some(entry)
    }

    pub async fn put(&self, entry: &CachedResponse) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.entry_path(&entry.url);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(entry)?).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Cached response for {} at {}", entry.url, path.display());
        Ok(())
    }

    /// Remove every entry. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        self.remove_where(|_| true).await
    }

    /// Remove entries past their TTL, plus any that cannot be read.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        self.remove_where(|entry| entry.map_or(true, |e| !self.is_fresh(e, now))).await
    }

    async fn remove_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(Option<&CachedResponse>) -> bool,
    {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(dirent) = dir.next_entry().await? {
            let path = dirent.path();
            let name = dirent.file_name();
            let name = name.to_string_lossy();
            // leftover from an interrupted put
            if name.ends_with(".json.tmp") {
                fs::remove_file(&path).await?;
                removed += 1;
                continue;
            }
            if !name.ends_with(".json") {
                continue;
            }
            let entry = read_entry(&path).await;
            if predicate(entry.as_ref()) {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

async fn read_entry(path: &Path) -> Option<CachedResponse> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Unable to read cache entry {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Corrupt cache entry {}: {}", path.display(), e);
            None
        }
    }
}
