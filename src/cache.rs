//! Persistent, append-only store of raw HTTP response bodies keyed by request URL.
//!
//! Every successful fetch appends a new entry; nothing is overwritten or evicted.
//! Freshness is decided at lookup time against the TTL of the matching expiry rule.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, TimeZone, Utc};
use fjall::Keyspace;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tokio::task;

/// A stored response body as it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub url: String,
    pub body: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    body: Vec<u8>,
    created_at: i64, // Unix timestamp (milliseconds)
}

/// Per-URL bookkeeping so an append only writes its own entry.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct HistoryHead {
    len: u64,
    newest: Option<u64>,
    newest_at: i64,
}

pub struct ResponseStore {
    // Held so the database stays open for as long as the keyspaces are in use.
    _db: fjall::Database,
    heads: Keyspace,
    entries: Keyspace,
    // Appends read and bump the URL's head, so they are serialized.
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for ResponseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStore").finish_non_exhaustive()
    }
}

/// `url \0 seq` with `seq` big-endian, so one URL's entries sort in append order.
fn entry_key(url: &[u8], seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(url.len() + 9);
    key.extend_from_slice(url);
    key.push(0);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn get_from_store(store: &Keyspace, key: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

fn read_head(heads: &Keyspace, url: &[u8]) -> Result<HistoryHead> {
    match get_from_store(heads, url)? {
        Some(bytes) => Ok(postcard::from_bytes(&bytes)?),
        None => Ok(HistoryHead::default()),
    }
}

fn read_entry(entries: &Keyspace, url: &[u8], seq: u64) -> Result<StoredEntry> {
    let bytes = get_from_store(entries, &entry_key(url, seq))?
        .ok_or(anyhow!("Missing entry {seq} of history"))?;
    Ok(postcard::from_bytes(&bytes)?)
}

fn to_cache_entry(url: &str, stored: StoredEntry) -> Result<CacheEntry> {
    let created_at = Utc
        .timestamp_millis_opt(stored.created_at)
        .single()
        .ok_or(anyhow!("Invalid stored timestamp {}", stored.created_at))?;
    Ok(CacheEntry {
        url: url.to_string(),
        body: stored.body,
        created_at,
    })
}

impl ResponseStore {
    /// Opens (or creates) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let heads = db.keyspace("response_heads", fjall::KeyspaceCreateOptions::default)?;
        let entries = db.keyspace("responses", fjall::KeyspaceCreateOptions::default)?;
        Ok(ResponseStore {
            _db: db,
            heads,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    /// Appends a body for `url`, stamped with the current time.
    pub async fn append(&self, url: &str, body: &[u8]) -> Result<()> {
        self.append_at(url, body, Utc::now()).await
    }

    /// Appends a body for `url` with an explicit creation time.
    #[tracing::instrument(name = "append_response", level = "debug", skip(self, body), fields(bytes = body.len()))]
    pub async fn append_at(&self, url: &str, body: &[u8], created_at: DateTime<Utc>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let heads = self.heads.clone();
        let entries = self.entries.clone();
        let key = url.as_bytes().to_vec();
        let created_at = created_at.timestamp_millis();
        let entry = postcard::to_stdvec(&StoredEntry {
            body: body.to_vec(),
            created_at,
        })?;

        task::spawn_blocking(move || -> Result<()> {
            let mut head = read_head(&heads, &key)?;
            let seq = head.len;
            entries.insert(entry_key(&key, seq), entry)?;

            head.len += 1;
            if head.newest.is_none() || created_at >= head.newest_at {
                head.newest = Some(seq);
                head.newest_at = created_at;
            }
            heads.insert(key, postcard::to_stdvec(&head)?)?;
            Ok(())
        })
        .await??;

        tracing::debug!("Stored response");
        Ok(())
    }

    /// Returns the newest body for `url` younger than `ttl`.
    /// Returns `None` when nothing was stored or every entry is stale.
    #[tracing::instrument(name = "lookup_response", level = "debug", skip(self))]
    pub async fn lookup(&self, url: &str, ttl: Duration) -> Result<Option<Vec<u8>>> {
        self.lookup_at(url, ttl, Utc::now()).await
    }

    pub async fn lookup_at(
        &self,
        url: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<u8>>> {
        let heads = self.heads.clone();
        let entries = self.entries.clone();
        let key = url.as_bytes().to_vec();

        let newest = task::spawn_blocking(move || -> Result<Option<StoredEntry>> {
            match read_head(&heads, &key)?.newest {
                Some(seq) => Ok(Some(read_entry(&entries, &key, seq)?)),
                None => Ok(None),
            }
        })
        .await??
        .map(|stored| to_cache_entry(url, stored))
        .transpose()?;

        match newest {
            Some(entry) if now - entry.created_at < ttl => {
                tracing::debug!("Key found and still fresh");
                Ok(Some(entry.body))
            }
            Some(_) => {
                tracing::debug!("Key found but expired");
                Ok(None)
            }
            None => {
                tracing::debug!("Key not found");
                Ok(None)
            }
        }
    }

    /// Every entry ever stored for `url`, oldest first.
    pub async fn history(&self, url: &str) -> Result<Vec<CacheEntry>> {
        let heads = self.heads.clone();
        let entries = self.entries.clone();
        let key = url.as_bytes().to_vec();

        let stored = task::spawn_blocking(move || -> Result<Vec<StoredEntry>> {
            let head = read_head(&heads, &key)?;
            (0..head.len)
                .map(|seq| read_entry(&entries, &key, seq))
                .collect()
        })
        .await??;

        stored
            .into_iter()
            .map(|stored| to_cache_entry(url, stored))
            .collect()
    }
}
