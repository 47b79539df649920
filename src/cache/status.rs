//! Cache freshness.

use super::watchlist::{SyncStamp, SYNC_FILE};
use crate::error::{Result, SyncError};
use crate::utils::read_json;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Missing,
    Stale { last_sync: DateTime<Utc> },
    Fresh { last_sync: DateTime<Utc> },
}

impl CacheStatus {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Missing => None,
            Self::Stale { last_sync } | Self::Fresh { last_sync } => Some(*last_sync),
        }
    }

    /// `Ok` only for a fresh cache; otherwise the error that asks for a sync.
    pub fn require_fresh(self, cache_dir: &Path) -> Result<DateTime<Utc>> {
        match self {
            Self::Fresh { last_sync } => Ok(last_sync),
            Self::Stale { last_sync } => Err(SyncError::CacheStale { last_sync }),
            Self::Missing => Err(SyncError::CacheMissing(cache_dir.join(SYNC_FILE))),
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Stale { last_sync } => write!(f, "stale (last sync {last_sync})"),
            Self::Fresh { last_sync } => write!(f, "fresh (last sync {last_sync})"),
        }
    }
}

/// Stale once `last_sync` is older than `timeout_minutes` before `now`.
pub fn evaluate(last_sync: DateTime<Utc>, timeout_minutes: u64, now: DateTime<Utc>) -> CacheStatus {
    let cutoff = i64::try_from(timeout_minutes)
        .ok()
        .and_then(Duration::try_minutes)
        .and_then(|timeout| now.checked_sub_signed(timeout));
    match cutoff {
        Some(cutoff) if last_sync < cutoff => CacheStatus::Stale { last_sync },
        _ => CacheStatus::Fresh { last_sync },
    }
}

/// Reads `sync.json` under `cache_dir`. An unreadable stamp counts as missing.
pub fn cache_status(cache_dir: &Path, timeout_minutes: u64, now: DateTime<Utc>) -> CacheStatus {
    let path = cache_dir.join(SYNC_FILE);
    if !path.is_file() {
        return CacheStatus::Missing;
    }
    match read_json::<SyncStamp>(&path) {
        Ok(stamp) => evaluate(stamp.last_sync, timeout_minutes, now),
        Err(err) => {
            tracing::warn!("Ignoring unreadable sync stamp: {err}");
            CacheStatus::Missing
        }
    }
}
