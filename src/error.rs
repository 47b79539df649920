//! Error taxonomy for the reconciliation engine.

use crate::remote::RemoteError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A collaborator call failed after its own retries; `unit` names the group, org or repo.
    #[error("remote unavailable for {unit}: {source}")]
    RemoteUnavailable {
        unit: String,
        #[source]
        source: RemoteError,
    },

    #[error("no cache found at {}", .0.display())]
    CacheMissing(PathBuf),

    #[error("cache is stale (last sync {last_sync})")]
    CacheStale { last_sync: DateTime<Utc> },

    /// Referenced entity is absent from the in-memory snapshot.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed YAML in {what}: {source}")]
    Yaml {
        what: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl SyncError {
    pub fn remote(unit: impl Into<String>, source: RemoteError) -> Self {
        Self::RemoteUnavailable { unit: unit.into(), source }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// `CacheMissing` and `CacheStale` mean "sync first", not "give up".
    pub fn needs_sync(&self) -> bool {
        matches!(self, Self::CacheMissing(_) | Self::CacheStale { .. })
    }
}
