//! Persistent caches: the organization snapshot and the watch list.
//!
//! Layout under the cache directory:
//! - `orgs.json`: groups, orgs and projects from the scanning platform
//! - `data.json`: tracked repositories
//! - `sync.json`: `{"last_sync": ...}`

pub mod orgs;
pub mod status;
pub mod watchlist;

pub use orgs::{CacheSummary, OrgSnapshot, Orgs, ORGS_CACHE_FILE};
pub use status::{cache_status, evaluate, CacheStatus};
pub use watchlist::{SyncStamp, WatchList, DATA_FILE, SYNC_FILE};
