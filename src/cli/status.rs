//! Status command implementation

use anyhow::Result;
use console::style;

use crate::cache::{cache_status, CacheStatus};
use crate::config::Settings;

/// Prints the cache state; a forced sync, stale or missing cache exits with code 1.
pub fn run(settings: &Settings) -> Result<()> {
    if settings.force_sync {
        println!("{}", style("Cache is out of sync (sync forced)").yellow());
        std::process::exit(1);
    }

    let status = cache_status(&settings.cache_dir, settings.cache_timeout, chrono::Utc::now());
    match status {
        CacheStatus::Fresh { .. } => {
            println!("{}", style(format!("Cache is {status}")).green());
            Ok(())
        }
        CacheStatus::Stale { .. } | CacheStatus::Missing => {
            println!("{}", style(format!("Cache is {status}")).yellow());
            std::process::exit(1);
        }
    }
}
