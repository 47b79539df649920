//! Sync command implementation

use anyhow::Result;

use super::utils::sync_now;
use crate::config::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let outcome = sync_now(settings)?;
    eprintln!("Sync completed: {} repositories tracked", outcome.watchlist.len());
    Ok(())
}
