//! snyk-sync: keep Snyk organizations and projects in step with GitHub repositories
//!
//! Run without a subcommand to refresh a stale cache; see `--help` for the rest.

use anyhow::Result;

fn main() -> Result<()> {
    snyk_sync::cli::run()
}
