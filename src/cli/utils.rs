//! Shared CLI utilities.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::path::Path;

use super::GlobalArgs;
use crate::cache::{cache_status, Orgs, WatchList};
use crate::config::{load_config, merge_cli_with_config, Settings};
use crate::reconcile::{run_sync, SyncOutcome};
use crate::remote::{GitHubClient, SnykClient};
use crate::utils::write_json_atomic;

/// Resolve settings from the config files, CLI flags and environment.
pub fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let file = load_config(&global.conf)?;
    let settings = merge_cli_with_config(&global.conf, file, global.overrides(), |name| {
        std::env::var(name).ok()
    })?;
    std::fs::create_dir_all(&settings.cache_dir).with_context(|| {
        format!("Failed to create cache directory {}", settings.cache_dir.display())
    })?;
    tracing::debug!(
        conf = %settings.conf_path.display(),
        cache_dir = %settings.cache_dir.display(),
        groups = settings.groups.len(),
        orgs = settings.orgs.len(),
        "settings resolved"
    );
    Ok(settings)
}

pub fn snyk_client(settings: &Settings) -> Result<SnykClient> {
    SnykClient::new(&settings.snyk_api, settings.deadline).context("Failed to build Snyk client")
}

/// Progress on stderr; hidden when stderr is not a terminal.
pub fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Run a full sync against the live platforms.
pub fn sync_now(settings: &Settings) -> Result<SyncOutcome> {
    let token = settings
        .github_token
        .as_deref()
        .context("GITHUB_TOKEN (or --github-token) is required to sync")?;
    let github = GitHubClient::new(&settings.github_api, token, settings.deadline)
        .context("Failed to build GitHub client")?;
    let snyk = snyk_client(settings)?;

    tracing::info!("Sync starting");
    let progress = progress_bar();
    let outcome = run_sync(settings, &github, &snyk, &progress).context("Sync failed")?;
    let report = &outcome.report;
    if !report.skipped_orgs.is_empty() {
        tracing::warn!("Skipped GitHub orgs: {}", report.skipped_orgs.join(", "));
    }
    tracing::info!(
        "Total repos: {}, with import.yaml: {}, Snyk projects cached: {}",
        report.repos,
        report.declarations,
        report.cache.projects
    );
    Ok(outcome)
}

/// Load both caches, syncing first when forced, stale, missing or unreadable.
pub fn load_or_sync(settings: &Settings) -> Result<(WatchList, Orgs)> {
    if settings.force_sync {
        tracing::info!("Sync forced, ignoring cache status");
        return sync_now(settings).map(|o| (o.watchlist, o.orgs));
    }

    let status = cache_status(&settings.cache_dir, settings.cache_timeout, chrono::Utc::now());
    match status.require_fresh(&settings.cache_dir) {
        Ok(_) => tracing::info!("Cache is less than {} minutes old", settings.cache_timeout),
        Err(err) => {
            tracing::info!("{err}; syncing");
            return sync_now(settings).map(|o| (o.watchlist, o.orgs));
        }
    }

    let loaded = WatchList::load(&settings.cache_dir).and_then(|watchlist| {
        let mut orgs = Orgs::new(&settings.cache_dir, &settings.groups);
        orgs.load()?;
        Ok((watchlist, orgs))
    });
    match loaded {
        Ok(caches) => Ok(caches),
        Err(err) if err.needs_sync() => {
            tracing::info!("{err}; syncing");
            sync_now(settings).map(|o| (o.watchlist, o.orgs))
        }
        Err(err) => Err(err).context("Failed to load cache"),
    }
}

/// Pretty JSON to stdout, the only machine-readable channel.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_json_atomic(path, value).with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Wrote {}", console::style(path.display()).green());
    Ok(())
}
