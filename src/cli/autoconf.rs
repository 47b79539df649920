//! Autoconf command implementation

use anyhow::{Context, Result};
use clap::Args;

use super::GlobalArgs;
use crate::config::{discover, load_config, resolve_orgs_file, SyncConfig};
use crate::remote::{Deadline, SnykClient};
use crate::remote::snyk::SNYK_API_URL;

#[derive(Args)]
pub struct AutoconfArgs {
    /// The Snyk org slug to use as default
    #[arg(value_name = "SNYK_ORG")]
    pub snyk_org: String,

    /// The GitHub org to watch
    #[arg(value_name = "GITHUB_ORG")]
    pub github_org: String,
}

/// Overwrites the config and orgs files; neither needs to exist beforehand.
pub fn run(global: &GlobalArgs, args: &AutoconfArgs) -> Result<()> {
    let token = global
        .snyk_token
        .as_deref()
        .context("SNYK_TOKEN (or --snyk-token) is required for autoconf")?;

    // An existing config may relocate the orgs file.
    let existing = if global.conf.is_file() {
        load_config(&global.conf).unwrap_or_else(|err| {
            tracing::warn!("Ignoring existing config: {err}");
            SyncConfig::default()
        })
    } else {
        SyncConfig::default()
    };
    let orgs_path = resolve_orgs_file(&global.conf, global.orgs_file.as_deref(), &existing);

    let api = global.snyk_api.as_deref().or(existing.snyk_api.as_deref()).unwrap_or(SNYK_API_URL);
    let client = SnykClient::new(api, Deadline::from_secs(global.deadline))
        .context("Failed to build Snyk client")?;

    let generated = discover(&client, token, &args.snyk_org, &args.github_org)
        .with_context(|| format!("Failed to discover the group of {}", args.snyk_org))?;
    generated.write(&global.conf, &orgs_path)?;

    eprintln!(
        "Wrote {} and {} ({} orgs)",
        console::style(global.conf.display()).green(),
        console::style(orgs_path.display()).green(),
        generated.orgs.len()
    );
    Ok(())
}
