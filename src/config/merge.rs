//! Merge CLI/environment overrides with the config files into [`Settings`].
//!
//! Precedence: CLI flag or its environment variable > `snyk-sync.yaml` > defaults.
//! Relative paths in the config file resolve against the config file's directory.

use super::loader::load_org_table;
use super::settings::{
    Settings, SyncConfig, DEFAULT_CACHE_TIMEOUT_MINUTES, DEFAULT_ORIGIN,
};
use crate::error::{Result, SyncError};
use crate::remote::github::GITHUB_API_URL;
use crate::remote::snyk::SNYK_API_URL;
use crate::remote::Deadline;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub cache_dir: Option<PathBuf>,
    pub cache_timeout: Option<u64>,
    pub forks: bool,
    pub force_sync: bool,
    pub targets_dir: Option<PathBuf>,
    pub tags_dir: Option<PathBuf>,
    pub orgs_file: Option<PathBuf>,
    pub default_org: Option<String>,
    pub default_int: Option<String>,
    pub instance: Option<String>,
    pub github_token: Option<String>,
    pub snyk_token: Option<String>,
    pub github_api: Option<String>,
    pub snyk_api: Option<String>,
    pub deadline_secs: Option<u64>,
}

/// Directory holding the config file; relative config paths hang off it.
pub fn config_dir(conf_path: &Path) -> PathBuf {
    match conf_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Location of `snyk-orgs.yaml` without resolving the rest of the settings.
pub fn resolve_orgs_file(conf_path: &Path, cli: Option<&Path>, file: &SyncConfig) -> PathBuf {
    resolve_path(&config_dir(conf_path), cli, file.orgs_file.as_deref(), "snyk-orgs.yaml")
}

/// Build the runtime settings. `env` looks up group token variables.
pub fn merge_cli_with_config<F>(
    conf_path: &Path,
    file: SyncConfig,
    cli: CliOverrides,
    env: F,
) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let conf_dir = config_dir(conf_path);

    let cache_dir = resolve_path(&conf_dir, cli.cache_dir.as_deref(), file.cache_dir.as_deref(), "cache");
    let targets_dir = resolve_path(
        &conf_dir,
        cli.targets_dir.as_deref(),
        file.targets_dir.as_deref(),
        "import-targets",
    );
    let tags_dir = resolve_path(&conf_dir, cli.tags_dir.as_deref(), file.tags_dir.as_deref(), "tags");
    let orgs_file = resolve_orgs_file(conf_path, cli.orgs_file.as_deref(), &file);

    let default_org = cli
        .default_org
        .or(file.default.org_name)
        .ok_or_else(|| SyncError::ConfigInvalid("default.orgName is not set".to_string()))?;
    let default_int = cli.default_int.or(file.default.integration_name).ok_or_else(|| {
        SyncError::ConfigInvalid("default.integrationName is not set".to_string())
    })?;

    let mut groups = file.snyk.groups;
    for group in &mut groups {
        group.token = env(&group.token_env_name).filter(|t| !t.trim().is_empty()).ok_or_else(|| {
            SyncError::ConfigInvalid(format!(
                "environment variable {} for group {} is not set",
                group.token_env_name, group.name
            ))
        })?;
    }

    let orgs = load_org_table(&orgs_file)?;
    let default_entry = orgs.get(&default_org).ok_or_else(|| {
        SyncError::ConfigInvalid(format!(
            "default org {default_org} is missing from {}",
            orgs_file.display()
        ))
    })?;
    let default_org_id = default_entry.org_id.clone();
    let default_int_id = default_entry.integrations.get(&default_int).cloned().ok_or_else(|| {
        SyncError::ConfigInvalid(format!(
            "integration {default_int} is missing from default org {default_org}"
        ))
    })?;

    Ok(Settings {
        conf_path: conf_path.to_path_buf(),
        cache_dir,
        cache_timeout: cli.cache_timeout.unwrap_or(DEFAULT_CACHE_TIMEOUT_MINUTES),
        forks: cli.forks,
        force_sync: cli.force_sync,
        targets_dir,
        tags_dir,
        orgs_file,
        github_orgs: file.github_orgs,
        github_api: cli.github_api.or(file.github_api).unwrap_or_else(|| GITHUB_API_URL.to_string()),
        github_token: cli.github_token,
        snyk_api: cli.snyk_api.or(file.snyk_api).unwrap_or_else(|| SNYK_API_URL.to_string()),
        snyk_token: cli.snyk_token,
        instance: cli.instance.or(file.instance),
        origin: file.origin.unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
        default_org,
        default_int,
        default_org_id,
        default_int_id,
        groups,
        orgs,
        deadline: Deadline::from_secs(cli.deadline_secs),
    })
}

fn resolve_path(conf_dir: &Path, cli: Option<&Path>, file: Option<&Path>, default: &str) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    match file {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => conf_dir.join(path),
        None => conf_dir.join(default),
    }
}
