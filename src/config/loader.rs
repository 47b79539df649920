//! Config file loading

use super::settings::SyncConfig;
use crate::domain::OrgTable;
use crate::error::{Result, SyncError};
use crate::utils::read_yaml;
use figment::providers::{Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;

/// Load `snyk-sync.yaml`, layered over built-in defaults.
///
/// Unlike auto-discovered files, this path is always explicit, so a missing or malformed
/// file is a hard `ConfigInvalid`.
pub fn load_config(config_path: &Path) -> Result<SyncConfig> {
    if !config_path.is_file() {
        return Err(SyncError::ConfigInvalid(format!(
            "config file not found: {}",
            config_path.display()
        )));
    }

    let config: SyncConfig = Figment::from(Serialized::defaults(SyncConfig::default()))
        .merge(Yaml::file(config_path))
        .extract()
        .map_err(|e| {
            SyncError::ConfigInvalid(format!("{}: {}", config_path.display(), e))
        })?;

    if config.schema != 1 {
        tracing::warn!(
            "Unknown config schema {} in {}; continuing as schema 1",
            config.schema,
            config_path.display()
        );
    }

    Ok(config)
}

/// Load `snyk-orgs.yaml` (org slug to id and integrations).
pub fn load_org_table(orgs_path: &Path) -> Result<OrgTable> {
    if !orgs_path.is_file() {
        return Err(SyncError::ConfigInvalid(format!(
            "orgs file not found: {}",
            orgs_path.display()
        )));
    }
    let table: Option<OrgTable> = read_yaml(orgs_path)?;
    Ok(table.unwrap_or_default())
}
