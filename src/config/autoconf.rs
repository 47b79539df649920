//! Bootstrap `snyk-sync.yaml` and `snyk-orgs.yaml` from a live Snyk org.

use super::settings::{DefaultTarget, GroupConfig, SnykSection, SyncConfig, DEFAULT_ORIGIN};
use crate::domain::{OrgEntry, OrgTable};
use crate::error::{Result, SyncError};
use crate::remote::ScanPlatform;
use crate::utils::write_atomic;
use std::path::Path;

/// Group name written into a generated config.
pub const GENERATED_GROUP_NAME: &str = "default";
/// Environment variable a generated config reads the group token from.
pub const GENERATED_TOKEN_ENV: &str = "SNYK_TOKEN";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedConfig {
    pub config: SyncConfig,
    pub orgs: OrgTable,
}

/// Finds the group of `snyk_org` and every org in it with a `github-enterprise` integration.
pub fn discover(
    platform: &dyn ScanPlatform,
    token: &str,
    snyk_org: &str,
    github_org: &str,
) -> Result<GeneratedConfig> {
    let visible = platform
        .list_user_organizations(token)
        .map_err(|e| SyncError::remote("user organizations", e))?;
    let org = visible
        .into_iter()
        .find(|o| o.slug == snyk_org)
        .ok_or_else(|| SyncError::NotFound(format!("Snyk org {snyk_org}")))?;
    let group_id = org
        .group_id
        .ok_or_else(|| SyncError::NotFound(format!("group of Snyk org {snyk_org}")))?;

    let unit = format!("group {group_id}");
    let mut orgs = OrgTable::new();
    for member in
        platform.list_organizations(token, &group_id).map_err(|e| SyncError::remote(&unit, e))?
    {
        let integrations = platform
            .list_integrations(token, &member.id)
            .map_err(|e| SyncError::remote(format!("org {}", member.slug), e))?;
        if !integrations.contains_key(DEFAULT_ORIGIN) {
            tracing::debug!(org = %member.slug, "no {DEFAULT_ORIGIN} integration, skipping");
            continue;
        }
        orgs.insert(member.slug, OrgEntry { org_id: member.id, integrations });
    }
    if !orgs.contains_key(snyk_org) {
        tracing::warn!("{snyk_org} has no {DEFAULT_ORIGIN} integration; the default org is unusable");
    }
    tracing::info!("Discovered {} orgs in group {group_id}", orgs.len());

    let config = SyncConfig {
        github_orgs: vec![github_org.to_string()],
        snyk: SnykSection {
            groups: vec![GroupConfig {
                name: GENERATED_GROUP_NAME.to_string(),
                id: Some(group_id),
                token_env_name: GENERATED_TOKEN_ENV.to_string(),
                token: String::new(),
            }],
        },
        default: DefaultTarget {
            org_name: Some(snyk_org.to_string()),
            integration_name: Some(DEFAULT_ORIGIN.to_string()),
        },
        ..SyncConfig::default()
    };
    Ok(GeneratedConfig { config, orgs })
}

impl GeneratedConfig {
    /// Overwrites both files.
    pub fn write(&self, conf_path: &Path, orgs_path: &Path) -> Result<()> {
        let config = serde_yaml::to_string(&self.config)
            .map_err(|source| SyncError::Yaml { what: conf_path.display().to_string(), source })?;
        let orgs = serde_yaml::to_string(&self.orgs)
            .map_err(|source| SyncError::Yaml { what: orgs_path.display().to_string(), source })?;
        write_atomic(conf_path, config.as_bytes())?;
        write_atomic(orgs_path, orgs.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, load_org_table};
    use crate::testing::FakeScanPlatform;
    use tempfile::TempDir;

    fn platform() -> FakeScanPlatform {
        let mut fake = FakeScanPlatform::default();
        fake.add_org("g-1", "o-1", "platform");
        fake.add_org("g-1", "o-2", "sandbox");
        fake.add_org("g-2", "o-3", "elsewhere");
        fake.drop_integrations("o-2");
        fake
    }

    #[test]
    fn discovers_group_orgs_with_enterprise_integration() {
        let generated = discover(&platform(), "t", "platform", "acme").expect("discover");

        assert_eq!(generated.orgs.keys().collect::<Vec<_>>(), vec!["platform"]);
        assert_eq!(generated.orgs["platform"].org_id, "o-1");
        assert_eq!(generated.config.github_orgs, vec!["acme".to_string()]);
        assert_eq!(generated.config.snyk.groups[0].id.as_deref(), Some("g-1"));
        assert_eq!(generated.config.default.org_name.as_deref(), Some("platform"));
    }

    #[test]
    fn unknown_org_is_not_found() {
        let err = discover(&platform(), "t", "nope", "acme").expect_err("must fail");
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[test]
    fn written_files_load_back() {
        let tmp = TempDir::new().expect("tmp");
        let conf = tmp.path().join("snyk-sync.yaml");
        let orgs = tmp.path().join("snyk-orgs.yaml");
        let generated = discover(&platform(), "t", "platform", "acme").expect("discover");
        generated.write(&conf, &orgs).expect("write");

        let config = load_config(&conf).expect("config");
        assert_eq!(config.schema, 1);
        assert_eq!(config.snyk.groups[0].token_env_name, GENERATED_TOKEN_ENV);
        assert_eq!(load_org_table(&orgs).expect("orgs"), generated.orgs);
    }
}
