//! Configuration file schema and the resolved runtime settings.

use crate::domain::OrgTable;
use crate::remote::Deadline;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ORIGIN: &str = "github-enterprise";
pub const DEFAULT_CACHE_TIMEOUT_MINUTES: u64 = 60;

/// A scanning-platform group and the environment variable holding its service token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub token_env_name: String,
    /// Filled from `token_env_name` at start-up; never written back to disk.
    #[serde(skip)]
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultTarget {
    #[serde(rename = "orgName", default)]
    pub org_name: Option<String>,
    #[serde(rename = "integrationName", default)]
    pub integration_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnykSection {
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

/// Contents of `snyk-sync.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_schema")]
    pub schema: u32,
    #[serde(default)]
    pub github_orgs: Vec<String>,
    #[serde(default)]
    pub snyk: SnykSection,
    #[serde(default)]
    pub default: DefaultTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snyk_api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orgs_file: Option<PathBuf>,
}

fn default_schema() -> u32 {
    1
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            github_orgs: Vec::new(),
            snyk: SnykSection::default(),
            default: DefaultTarget::default(),
            instance: None,
            origin: None,
            github_api: None,
            snyk_api: None,
            cache_dir: None,
            targets_dir: None,
            tags_dir: None,
            orgs_file: None,
        }
    }
}

/// Everything a command needs, resolved once at start-up and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub conf_path: PathBuf,
    pub cache_dir: PathBuf,
    pub cache_timeout: u64,
    pub forks: bool,
    pub force_sync: bool,
    pub targets_dir: PathBuf,
    pub tags_dir: PathBuf,
    pub orgs_file: PathBuf,
    pub github_orgs: Vec<String>,
    pub github_api: String,
    pub github_token: Option<String>,
    pub snyk_api: String,
    pub snyk_token: Option<String>,
    pub instance: Option<String>,
    pub origin: String,
    pub default_org: String,
    pub default_int: String,
    pub default_org_id: String,
    pub default_int_id: String,
    pub groups: Vec<GroupConfig>,
    pub orgs: OrgTable,
    pub deadline: Deadline,
}

impl Settings {
    /// Org ids from `snyk-orgs.yaml`; only these are cached.
    pub fn selected_org_ids(&self) -> Vec<String> {
        self.orgs.values().map(|entry| entry.org_id.clone()).collect()
    }
}
