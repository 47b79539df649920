//! Groups and organizations on the scanning platform.

use super::project::Project;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level tenant. The credential lives in configuration and is never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub orgs: Vec<Org>,
}

impl Group {
    pub fn project_count(&self) -> usize {
        self.orgs.iter().map(|o| o.projects.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Org {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub group_id: String,
    /// Integration name to integration id.
    #[serde(default)]
    pub integrations: BTreeMap<String, String>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// One entry of `snyk-orgs.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgEntry {
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(default)]
    pub integrations: BTreeMap<String, String>,
}

/// Organization slug to entry, as declared in `snyk-orgs.yaml`.
pub type OrgTable = BTreeMap<String, OrgEntry>;
