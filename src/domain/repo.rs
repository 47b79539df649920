//! Tracked source repositories.

use super::import::ImportFields;
use super::org::OrgTable;
use super::project::{Project, Tag};
use super::target::TargetSource;
use crate::remote::RepoDescriptor;
use serde::{Deserialize, Serialize};

/// Sentinel org assignment for repositories without an explicit `orgName`.
pub const DEFAULT_ORG: &str = "default";

pub type RepoId = u64;

/// Where a repository lives on the source-hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSource {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RepoSource {
    pub fn target(&self, branch: &str) -> TargetSource {
        TargetSource {
            host: self.host.clone(),
            owner: self.owner.clone(),
            name: self.name.clone(),
            branch: branch.to_string(),
        }
    }
}

/// Upstream of a fork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

/// Non-owning reference from a repository to a project held by the org cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLink {
    pub org_id: String,
    pub project_id: String,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repo {
    pub id: RepoId,
    pub full_name: String,
    pub url: String,
    pub fork: bool,
    #[serde(default)]
    pub parent: Option<RepoRef>,
    pub source: RepoSource,
    pub branches: Vec<String>,
    pub org: String,
    #[serde(default)]
    pub integration: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Whether an import declaration was parsed for this repository.
    #[serde(default)]
    pub has_import: bool,
    #[serde(default)]
    pub projects: Vec<ProjectLink>,
}

impl Repo {
    pub fn from_descriptor(desc: &RepoDescriptor) -> Self {
        let (owner, name) = split_full_name(&desc.full_name);
        Self {
            id: desc.id,
            full_name: desc.full_name.clone(),
            url: desc.html_url.clone(),
            fork: desc.fork,
            parent: desc.parent.as_deref().map(|parent| {
                let (owner, name) = split_full_name(parent);
                RepoRef { owner, name }
            }),
            source: RepoSource { host: host_of(&desc.html_url), owner, name },
            branches: vec![desc.default_branch.clone()],
            org: DEFAULT_ORG.to_string(),
            integration: None,
            tags: Vec::new(),
            has_import: false,
            projects: Vec::new(),
        }
    }

    pub fn is_fork(&self) -> bool {
        self.fork
    }

    /// Merges a resolved import declaration into the record.
    pub fn apply_import(&mut self, fields: &ImportFields) {
        if let Some(org) = fields.org_name.as_ref().filter(|o| !o.trim().is_empty()) {
            self.org = org.trim().to_string();
        }
        if let Some(integration) = &fields.integration_name {
            self.integration = Some(integration.clone());
        }
        if let Some(branches) = fields.branches.as_ref().filter(|b| !b.is_empty()) {
            self.branches = branches.clone();
        }
        if let Some(tags) = &fields.tags {
            self.tags = tags.clone();
            self.tags.sort();
            self.tags.dedup();
        }
        self.has_import = true;
    }

    /// Links a matched project; linking the same project twice is a no-op.
    pub fn add_project(&mut self, project: &Project) {
        if self.projects.iter().any(|p| p.org_id == project.org_id && p.project_id == project.id) {
            return;
        }
        self.projects.push(ProjectLink {
            org_id: project.org_id.clone(),
            project_id: project.id.clone(),
            branch: project.branch.clone(),
        });
    }

    /// Org slug the repository should be imported into.
    pub fn org_slug<'a>(&'a self, default_org: &'a str) -> &'a str {
        if self.org == DEFAULT_ORG {
            default_org
        } else {
            &self.org
        }
    }

    pub fn expected_org_id<'a>(
        &'a self,
        default_org: &'a str,
        orgs: &'a OrgTable,
    ) -> Option<&'a str> {
        orgs.get(self.org_slug(default_org)).map(|entry| entry.org_id.as_str())
    }

    /// True when the attached projects no longer cover every declared branch in the
    /// expected organization (branch renamed, org reassigned by a newer declaration).
    pub fn needs_reimport(&self, default_org: &str, orgs: &OrgTable) -> bool {
        let Some(expected) = self.expected_org_id(default_org, orgs) else {
            return false;
        };
        self.branches.iter().any(|branch| {
            !self.projects.iter().any(|link| {
                link.org_id == expected && link.branch.as_deref().map_or(true, |b| b == branch)
            })
        })
    }
}

pub(crate) fn split_full_name(full_name: &str) -> (String, String) {
    match full_name.split_once('/') {
        Some((owner, name)) => (owner.to_string(), name.to_string()),
        None => (String::new(), full_name.to_string()),
    }
}

fn host_of(url: &str) -> String {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    rest.split('/').next().unwrap_or("").to_ascii_lowercase()
}
