//! Target gap: repositories that must be (re-)imported into the scanning platform.

use crate::cache::{Orgs, WatchList};
use crate::config::Settings;
use crate::domain::{GroupTargets, ImportTarget, OrgTable, Repo};
use crate::error::{Result, SyncError};
use std::collections::HashSet;

/// Org and integration defaults used when a repository declares nothing.
#[derive(Debug, Clone, Copy)]
pub struct TargetResolver<'a> {
    pub default_org: &'a str,
    pub default_integration: &'a str,
    pub org_table: &'a OrgTable,
}

impl<'a> TargetResolver<'a> {
    pub fn from_settings(settings: &'a Settings) -> Self {
        Self {
            default_org: &settings.default_org,
            default_integration: &settings.default_int,
            org_table: &settings.orgs,
        }
    }

    pub fn needs_target(&self, repo: &Repo) -> bool {
        repo.projects.is_empty() || repo.needs_reimport(self.default_org, self.org_table)
    }

    /// One target per declared branch.
    pub fn targets_for(&self, repo: &Repo) -> Result<Vec<ImportTarget>> {
        let slug = repo.org_slug(self.default_org);
        let entry = self.org_table.get(slug).ok_or_else(|| {
            SyncError::NotFound(format!("org {slug} for {} in the org table", repo.full_name))
        })?;
        let integration = repo.integration.as_deref().unwrap_or(self.default_integration);
        let integration_id = entry.integrations.get(integration).ok_or_else(|| {
            SyncError::NotFound(format!(
                "integration {integration} of org {slug} for {}",
                repo.full_name
            ))
        })?;

        Ok(repo
            .branches
            .iter()
            .map(|branch| ImportTarget {
                target: repo.source.target(branch),
                integration_id: integration_id.clone(),
                org_id: entry.org_id.clone(),
            })
            .collect())
    }
}

/// Every missing target, split by the group whose credential may submit it.
///
/// Repositories with unresolvable org or integration are logged and skipped.
pub fn find_targets(
    watchlist: &WatchList,
    orgs: &Orgs,
    resolver: &TargetResolver<'_>,
) -> Vec<GroupTargets> {
    let mut pending = Vec::new();
    for repo in watchlist.repos().iter().filter(|r| resolver.needs_target(r)) {
        match resolver.targets_for(repo) {
            Ok(targets) => pending.extend(targets),
            Err(err) => {
                tracing::warn!(repo = %repo.full_name, org = %repo.org, "Skipping target: {err}")
            }
        }
    }
    tracing::debug!(targets = pending.len(), "computed import targets");

    let mut grouped = Vec::with_capacity(orgs.groups().len());
    let mut claimed = HashSet::new();
    for group in orgs.groups() {
        let org_ids: HashSet<&str> =
            orgs.get_orgs_by_group(&group.name).iter().map(|o| o.id.as_str()).collect();
        let targets: Vec<ImportTarget> = pending
            .iter()
            .enumerate()
            .filter(|(_, t)| org_ids.contains(t.org_id.as_str()))
            .map(|(i, t)| {
                claimed.insert(i);
                t.clone()
            })
            .collect();
        grouped.push(GroupTargets { name: group.name.clone(), targets });
    }

    for (_, target) in pending.iter().enumerate().filter(|(i, _)| !claimed.contains(i)) {
        tracing::warn!(
            org_id = %target.org_id,
            repo = %format!("{}/{}", target.target.owner, target.target.name),
            "Target org is not part of any cached group"
        );
    }
    grouped
}
