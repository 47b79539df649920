//! Organization cache: Group → Org → Project snapshot of the scanning platform.

use crate::config::GroupConfig;
use crate::domain::{Group, Org, Project};
use crate::error::{Result, SyncError};
use crate::matcher::{normalize_full_name, project_repo_name};
use crate::remote::{RemoteError, ScanPlatform};
use crate::utils::{read_json, write_json_atomic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const ORGS_CACHE_FILE: &str = "orgs.json";

/// The persisted unit. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgSnapshot {
    pub cached_at: DateTime<Utc>,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheSummary {
    pub groups: usize,
    pub orgs: usize,
    pub projects: usize,
}

pub struct Orgs {
    cache_dir: PathBuf,
    credentials: Vec<GroupConfig>,
    snapshot: Option<OrgSnapshot>,
}

impl Orgs {
    pub fn new(cache_dir: &Path, groups: &[GroupConfig]) -> Self {
        Self { cache_dir: cache_dir.to_path_buf(), credentials: groups.to_vec(), snapshot: None }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(ORGS_CACHE_FILE)
    }

    /// Rebuilds the snapshot from the platform.
    ///
    /// Groups are enumerated one at a time with their own credential. If any group fails the
    /// whole refresh fails and the previous snapshot is left untouched.
    pub fn refresh(
        &mut self,
        platform: &dyn ScanPlatform,
        origin: &str,
        selected_orgs: &[String],
    ) -> Result<()> {
        let selected: HashSet<&str> = selected_orgs.iter().map(String::as_str).collect();
        let mut groups = Vec::with_capacity(self.credentials.len());

        for credential in &self.credentials {
            tracing::info!("Refreshing Snyk group {}", credential.name);
            let group = refresh_group(platform, credential, origin, &selected)?;
            tracing::debug!(
                group = %group.name,
                orgs = group.orgs.len(),
                projects = group.project_count(),
                "group refreshed"
            );
            groups.push(group);
        }

        self.snapshot = Some(OrgSnapshot { cached_at: Utc::now(), groups });
        let summary = self.summary();
        tracing::info!(
            "Cached {} groups, {} orgs, {} projects",
            summary.groups,
            summary.orgs,
            summary.projects
        );
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let snapshot = self.snapshot.as_ref().ok_or_else(|| {
            SyncError::NotFound("organization snapshot (refresh or load first)".to_string())
        })?;
        write_json_atomic(&self.cache_path(), snapshot)
    }

    /// Fails with `CacheMissing` when nothing was saved yet; callers must refresh.
    pub fn load(&mut self) -> Result<()> {
        let path = self.cache_path();
        if !path.is_file() {
            return Err(SyncError::CacheMissing(path));
        }
        self.snapshot = Some(read_json(&path)?);
        let summary = self.summary();
        tracing::debug!(
            groups = summary.groups,
            orgs = summary.orgs,
            projects = summary.projects,
            "loaded organization cache"
        );
        Ok(())
    }

    pub fn snapshot(&self) -> Option<&OrgSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn groups(&self) -> &[Group] {
        self.snapshot.as_ref().map(|s| s.groups.as_slice()).unwrap_or(&[])
    }

    pub fn orgs(&self) -> impl Iterator<Item = &Org> {
        self.groups().iter().flat_map(|g| g.orgs.iter())
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.orgs().flat_map(|o| o.projects.iter())
    }

    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            groups: self.groups().len(),
            orgs: self.orgs().count(),
            projects: self.projects().count(),
        }
    }

    /// Every project whose declared remote source resolves to `full_name`.
    ///
    /// Linear scan; use [`crate::matcher::ProjectIndex`] when matching a whole watch list.
    pub fn find_projects_by_repo(&self, full_name: &str, repo_id: u64) -> Vec<&Project> {
        let wanted = normalize_full_name(full_name);
        let found: Vec<&Project> = self
            .projects()
            .filter(|p| project_repo_name(p).as_deref() == Some(wanted.as_str()))
            .collect();
        tracing::trace!(repo = full_name, repo_id, matches = found.len(), "project lookup");
        found
    }

    pub fn get_orgs_by_group(&self, group_name: &str) -> &[Org] {
        self.groups()
            .iter()
            .find(|g| g.name == group_name)
            .map(|g| g.orgs.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_token_for_group(&self, group_name: &str) -> Option<&str> {
        self.credentials.iter().find(|g| g.name == group_name).map(|g| g.token.as_str())
    }

    pub fn project(&self, org_id: &str, project_id: &str) -> Option<&Project> {
        self.orgs()
            .find(|o| o.id == org_id)
            .and_then(|o| o.projects.iter().find(|p| p.id == project_id))
    }

    pub fn project_mut(&mut self, org_id: &str, project_id: &str) -> Option<&mut Project> {
        self.snapshot
            .as_mut()?
            .groups
            .iter_mut()
            .flat_map(|g| g.orgs.iter_mut())
            .find(|o| o.id == org_id)
            .and_then(|o| o.projects.iter_mut().find(|p| p.id == project_id))
    }
}

fn refresh_group(
    platform: &dyn ScanPlatform,
    credential: &GroupConfig,
    origin: &str,
    selected: &HashSet<&str>,
) -> Result<Group> {
    let unit = format!("group {}", credential.name);
    let remote = |e: RemoteError| SyncError::remote(unit.clone(), e);
    let token = credential.token.as_str();

    let group_id = match &credential.id {
        Some(id) => id.clone(),
        None => discover_group_id(platform, credential)?,
    };

    let mut orgs = Vec::new();
    for org in platform.list_organizations(token, &group_id).map_err(remote)? {
        if !selected.contains(org.id.as_str()) {
            continue;
        }
        let integrations = platform.list_integrations(token, &org.id).map_err(remote)?;
        let projects = platform
            .list_projects(token, &org.id)
            .map_err(remote)?
            .into_iter()
            .filter(|p| origin.is_empty() || p.origin == origin)
            .map(|p| Project {
                id: p.id,
                name: p.name,
                org_id: org.id.clone(),
                origin: p.origin,
                remote_url: p.remote_url,
                branch: p.branch,
                tags: p.tags,
            })
            .collect();
        orgs.push(Org {
            id: org.id,
            name: org.name,
            slug: org.slug,
            group_id: group_id.clone(),
            integrations,
            projects,
        });
    }

    Ok(Group { id: group_id, name: credential.name.clone(), orgs })
}

/// Groups configured without an id take it from the first org their token can see.
fn discover_group_id(platform: &dyn ScanPlatform, credential: &GroupConfig) -> Result<String> {
    let orgs = platform
        .list_user_organizations(&credential.token)
        .map_err(|e| SyncError::remote(format!("group {}", credential.name), e))?;
    orgs.into_iter().find_map(|o| o.group_id).ok_or_else(|| {
        SyncError::ConfigInvalid(format!(
            "group {} has no id and its token does not see any group",
            credential.name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tag;
    use crate::testing::{group_config, project_desc, FakeScanPlatform};
    use tempfile::TempDir;

    fn platform() -> FakeScanPlatform {
        let mut fake = FakeScanPlatform::default();
        fake.add_org("g-1", "o-1", "platform");
        fake.add_org("g-1", "o-2", "unselected");
        fake.add_org("g-2", "o-3", "security");
        fake.add_project(
            "o-1",
            project_desc("p-1", "https://ghe.acme.io/acme/api.git", "github-enterprise")
                .with_tags(&[("env", "prod")]),
        );
        fake.add_project("o-1", project_desc("p-2", "https://ghe.acme.io/acme/cli", "cli"));
        fake.add_project("o-2", project_desc("p-3", "https://ghe.acme.io/acme/api", "github-enterprise"));
        fake.add_project("o-3", project_desc("p-4", "git@ghe.acme.io:acme/web.git", "github-enterprise"));
        fake
    }

    fn groups() -> Vec<GroupConfig> {
        vec![group_config("main", Some("g-1")), group_config("sec", Some("g-2"))]
    }

    fn selected() -> Vec<String> {
        vec!["o-1".to_string(), "o-3".to_string()]
    }

    #[test]
    fn refresh_filters_by_origin_and_selected_orgs() {
        let tmp = TempDir::new().expect("tmp");
        let mut orgs = Orgs::new(tmp.path(), &groups());
        orgs.refresh(&platform(), "github-enterprise", &selected()).expect("refresh");

        let summary = orgs.summary();
        assert_eq!(summary, CacheSummary { groups: 2, orgs: 2, projects: 2 });
        assert_eq!(orgs.get_orgs_by_group("main").len(), 1);
        assert_eq!(orgs.get_orgs_by_group("main")[0].id, "o-1");
        assert!(orgs.get_orgs_by_group("missing").is_empty());
        assert_eq!(orgs.get_token_for_group("sec"), Some("token-sec"));
    }

    #[test]
    fn failed_group_keeps_previous_snapshot() {
        let tmp = TempDir::new().expect("tmp");
        let mut orgs = Orgs::new(tmp.path(), &groups());
        orgs.refresh(&platform(), "github-enterprise", &selected()).expect("refresh");
        let before = orgs.snapshot().cloned();

        let mut broken = platform();
        broken.fail_projects_for("o-3");
        let err = orgs.refresh(&broken, "github-enterprise", &selected()).expect_err("must fail");

        assert!(matches!(err, SyncError::RemoteUnavailable { ref unit, .. } if unit == "group sec"));
        assert_eq!(orgs.snapshot().cloned(), before);
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = TempDir::new().expect("tmp");
        let mut orgs = Orgs::new(tmp.path(), &groups());
        orgs.refresh(&platform(), "github-enterprise", &selected()).expect("refresh");
        orgs.save().expect("save");

        let mut loaded = Orgs::new(tmp.path(), &groups());
        loaded.load().expect("load");

        assert_eq!(loaded.summary(), orgs.summary());
        let tags = &loaded.project("o-1", "p-1").expect("project").tags;
        assert_eq!(tags, &vec![Tag::new("env", "prod")]);
    }

    #[test]
    fn load_without_cache_is_cache_missing() {
        let tmp = TempDir::new().expect("tmp");
        let mut orgs = Orgs::new(tmp.path(), &groups());
        let err = orgs.load().expect_err("must fail");
        assert!(err.needs_sync());
    }

    #[test]
    fn find_projects_by_repo_normalizes_sources() {
        let tmp = TempDir::new().expect("tmp");
        let mut orgs = Orgs::new(tmp.path(), &groups());
        orgs.refresh(&platform(), "github-enterprise", &selected()).expect("refresh");

        let api: Vec<_> = orgs.find_projects_by_repo("acme/api", 1).iter().map(|p| p.id.clone()).collect();
        assert_eq!(api, vec!["p-1".to_string()]);
        assert_eq!(orgs.find_projects_by_repo("acme/web", 2).len(), 1);
        assert!(orgs.find_projects_by_repo("acme/cli", 3).is_empty());
    }

    #[test]
    fn group_without_id_is_discovered() {
        let tmp = TempDir::new().expect("tmp");
        let mut orgs = Orgs::new(tmp.path(), &[group_config("main", None)]);
        orgs.refresh(&platform(), "github-enterprise", &selected()).expect("refresh");
        assert_eq!(orgs.groups()[0].id, "g-1");
    }
}
