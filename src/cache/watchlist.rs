//! Watch list: every tracked repository plus its links into the organization cache.

use super::orgs::Orgs;
use crate::domain::{Repo, RepoId, Tag};
use crate::error::{Result, SyncError};
use crate::gaps::ProjectTagUpdate;
use crate::remote::RepoDescriptor;
use crate::utils::{read_json, write_json_atomic};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

pub const SYNC_FILE: &str = "sync.json";
pub const DATA_FILE: &str = "data.json";

/// Contents of `sync.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStamp {
    pub last_sync: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct WatchList {
    repos: Vec<Repo>,
    index: HashMap<RepoId, usize>,
    last_sync: Option<DateTime<Utc>>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `desc.id`.
    ///
    /// A replaced record starts over: org, tags and project links are reset.
    pub fn add_repo(&mut self, desc: &RepoDescriptor) -> &mut Repo {
        let repo = Repo::from_descriptor(desc);
        let slot = match self.index.get(&desc.id) {
            Some(&slot) => {
                self.repos[slot] = repo;
                slot
            }
            None => {
                self.repos.push(repo);
                self.index.insert(desc.id, self.repos.len() - 1);
                self.repos.len() - 1
            }
        };
        &mut self.repos[slot]
    }

    pub fn get_repo(&self, id: RepoId) -> Result<&Repo> {
        self.index
            .get(&id)
            .map(|&slot| &self.repos[slot])
            .ok_or_else(|| SyncError::NotFound(format!("repository {id}")))
    }

    pub fn get_repo_mut(&mut self, id: RepoId) -> Result<&mut Repo> {
        match self.index.get(&id) {
            Some(&slot) => Ok(&mut self.repos[slot]),
            None => Err(SyncError::NotFound(format!("repository {id}"))),
        }
    }

    pub fn repos(&self) -> &[Repo] {
        &self.repos
    }

    pub fn repos_mut(&mut self) -> impl Iterator<Item = &mut Repo> {
        self.repos.iter_mut()
    }

    pub fn forks(&self) -> impl Iterator<Item = &Repo> {
        self.repos.iter().filter(|r| r.is_fork())
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Persists with the current time as the sync stamp.
    pub fn save(&mut self, cache_dir: &Path) -> Result<()> {
        self.save_at(cache_dir, Utc::now())
    }

    /// `data.json` goes first so a crash never leaves a fresh stamp over stale data.
    pub fn save_at(&mut self, cache_dir: &Path, now: DateTime<Utc>) -> Result<()> {
        std::fs::create_dir_all(cache_dir).map_err(|e| SyncError::io(cache_dir, e))?;
        write_json_atomic(&cache_dir.join(DATA_FILE), &self.repos)?;
        write_json_atomic(&cache_dir.join(SYNC_FILE), &SyncStamp { last_sync: now })?;
        self.last_sync = Some(now);
        tracing::debug!(repos = self.repos.len(), dir = %cache_dir.display(), "saved watch list");
        Ok(())
    }

    pub fn load(cache_dir: &Path) -> Result<Self> {
        let data = cache_dir.join(DATA_FILE);
        let stamp = cache_dir.join(SYNC_FILE);
        if !data.is_file() {
            return Err(SyncError::CacheMissing(data));
        }
        if !stamp.is_file() {
            return Err(SyncError::CacheMissing(stamp));
        }

        let repos: Vec<Repo> = read_json(&data)?;
        let SyncStamp { last_sync } = read_json(&stamp)?;
        let index = repos.iter().enumerate().map(|(slot, r)| (r.id, slot)).collect();
        tracing::debug!(repos = repos.len(), %last_sync, "loaded watch list");
        Ok(Self { repos, index, last_sync: Some(last_sync) })
    }

    /// Declared-minus-observed tags for every attached project in `org_ids`.
    ///
    /// Repositories without a parsed import declaration are skipped entirely. Projects
    /// linked from several repositories are reported once, with the union of their gaps.
    pub fn get_proj_tag_updates(&self, orgs: &Orgs, org_ids: &[String]) -> Vec<ProjectTagUpdate> {
        let wanted: HashSet<&str> = org_ids.iter().map(String::as_str).collect();
        let mut updates: Vec<ProjectTagUpdate> = Vec::new();
        let mut seen: HashMap<(String, String), usize> = HashMap::new();

        for repo in self.repos.iter().filter(|r| r.has_import && !r.tags.is_empty()) {
            for link in repo.projects.iter().filter(|l| wanted.contains(l.org_id.as_str())) {
                let Some(project) = orgs.project(&link.org_id, &link.project_id) else {
                    tracing::warn!(
                        repo = %repo.full_name,
                        project = %link.project_id,
                        "linked project is missing from the organization cache"
                    );
                    continue;
                };
                let missing: BTreeSet<Tag> =
                    repo.tags.iter().filter(|t| !project.has_tag(t)).cloned().collect();
                if missing.is_empty() {
                    continue;
                }

                let key = (link.org_id.clone(), link.project_id.clone());
                match seen.get(&key) {
                    Some(&slot) => {
                        let entry = &mut updates[slot];
                        for tag in missing {
                            if !entry.missing_tags.contains(&tag) {
                                entry.missing_tags.push(tag);
                            }
                        }
                    }
                    None => {
                        seen.insert(key, updates.len());
                        updates.push(ProjectTagUpdate {
                            organization_id: link.org_id.clone(),
                            project_id: link.project_id.clone(),
                            missing_tags: missing.into_iter().collect(),
                        });
                    }
                }
            }
        }
        updates
    }
}
