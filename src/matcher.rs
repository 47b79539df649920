//! Repository-to-project association.
//!
//! A project originates from a repository when its declared remote source, normalized,
//! names the same `owner/name`. The scanning platform does not keep the source platform's
//! numeric ids, so matching is by name only.

use crate::cache::{Orgs, WatchList};
use crate::domain::Project;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `git@host:owner/name` (scp-like syntax, no scheme).
static SCP_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[^@/]+@)?([^:/]+):(.+)$").expect("valid scp regex"));

/// `host:port/owner/name` without a scheme; looks scp-like but is not.
static HOST_PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[^@/]+@)?[^:/]+:\d+/").expect("valid host-port regex"));

/// `owner/name(branch):manifest` or `owner/name:manifest`.
static PROJECT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^/\s:()]+/[^/\s:()]+)(?:\([^)]*\))?(?::.*)?$").expect("valid project regex")
});

/// Remote source split into a case-folded host and an `owner/name` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSource {
    pub host: String,
    pub path: String,
}

/// Strips protocol, credentials, trailing `/` and `.git`; lower-cases the host.
///
/// Examples:
/// - `https://GHE.acme.io/acme/api.git` → `ghe.acme.io` + `acme/api`
/// - `git@ghe.acme.io:acme/api.git`     → `ghe.acme.io` + `acme/api`
/// - `ssh://git@ghe.acme.io:22/acme/api` → `ghe.acme.io:22` + `acme/api`
/// - `ghe.acme.io:8443/acme/api`         → `ghe.acme.io:8443` + `acme/api`
pub fn normalize_remote(url: &str) -> Option<NormalizedSource> {
    let trimmed = url.trim().trim_end_matches('/');
    let (host, path) = if let Some((_, rest)) = trimmed.split_once("://") {
        let (authority, path) = rest.split_once('/')?;
        let host = authority.rsplit('@').next().unwrap_or(authority);
        (host.to_string(), path.to_string())
    } else if let Some(caps) =
        SCP_LIKE_RE.captures(trimmed).filter(|_| !HOST_PORT_RE.is_match(trimmed))
    {
        (caps[1].to_string(), caps[2].to_string())
    } else {
        let (authority, path) = trimmed.split_once('/')?;
        let host = authority.rsplit('@').next().unwrap_or(authority);
        (host.to_string(), path.to_string())
    };

    let path = normalize_full_name(&path);
    if host.is_empty() || path.is_empty() {
        return None;
    }
    Some(NormalizedSource { host: host.to_ascii_lowercase(), path })
}

/// Canonical form of an `owner/name` string.
pub fn normalize_full_name(full_name: &str) -> String {
    let trimmed = full_name.trim().trim_matches('/');
    trimmed.strip_suffix(".git").unwrap_or(trimmed).trim_end_matches('/').to_string()
}

/// The `owner/name` a project was imported from.
///
/// Falls back to the project name when the platform recorded no remote URL.
pub fn project_repo_name(project: &Project) -> Option<String> {
    if let Some(source) = project.remote_url.as_deref().and_then(normalize_remote) {
        return Some(source.path);
    }
    PROJECT_NAME_RE.captures(project.name.trim()).map(|caps| caps[1].to_string())
}

/// `owner/name` → projects, built once per refresh cycle.
pub struct ProjectIndex<'a> {
    by_name: HashMap<String, Vec<&'a Project>>,
}

impl<'a> ProjectIndex<'a> {
    pub fn build(orgs: &'a Orgs) -> Self {
        let mut by_name: HashMap<String, Vec<&'a Project>> = HashMap::new();
        for project in orgs.projects() {
            if let Some(name) = project_repo_name(project) {
                by_name.entry(name).or_default().push(project);
            }
        }
        Self { by_name }
    }

    pub fn lookup(&self, full_name: &str) -> &[&'a Project] {
        self.by_name.get(&normalize_full_name(full_name)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Links every repository in the watch list to its matching projects.
///
/// All matches are attached, so a repository imported into several orgs or branches ends
/// up with several links. Returns the number of links created.
pub fn attach_projects(watchlist: &mut WatchList, orgs: &Orgs) -> usize {
    let index = ProjectIndex::build(orgs);
    let mut attached = 0;
    for repo in watchlist.repos_mut() {
        for project in index.lookup(&repo.full_name) {
            let before = repo.projects.len();
            repo.add_project(project);
            attached += repo.projects.len() - before;
        }
    }
    tracing::debug!(names = index.len(), attached, "matched projects to repositories");
    attached
}
