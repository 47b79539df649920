//! In-memory collaborators for unit tests.

use crate::config::GroupConfig;
use crate::domain::{Tag, IMPORT_DECLARATION_PATH};
use crate::remote::{
    FileMatch, OrgDescriptor, ProjectDescriptor, RemoteError, RepoDescriptor, ScanPlatform,
    SourceHost, TagOutcome,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

pub fn group_config(name: &str, id: Option<&str>) -> GroupConfig {
    GroupConfig {
        name: name.to_string(),
        id: id.map(str::to_string),
        token_env_name: format!("{}_TOKEN", name.to_ascii_uppercase()),
        token: format!("token-{name}"),
    }
}

pub fn project_desc(id: &str, remote_url: &str, origin: &str) -> ProjectDescriptor {
    ProjectDescriptor {
        id: id.to_string(),
        name: format!("{id}:package.json"),
        origin: origin.to_string(),
        remote_url: Some(remote_url.to_string()),
        branch: Some("main".to_string()),
        tags: Vec::new(),
    }
}

pub fn repo_desc(id: u64, full_name: &str, fork: bool) -> RepoDescriptor {
    RepoDescriptor {
        id,
        full_name: full_name.to_string(),
        html_url: format!("https://ghe.acme.io/{full_name}"),
        fork,
        parent: None,
        default_branch: "main".to_string(),
    }
}

impl ProjectDescriptor {
    pub fn with_tags(mut self, tags: &[(&str, &str)]) -> Self {
        self.tags = tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect();
        self
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }
}

/// Runtime for driving `wiremock` setup. Mock servers serve from their own thread, so the
/// blocking clients are called outside `block_on`.
pub fn mock_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime")
}

fn unavailable() -> RemoteError {
    RemoteError::Status { status: 503, body: "unavailable".to_string() }
}

#[derive(Debug, Default)]
pub struct FakeScanPlatform {
    orgs: Vec<OrgDescriptor>,
    projects: RefCell<BTreeMap<String, Vec<ProjectDescriptor>>>,
    failing_orgs: HashSet<String>,
    bare_orgs: HashSet<String>,
    failing_tags: HashSet<Tag>,
    /// Tags another actor adds between our read and our post.
    racing_tags: HashSet<Tag>,
    pub posted: RefCell<Vec<(String, String, Tag)>>,
}

impl FakeScanPlatform {
    pub fn add_org(&mut self, group_id: &str, org_id: &str, slug: &str) {
        self.orgs.push(OrgDescriptor {
            id: org_id.to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
            group_id: Some(group_id.to_string()),
        });
    }

    pub fn add_project(&mut self, org_id: &str, project: ProjectDescriptor) {
        self.projects.get_mut().entry(org_id.to_string()).or_default().push(project);
    }

    pub fn fail_projects_for(&mut self, org_id: &str) {
        self.failing_orgs.insert(org_id.to_string());
    }

    pub fn drop_integrations(&mut self, org_id: &str) {
        self.bare_orgs.insert(org_id.to_string());
    }

    pub fn fail_tag(&mut self, tag: Tag) {
        self.failing_tags.insert(tag);
    }

    pub fn race_tag(&mut self, tag: Tag) {
        self.racing_tags.insert(tag);
    }

    pub fn live_tags(&self, org_id: &str, project_id: &str) -> Vec<Tag> {
        self.projects
            .borrow()
            .get(org_id)
            .and_then(|ps| ps.iter().find(|p| p.id == project_id))
            .map(|p| p.tags.clone())
            .unwrap_or_default()
    }
}

impl ScanPlatform for FakeScanPlatform {
    fn list_organizations(
        &self,
        _token: &str,
        group_id: &str,
    ) -> Result<Vec<OrgDescriptor>, RemoteError> {
        Ok(self.orgs.iter().filter(|o| o.group_id.as_deref() == Some(group_id)).cloned().collect())
    }

    fn list_user_organizations(&self, _token: &str) -> Result<Vec<OrgDescriptor>, RemoteError> {
        Ok(self.orgs.clone())
    }

    fn list_integrations(
        &self,
        _token: &str,
        org_id: &str,
    ) -> Result<BTreeMap<String, String>, RemoteError> {
        let mut integrations = BTreeMap::new();
        if self.bare_orgs.contains(org_id) {
            return Ok(integrations);
        }
        integrations.insert("github-enterprise".to_string(), format!("int-{org_id}"));
        Ok(integrations)
    }

    fn list_projects(
        &self,
        _token: &str,
        org_id: &str,
    ) -> Result<Vec<ProjectDescriptor>, RemoteError> {
        if self.failing_orgs.contains(org_id) {
            return Err(unavailable());
        }
        Ok(self.projects.borrow().get(org_id).cloned().unwrap_or_default())
    }

    fn get_project(
        &self,
        _token: &str,
        org_id: &str,
        project_id: &str,
    ) -> Result<ProjectDescriptor, RemoteError> {
        self.projects
            .borrow()
            .get(org_id)
            .and_then(|ps| ps.iter().find(|p| p.id == project_id))
            .cloned()
            .ok_or(RemoteError::Status { status: 404, body: "not found".to_string() })
    }

    fn post_tag(
        &self,
        _token: &str,
        org_id: &str,
        project_id: &str,
        tag: &Tag,
    ) -> Result<TagOutcome, RemoteError> {
        if self.failing_tags.contains(tag) {
            return Err(unavailable());
        }
        let mut projects = self.projects.borrow_mut();
        let project = projects
            .get_mut(org_id)
            .and_then(|ps| ps.iter_mut().find(|p| p.id == project_id))
            .ok_or(RemoteError::Status { status: 404, body: "not found".to_string() })?;
        if self.racing_tags.contains(tag) || project.tags.contains(tag) {
            return Ok(TagOutcome::AlreadyExists);
        }
        project.tags.push(tag.clone());
        self.posted.borrow_mut().push((org_id.to_string(), project_id.to_string(), tag.clone()));
        Ok(TagOutcome::Created)
    }
}

#[derive(Debug, Default)]
pub struct FakeSourceHost {
    repos: BTreeMap<String, Vec<RepoDescriptor>>,
    files: HashMap<(String, String), Vec<u8>>,
    failing_orgs: HashSet<String>,
    failing_contents: HashSet<String>,
}

impl FakeSourceHost {
    pub fn add_repo(&mut self, org: &str, repo: RepoDescriptor) {
        self.repos.entry(org.to_string()).or_default().push(repo);
    }

    pub fn add_import(&mut self, full_name: &str, yaml: &str) {
        self.files.insert(
            (full_name.to_string(), IMPORT_DECLARATION_PATH.to_string()),
            yaml.as_bytes().to_vec(),
        );
    }

    pub fn fail_org(&mut self, org: &str) {
        self.failing_orgs.insert(org.to_string());
    }

    pub fn fail_contents(&mut self, full_name: &str) {
        self.failing_contents.insert(full_name.to_string());
    }

    fn find_repo(&self, full_name: &str) -> Option<&RepoDescriptor> {
        self.repos.values().flatten().find(|r| r.full_name == full_name)
    }
}

impl SourceHost for FakeSourceHost {
    fn list_organization_repositories(
        &self,
        org: &str,
    ) -> Result<Vec<RepoDescriptor>, RemoteError> {
        if self.failing_orgs.contains(org) {
            return Err(unavailable());
        }
        Ok(self.repos.get(org).cloned().unwrap_or_default())
    }

    fn get_repository_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<Vec<u8>>, RemoteError> {
        let full_name = format!("{owner}/{repo}");
        if self.failing_contents.contains(&full_name) {
            return Err(unavailable());
        }
        Ok(self.files.get(&(full_name, path.to_string())).cloned())
    }

    /// Mimics GitHub: only `org:<name>` is honoured and forks are not indexed.
    fn search_code(&self, query: &str) -> Result<Vec<FileMatch>, RemoteError> {
        let org = query
            .split_whitespace()
            .find_map(|term| term.strip_prefix("org:"))
            .unwrap_or_default();
        let mut matches = Vec::new();
        for (full_name, path) in self.files.keys() {
            let Some(repo) = self.find_repo(full_name) else {
                continue;
            };
            if repo.fork || !full_name.starts_with(&format!("{org}/")) {
                continue;
            }
            let name = path.rsplit('/').next().unwrap_or(path).to_string();
            matches.push(FileMatch {
                name,
                path: path.clone(),
                repository_id: repo.id,
                repository_full_name: full_name.clone(),
            });
        }
        matches.sort_by_key(|m| m.repository_id);
        Ok(matches)
    }
}
