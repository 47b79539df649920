//! Snyk v1 REST client.

use super::{
    check_status, Deadline, OrgDescriptor, ProjectDescriptor, RemoteError, ScanPlatform,
    TagOutcome, DEFAULT_REQUEST_TIMEOUT,
};
use crate::domain::Tag;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

pub const SNYK_API_URL: &str = "https://api.snyk.io/api/v1";

pub struct SnykClient {
    client: Client,
    api_url: String,
    deadline: Deadline,
}

#[derive(Debug, Deserialize)]
struct ApiOrgList {
    orgs: Vec<ApiOrg>,
}

#[derive(Debug, Deserialize)]
struct ApiOrg {
    id: String,
    name: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    group: Option<ApiGroupRef>,
}

#[derive(Debug, Deserialize)]
struct ApiGroupRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiProjectList {
    projects: Vec<ApiProject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProject {
    id: String,
    name: String,
    #[serde(default)]
    origin: String,
    #[serde(default)]
    remote_repo_url: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    tags: Vec<Tag>,
}

impl ApiOrg {
    fn into_descriptor(self, group_id: Option<&str>) -> OrgDescriptor {
        let slug = self.slug.unwrap_or_else(|| self.name.clone());
        OrgDescriptor {
            id: self.id,
            name: self.name,
            slug,
            group_id: self.group.map(|g| g.id).or_else(|| group_id.map(str::to_string)),
        }
    }
}

impl From<ApiProject> for ProjectDescriptor {
    fn from(project: ApiProject) -> Self {
        Self {
            id: project.id,
            name: project.name,
            origin: project.origin,
            remote_url: project.remote_repo_url.filter(|url| !url.is_empty()),
            branch: project.branch,
            tags: project.tags,
        }
    }
}

impl SnykClient {
    pub fn new(api_url: &str, deadline: Deadline) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("snyk-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, api_url: api_url.trim_end_matches('/').to_string(), deadline })
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> Result<RequestBuilder, RemoteError> {
        let timeout = self.deadline.request_timeout(DEFAULT_REQUEST_TIMEOUT)?;
        Ok(self
            .client
            .request(method, format!("{}/{}", self.api_url, path.trim_start_matches('/')))
            .header(AUTHORIZATION, format!("token {token}"))
            .timeout(timeout))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, RemoteError> {
        let response = self.request(Method::GET, path, token)?.send()?;
        Ok(serde_json::from_str(&check_status(response)?.text()?)?)
    }
}

impl ScanPlatform for SnykClient {
    fn list_organizations(
        &self,
        token: &str,
        group_id: &str,
    ) -> Result<Vec<OrgDescriptor>, RemoteError> {
        let list: ApiOrgList = self.get_json(&format!("group/{group_id}/orgs"), token)?;
        Ok(list.orgs.into_iter().map(|o| o.into_descriptor(Some(group_id))).collect())
    }

    fn list_user_organizations(&self, token: &str) -> Result<Vec<OrgDescriptor>, RemoteError> {
        let list: ApiOrgList = self.get_json("orgs", token)?;
        Ok(list.orgs.into_iter().map(|o| o.into_descriptor(None)).collect())
    }

    fn list_integrations(
        &self,
        token: &str,
        org_id: &str,
    ) -> Result<BTreeMap<String, String>, RemoteError> {
        self.get_json(&format!("org/{org_id}/integrations"), token)
    }

    fn list_projects(
        &self,
        token: &str,
        org_id: &str,
    ) -> Result<Vec<ProjectDescriptor>, RemoteError> {
        let response = self
            .request(Method::POST, &format!("org/{org_id}/projects"), token)?
            .json(&json!({}))
            .send()?;
        let list: ApiProjectList = serde_json::from_str(&check_status(response)?.text()?)?;
        Ok(list.projects.into_iter().map(ProjectDescriptor::from).collect())
    }

    fn get_project(
        &self,
        token: &str,
        org_id: &str,
        project_id: &str,
    ) -> Result<ProjectDescriptor, RemoteError> {
        let project: ApiProject =
            self.get_json(&format!("org/{org_id}/project/{project_id}"), token)?;
        Ok(project.into())
    }

    fn post_tag(
        &self,
        token: &str,
        org_id: &str,
        project_id: &str,
        tag: &Tag,
    ) -> Result<TagOutcome, RemoteError> {
        let response = self
            .request(Method::POST, &format!("org/{org_id}/project/{project_id}/tags"), token)?
            .json(tag)
            .send()?;
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Ok(TagOutcome::AlreadyExists);
        }
        check_status(response)?;
        Ok(TagOutcome::Created)
    }
}
