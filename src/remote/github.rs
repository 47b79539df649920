//! GitHub / GitHub Enterprise REST client.

use super::{
    check_status, Deadline, FileMatch, RemoteError, RepoDescriptor, SourceHost,
    DEFAULT_REQUEST_TIMEOUT,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;

pub const GITHUB_API_URL: &str = "https://api.github.com";

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const PER_PAGE: usize = 100;
/// GitHub stops paging search results after this many hits.
const SEARCH_RESULT_CAP: usize = 1000;

pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: String,
    deadline: Deadline,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    id: u64,
    full_name: String,
    html_url: String,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    parent: Option<ApiRepoRef>,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRepoRef {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct ApiSearchPage {
    total_count: usize,
    items: Vec<ApiCodeItem>,
}

#[derive(Debug, Deserialize)]
struct ApiCodeItem {
    name: String,
    path: String,
    repository: ApiSearchRepo,
}

#[derive(Debug, Deserialize)]
struct ApiSearchRepo {
    id: u64,
    full_name: String,
}

impl From<ApiRepo> for RepoDescriptor {
    fn from(repo: ApiRepo) -> Self {
        Self {
            id: repo.id,
            full_name: repo.full_name,
            html_url: repo.html_url,
            fork: repo.fork,
            parent: repo.parent.map(|p| p.full_name),
            default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
        }
    }
}

impl GitHubClient {
    pub fn new(api_url: &str, token: &str, deadline: Deadline) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("snyk-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            deadline,
        })
    }

    fn get(&self, path: &str, accept: &str) -> Result<RequestBuilder, RemoteError> {
        let timeout = self.deadline.request_timeout(DEFAULT_REQUEST_TIMEOUT)?;
        Ok(self
            .client
            .get(format!("{}/{}", self.api_url, path.trim_start_matches('/')))
            .bearer_auth(&self.token)
            .header(ACCEPT, accept)
            .timeout(timeout))
    }

    /// `owner/name` of a fork's parent. The org listing leaves `parent` out, so forks need the
    /// single-repository endpoint.
    fn fork_parent(&self, full_name: &str) -> Result<Option<String>, RemoteError> {
        let response = self.get(&format!("repos/{full_name}"), JSON_MEDIA_TYPE)?.send()?;
        let repo: ApiRepo = serde_json::from_str(&check_status(response)?.text()?)?;
        Ok(repo.parent.map(|p| p.full_name))
    }
}

impl SourceHost for GitHubClient {
    fn list_organization_repositories(
        &self,
        org: &str,
    ) -> Result<Vec<RepoDescriptor>, RemoteError> {
        let mut repos = Vec::new();
        for page in 1.. {
            let response = self
                .get(&format!("orgs/{org}/repos"), JSON_MEDIA_TYPE)?
                .query(&[("type", "all"), ("sort", "updated"), ("direction", "desc")])
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()?;
            let batch: Vec<ApiRepo> = serde_json::from_str(&check_status(response)?.text()?)?;
            let done = batch.len() < PER_PAGE;
            repos.extend(batch.into_iter().map(RepoDescriptor::from));
            if done {
                break;
            }
        }
        for repo in repos.iter_mut().filter(|r| r.fork && r.parent.is_none()) {
            match self.fork_parent(&repo.full_name) {
                Ok(parent) => repo.parent = parent,
                Err(err) => {
                    tracing::warn!(repo = %repo.full_name, "Could not resolve fork parent: {err}")
                }
            }
        }
        tracing::debug!(org, count = repos.len(), "listed repositories");
        Ok(repos)
    }

    fn get_repository_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<Vec<u8>>, RemoteError> {
        let response = self
            .get(&format!("repos/{owner}/{repo}/contents/{path}"), RAW_MEDIA_TYPE)?
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check_status(response)?.bytes()?.to_vec()))
    }

    fn search_code(&self, query: &str) -> Result<Vec<FileMatch>, RemoteError> {
        let mut matches = Vec::new();
        for page in 1.. {
            let response = self
                .get("search/code", JSON_MEDIA_TYPE)?
                .query(&[("q", query)])
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()?;
            let batch: ApiSearchPage = serde_json::from_str(&check_status(response)?.text()?)?;
            let returned = batch.items.len();
            matches.extend(batch.items.into_iter().map(|item| FileMatch {
                name: item.name,
                path: item.path,
                repository_id: item.repository.id,
                repository_full_name: item.repository.full_name,
            }));
            if returned < PER_PAGE
                || matches.len() >= batch.total_count
                || matches.len() >= SEARCH_RESULT_CAP
            {
                break;
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_runtime;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_repo(id: u64, name: &str, fork: bool) -> Value {
        json!({
            "id": id,
            "full_name": format!("acme/{name}"),
            "html_url": format!("https://ghe.acme.io/acme/{name}"),
            "fork": fork,
            "default_branch": "main"
        })
    }

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&server.uri(), "gh-token", Deadline::none()).expect("client")
    }

    #[test]
    fn listing_follows_pages_and_resolves_fork_parents() {
        let rt = mock_runtime();
        let server = rt.block_on(MockServer::start());
        let first: Vec<Value> =
            (1..=PER_PAGE as u64).map(|i| api_repo(i, &format!("r{i}"), false)).collect();
        rt.block_on(async {
            Mock::given(method("GET"))
                .and(path("/orgs/acme/repos"))
                .and(query_param("page", "1"))
                .and(header("authorization", "Bearer gh-token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(first))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/orgs/acme/repos"))
                .and(query_param("page", "2"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!([api_repo(500, "api", true)])),
                )
                .expect(1)
                .mount(&server)
                .await;
            let mut detail = api_repo(500, "api", true);
            detail["parent"] = json!({ "full_name": "upstream/api" });
            Mock::given(method("GET"))
                .and(path("/repos/acme/api"))
                .respond_with(ResponseTemplate::new(200).set_body_json(detail))
                .expect(1)
                .mount(&server)
                .await;
        });

        let repos = client(&server).list_organization_repositories("acme").expect("repos");
        assert_eq!(repos.len(), PER_PAGE + 1);
        assert!(repos[..PER_PAGE].iter().all(|r| r.parent.is_none()));
        assert_eq!(repos[PER_PAGE].parent.as_deref(), Some("upstream/api"));
    }

    #[test]
    fn missing_file_is_none_and_present_file_is_raw_bytes() {
        let rt = mock_runtime();
        let server = rt.block_on(MockServer::start());
        rt.block_on(async {
            Mock::given(method("GET"))
                .and(path("/repos/acme/api/contents/.snyk.d/import.yaml"))
                .and(header("accept", RAW_MEDIA_TYPE))
                .respond_with(ResponseTemplate::new(200).set_body_string("orgName: platform\n"))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/repos/acme/web/contents/.snyk.d/import.yaml"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;
        });

        let client = client(&server);
        let found = client
            .get_repository_contents("acme", "api", ".snyk.d/import.yaml")
            .expect("contents");
        assert_eq!(found.as_deref(), Some(&b"orgName: platform\n"[..]));
        let missing = client
            .get_repository_contents("acme", "web", ".snyk.d/import.yaml")
            .expect("contents");
        assert!(missing.is_none());
    }

    #[test]
    fn server_error_maps_to_status() {
        let rt = mock_runtime();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/orgs/acme/repos"))
                .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
                .mount(&server),
        );

        let err = client(&server).list_organization_repositories("acme").unwrap_err();
        assert!(
            matches!(err, RemoteError::Status { status: 503, ref body } if body == "maintenance")
        );
    }

    #[test]
    fn search_stops_at_total_count() {
        let rt = mock_runtime();
        let server = rt.block_on(MockServer::start());
        let items: Vec<Value> = (1..=PER_PAGE as u64)
            .map(|i| {
                json!({
                    "name": "import.yaml",
                    "path": ".snyk.d/import.yaml",
                    "repository": { "id": i, "full_name": format!("acme/r{i}") }
                })
            })
            .collect();
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/search/code"))
                .and(query_param("q", "org:acme path:.snyk.d filename:import.yaml"))
                .and(query_param("page", "1"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({ "total_count": PER_PAGE, "items": items })),
                )
                .expect(1)
                .mount(&server),
        );

        let matches = client(&server)
            .search_code("org:acme path:.snyk.d filename:import.yaml")
            .expect("search");
        assert_eq!(matches.len(), PER_PAGE);
        assert_eq!(matches[0].repository_full_name, "acme/r1");
    }

    #[test]
    fn api_repo_maps_parent_and_default_branch() {
        let json = r#"{"id":7,"full_name":"acme/api","html_url":"https://github.com/acme/api","fork":true,"parent":{"full_name":"upstream/api"}}"#;
        let repo: ApiRepo = serde_json::from_str(json).expect("parse");
        let desc = RepoDescriptor::from(repo);
        assert_eq!(desc.parent.as_deref(), Some("upstream/api"));
        assert_eq!(desc.default_branch, "main");
        assert!(desc.fork);
    }

    #[test]
    fn client_trims_api_url() {
        let client =
            GitHubClient::new("https://ghe.acme.io/api/v3/", "t", Deadline::none()).expect("client");
        assert_eq!(client.api_url, "https://ghe.acme.io/api/v3");
    }
}
