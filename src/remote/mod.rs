//! Remote collaborators: the source-hosting platform and the scanning platform.
//!
//! The reconciliation engine only sees the [`SourceHost`] and [`ScanPlatform`] traits and the
//! typed descriptors below. Untyped API payloads never cross this boundary.

use crate::domain::Tag;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub mod github;
pub mod snyk;

pub use github::GitHubClient;
pub use snyk::SnykClient;

/// Per-request timeout when no tighter deadline applies.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Repository as listed by the source-hosting platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    pub id: u64,
    pub full_name: String,
    pub html_url: String,
    pub fork: bool,
    /// `owner/name` of the fork parent, when known.
    pub parent: Option<String>,
    pub default_branch: String,
}

/// One code search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub name: String,
    pub path: String,
    pub repository_id: u64,
    pub repository_full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgDescriptor {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub id: String,
    pub name: String,
    pub origin: String,
    pub remote_url: Option<String>,
    pub branch: Option<String>,
    pub tags: Vec<Tag>,
}

/// Result of posting a tag. `AlreadyExists` is a success: someone else added it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    Created,
    AlreadyExists,
}

pub trait SourceHost {
    fn list_organization_repositories(&self, org: &str)
        -> Result<Vec<RepoDescriptor>, RemoteError>;

    /// `Ok(None)` when the file does not exist.
    fn get_repository_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<Vec<u8>>, RemoteError>;

    fn search_code(&self, query: &str) -> Result<Vec<FileMatch>, RemoteError>;
}

/// Every call carries the credential of the group it runs under.
pub trait ScanPlatform {
    fn list_organizations(
        &self,
        token: &str,
        group_id: &str,
    ) -> Result<Vec<OrgDescriptor>, RemoteError>;

    /// Organizations visible to the token, across groups.
    fn list_user_organizations(&self, token: &str) -> Result<Vec<OrgDescriptor>, RemoteError>;

    /// Integration name to integration id.
    fn list_integrations(
        &self,
        token: &str,
        org_id: &str,
    ) -> Result<BTreeMap<String, String>, RemoteError>;

    fn list_projects(&self, token: &str, org_id: &str)
        -> Result<Vec<ProjectDescriptor>, RemoteError>;

    fn get_project(
        &self,
        token: &str,
        org_id: &str,
        project_id: &str,
    ) -> Result<ProjectDescriptor, RemoteError>;

    fn post_tag(
        &self,
        token: &str,
        org_id: &str,
        project_id: &str,
        tag: &Tag,
    ) -> Result<TagOutcome, RemoteError>;
}

/// Wall-clock bound for a whole run; each request gets whatever is left of it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self { at: Some(Instant::now() + budget) }
    }

    pub fn from_secs(secs: Option<u64>) -> Self {
        secs.map(|s| Self::after(Duration::from_secs(s))).unwrap_or_default()
    }

    /// Timeout for the next request, capped at `default`.
    pub fn request_timeout(&self, default: Duration) -> Result<Duration, RemoteError> {
        let Some(at) = self.at else {
            return Ok(default);
        };
        let remaining = at.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(RemoteError::DeadlineExceeded);
        }
        Ok(remaining.min(default))
    }
}

/// Converts a non-success response into [`RemoteError::Status`].
pub(crate) fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(RemoteError::Status { status: status.as_u16(), body })
}
