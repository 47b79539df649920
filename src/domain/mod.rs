//! Entity model: repositories, projects, tags, organizations, groups and targets.
//!
//! Pure data. Project data is owned by the organization cache; repositories only hold
//! [`ProjectLink`]s pointing into it.

pub mod import;
pub mod org;
pub mod project;
pub mod repo;
pub mod target;

pub use import::{ImportDeclaration, ImportFields, IMPORT_DECLARATION_PATH};
pub use org::{Group, Org, OrgEntry, OrgTable};
pub use project::{Project, Tag};
pub use repo::{ProjectLink, Repo, RepoId, RepoRef, RepoSource, DEFAULT_ORG};
pub use target::{GroupTargets, ImportTarget, TargetSource};
