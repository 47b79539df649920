//! snyk-sync: keep Snyk organizations and projects in step with GitHub repositories
//!
//! Builds a watch list of repositories from the source-hosting platform, snapshots the scanning
//! platform's groups, orgs and projects, links the two, and reports what is missing: import
//! targets for repositories without projects and tags declared in `.snyk.d/import.yaml` but
//! absent from their projects.

pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod gaps;
pub mod matcher;
pub mod reconcile;
pub mod remote;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{Result, SyncError};
