//! Import targets in the shape `snyk-api-import` consumes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSource {
    pub host: String,
    pub owner: String,
    pub name: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTarget {
    pub target: TargetSource,
    pub integration_id: String,
    pub org_id: String,
}

/// Targets one group's credential is allowed to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTargets {
    pub name: String,
    pub targets: Vec<ImportTarget>,
}
