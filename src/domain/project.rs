//! Scan projects and their tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A key/value label on a scan project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

/// A scanned artifact, owned by exactly one organization in a cache snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub org_id: String,
    /// Import channel the project came through, e.g. `github-enterprise`.
    pub origin: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Project {
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Records a tag as present; returns `false` when it already was.
    pub fn insert_tag(&mut self, tag: Tag) -> bool {
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_tag_does_not_duplicate() {
        let mut project = Project {
            id: "p1".into(),
            name: "acme/api:package.json".into(),
            org_id: "o1".into(),
            origin: "github-enterprise".into(),
            remote_url: None,
            branch: Some("main".into()),
            tags: vec![Tag::new("env", "prod")],
        };
        assert!(!project.insert_tag(Tag::new("env", "prod")));
        assert!(project.insert_tag(Tag::new("team", "core")));
        assert_eq!(project.tags.len(), 2);
    }

    #[test]
    fn tag_display_joins_key_and_value() {
        assert_eq!(Tag::new("team", "core").to_string(), "team:core");
    }
}
