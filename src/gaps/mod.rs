//! Gap analyzers over the reconciled model.
//!
//! Both passes are read-only; only [`apply_tag_updates`] talks to the scanning platform.

pub mod tags;
pub mod targets;

pub use tags::{apply_tag_updates, find_tag_updates, GroupTagUpdates, ProjectTagUpdate, TagFixReport};
pub use targets::{find_targets, TargetResolver};
