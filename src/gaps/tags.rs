//! Tag gap: declared tags missing from attached projects, and the pass that fixes them.

use crate::cache::{Orgs, WatchList};
use crate::domain::Tag;
use crate::error::{Result, SyncError};
use crate::remote::{ScanPlatform, TagOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTagUpdate {
    pub organization_id: String,
    pub project_id: String,
    pub missing_tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTagUpdates {
    pub name: String,
    pub tags: Vec<ProjectTagUpdate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagFixReport {
    pub created: usize,
    pub already_present: usize,
    pub failed: usize,
}

impl TagFixReport {
    fn absorb(&mut self, other: TagFixReport) {
        self.created += other.created;
        self.already_present += other.already_present;
        self.failed += other.failed;
    }
}

/// Tag gaps per cached group, restricted to that group's orgs.
pub fn find_tag_updates(watchlist: &WatchList, orgs: &Orgs) -> Vec<GroupTagUpdates> {
    orgs.groups()
        .iter()
        .map(|group| {
            let org_ids: Vec<String> =
                orgs.get_orgs_by_group(&group.name).iter().map(|o| o.id.clone()).collect();
            GroupTagUpdates {
                name: group.name.clone(),
                tags: watchlist.get_proj_tag_updates(orgs, &org_ids),
            }
        })
        .collect()
}

/// Posts the missing tags of one group with that group's credential.
///
/// Each project is re-read first and only tags still absent are posted. Tags that were
/// created or turned out to exist already are recorded in `orgs`; the caller saves it.
/// A failing project is logged and the pass moves on.
pub fn apply_tag_updates(
    platform: &dyn ScanPlatform,
    orgs: &mut Orgs,
    group: &GroupTagUpdates,
) -> Result<TagFixReport> {
    let token = orgs
        .get_token_for_group(&group.name)
        .map(str::to_string)
        .ok_or_else(|| SyncError::ConfigInvalid(format!("no credential for group {}", group.name)))?;

    let mut report = TagFixReport::default();
    for update in &group.tags {
        report.absorb(apply_one(platform, &token, orgs, &group.name, update));
    }
    tracing::info!(
        group = %group.name,
        created = report.created,
        already_present = report.already_present,
        failed = report.failed,
        "Tag update pass finished"
    );
    Ok(report)
}

fn apply_one(
    platform: &dyn ScanPlatform,
    token: &str,
    orgs: &mut Orgs,
    group: &str,
    update: &ProjectTagUpdate,
) -> TagFixReport {
    let mut report = TagFixReport::default();
    let live = match platform.get_project(token, &update.organization_id, &update.project_id) {
        Ok(live) => live,
        Err(err) => {
            tracing::warn!(
                group,
                org = %update.organization_id,
                project = %update.project_id,
                "Could not read project, skipping tag update: {err}"
            );
            report.failed += update.missing_tags.len();
            return report;
        }
    };

    let to_post: Vec<&Tag> = update.missing_tags.iter().filter(|t| !live.tags.contains(t)).collect();
    if to_post.is_empty() {
        tracing::debug!(project = %live.name, "tags already present on live project");
    } else {
        tracing::info!("Updating {group} project {} tags", live.name);
    }

    let mut applied: Vec<Tag> =
        update.missing_tags.iter().filter(|t| live.tags.contains(t)).cloned().collect();
    for tag in to_post {
        match platform.post_tag(token, &update.organization_id, &update.project_id, tag) {
            Ok(TagOutcome::Created) => {
                report.created += 1;
                applied.push(tag.clone());
            }
            Ok(TagOutcome::AlreadyExists) => {
                tracing::info!(project = %live.name, %tag, "Tag for project already exists");
                report.already_present += 1;
                applied.push(tag.clone());
            }
            Err(err) => {
                tracing::warn!(project = %live.name, %tag, "Failed to add tag: {err}");
                report.failed += 1;
            }
        }
    }

    match orgs.project_mut(&update.organization_id, &update.project_id) {
        Some(project) => {
            for tag in applied {
                project.insert_tag(tag);
            }
        }
        None => tracing::warn!(
            project = %update.project_id,
            "Updated project is missing from the organization cache"
        ),
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImportFields;
    use crate::testing::{group_config, project_desc, repo_desc, FakeScanPlatform};
    use tempfile::TempDir;

    fn setup(observed: &[(&str, &str)]) -> (FakeScanPlatform, Orgs, WatchList, TempDir) {
        let tmp = TempDir::new().expect("tmp");
        let mut fake = FakeScanPlatform::default();
        fake.add_org("g-1", "o-1", "platform");
        fake.add_project(
            "o-1",
            project_desc("p-1", "https://ghe.acme.io/acme/api", "github-enterprise")
                .with_tags(observed),
        );
        let mut orgs = Orgs::new(tmp.path(), &[group_config("main", Some("g-1"))]);
        orgs.refresh(&fake, "github-enterprise", &["o-1".to_string()]).expect("refresh");

        let mut watchlist = WatchList::new();
        let repo = watchlist.add_repo(&repo_desc(1, "acme/api", false));
        repo.apply_import(&ImportFields {
            tags: Some(vec![Tag::new("env", "prod"), Tag::new("team", "core")]),
            ..ImportFields::default()
        });
        for project in orgs.projects() {
            repo.add_project(project);
        }
        (fake, orgs, watchlist, tmp)
    }

    #[test]
    fn reports_missing_tags_per_group() {
        let (_fake, orgs, watchlist, _tmp) = setup(&[("env", "prod")]);
        let updates = find_tag_updates(&watchlist, &orgs);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "main");
        assert_eq!(updates[0].tags[0].missing_tags, vec![Tag::new("team", "core")]);
    }

    #[test]
    fn applying_posts_only_missing_tags_and_records_them() {
        let (fake, mut orgs, watchlist, _tmp) = setup(&[("env", "prod")]);
        let updates = find_tag_updates(&watchlist, &orgs);

        let report = apply_tag_updates(&fake, &mut orgs, &updates[0]).expect("apply");
        assert_eq!(report, TagFixReport { created: 1, already_present: 0, failed: 0 });
        assert_eq!(fake.posted.borrow().len(), 1);
        assert!(fake.live_tags("o-1", "p-1").contains(&Tag::new("team", "core")));
        assert!(find_tag_updates(&watchlist, &orgs)[0].tags.is_empty());
    }

    #[test]
    fn conflicting_tag_is_success_and_does_not_reappear() {
        let (mut fake, mut orgs, watchlist, _tmp) = setup(&[]);
        fake.race_tag(Tag::new("team", "core"));
        let updates = find_tag_updates(&watchlist, &orgs);

        let report = apply_tag_updates(&fake, &mut orgs, &updates[0]).expect("apply");
        assert_eq!(report, TagFixReport { created: 1, already_present: 1, failed: 0 });
        assert!(find_tag_updates(&watchlist, &orgs)[0].tags.is_empty());
    }

    #[test]
    fn failing_tag_is_counted_and_reported_again() {
        let (mut fake, mut orgs, watchlist, _tmp) = setup(&[]);
        fake.fail_tag(Tag::new("env", "prod"));
        let updates = find_tag_updates(&watchlist, &orgs);

        let report = apply_tag_updates(&fake, &mut orgs, &updates[0]).expect("apply");
        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 1);
        let again = find_tag_updates(&watchlist, &orgs);
        assert_eq!(again[0].tags[0].missing_tags, vec![Tag::new("env", "prod")]);
    }

    #[test]
    fn unknown_group_is_config_invalid() {
        let (fake, mut orgs, _watchlist, _tmp) = setup(&[]);
        let group = GroupTagUpdates { name: "ghost".into(), tags: Vec::new() };
        let err = apply_tag_updates(&fake, &mut orgs, &group).expect_err("must fail");
        assert!(matches!(err, SyncError::ConfigInvalid(_)));
    }
}
