//! The sync flow.
//!
//! 1. list repositories of every configured source org into a fresh watch list
//! 2. find and apply `.snyk.d/import.yaml` declarations (code search, then forks)
//! 3. refresh and save the organization cache
//! 4. link projects to repositories and save the watch list
//!
//! Steps 1 and 2 degrade per org and per repository. Step 3 is all-or-nothing.

use crate::cache::{CacheSummary, Orgs, WatchList};
use crate::config::Settings;
use crate::domain::{ImportDeclaration, ImportFields, RepoId, IMPORT_DECLARATION_PATH};
use crate::error::{Result, SyncError};
use crate::matcher::attach_projects;
use crate::remote::{ScanPlatform, SourceHost};
use indicatif::ProgressBar;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub repos: usize,
    pub declarations: usize,
    pub declaration_failures: usize,
    pub forks_scanned: usize,
    pub skipped_orgs: Vec<String>,
    pub attached: usize,
    pub cache: CacheSummary,
}

pub struct SyncOutcome {
    pub watchlist: WatchList,
    pub orgs: Orgs,
    pub report: SyncReport,
}

/// Code search query for import declarations in one source org.
pub fn declaration_query(org: &str) -> String {
    format!("org:{org} path:.snyk.d filename:import language:yaml")
}

pub fn run_sync(
    settings: &Settings,
    host: &dyn SourceHost,
    platform: &dyn ScanPlatform,
    progress: &ProgressBar,
) -> Result<SyncOutcome> {
    let mut report = SyncReport::default();
    let mut watchlist = WatchList::new();

    progress.set_length(settings.github_orgs.len() as u64);
    for org in &settings.github_orgs {
        progress.set_message(format!("listing repositories in {org}"));
        match host.list_organization_repositories(org) {
            Ok(repos) => {
                tracing::debug!(org = %org, repos = repos.len(), "listed repositories");
                for desc in &repos {
                    watchlist.add_repo(desc);
                }
            }
            Err(err) => {
                tracing::warn!(org = %org, "Skipping GitHub org: {err}");
                report.skipped_orgs.push(org.clone());
            }
        }
        progress.inc(1);
    }
    report.repos = watchlist.len();
    tracing::info!("Tracking {} repositories", report.repos);

    let instance = settings.instance.as_deref();
    progress.set_position(0);
    progress.set_length(settings.github_orgs.len() as u64);
    let skipped = report.skipped_orgs.clone();
    for org in settings.github_orgs.iter().filter(|o| !skipped.contains(o)) {
        progress.set_message(format!("searching import declarations in {org}"));
        scan_declarations(host, &mut watchlist, org, instance, &mut report);
        progress.inc(1);
    }

    if settings.forks {
        let forks: Vec<RepoId> = watchlist.forks().map(|r| r.id).collect();
        progress.set_position(0);
        progress.set_length(forks.len() as u64);
        progress.set_message("checking forks for import declarations");
        for id in forks {
            apply_declaration(host, &mut watchlist, id, instance, &mut report)?;
            report.forks_scanned += 1;
            progress.inc(1);
        }
    }

    progress.set_message("refreshing Snyk organizations");
    let mut orgs = Orgs::new(&settings.cache_dir, &settings.groups);
    orgs.refresh(platform, &settings.origin, &settings.selected_org_ids())?;
    orgs.save()?;
    report.cache = orgs.summary();

    report.attached = attach_projects(&mut watchlist, &orgs);
    watchlist.save(&settings.cache_dir)?;
    progress.finish_and_clear();

    tracing::info!(
        repos = report.repos,
        declarations = report.declarations,
        failures = report.declaration_failures,
        attached = report.attached,
        "Sync complete"
    );
    Ok(SyncOutcome { watchlist, orgs, report })
}

fn scan_declarations(
    host: &dyn SourceHost,
    watchlist: &mut WatchList,
    org: &str,
    instance: Option<&str>,
    report: &mut SyncReport,
) {
    let matches = match host.search_code(&declaration_query(org)) {
        Ok(matches) => matches,
        Err(err) => {
            tracing::warn!(org = %org, "Code search failed: {err}");
            return;
        }
    };

    for hit in matches.iter().filter(|m| m.path == IMPORT_DECLARATION_PATH) {
        if let Err(err) =
            apply_declaration(host, watchlist, hit.repository_id, instance, report)
        {
            tracing::warn!(repo = %hit.repository_full_name, "Ignoring search hit: {err}");
        }
    }
}

/// Fetches, parses and applies one declaration. Only an unknown repository id is an error;
/// remote and parse failures are logged against the repository and counted.
fn apply_declaration(
    host: &dyn SourceHost,
    watchlist: &mut WatchList,
    id: RepoId,
    instance: Option<&str>,
    report: &mut SyncReport,
) -> Result<()> {
    let repo = watchlist.get_repo_mut(id)?;
    match fetch_declaration(host, &repo.source.owner, &repo.source.name, instance) {
        Ok(Some(fields)) => {
            repo.apply_import(&fields);
            report.declarations += 1;
            tracing::debug!(repo = %repo.full_name, org = %repo.org, "applied import declaration");
        }
        Ok(None) => tracing::debug!(repo = %repo.full_name, "no import declaration"),
        Err(err) => {
            report.declaration_failures += 1;
            tracing::warn!(repo = %repo.full_name, "Skipping import declaration: {err}");
        }
    }
    Ok(())
}

fn fetch_declaration(
    host: &dyn SourceHost,
    owner: &str,
    name: &str,
    instance: Option<&str>,
) -> Result<Option<ImportFields>> {
    let unit = format!("{owner}/{name}");
    let Some(content) = host
        .get_repository_contents(owner, name, IMPORT_DECLARATION_PATH)
        .map_err(|e| SyncError::remote(unit.clone(), e))?
    else {
        return Ok(None);
    };
    let declaration = ImportDeclaration::parse(&content).map_err(|source| SyncError::Yaml {
        what: format!("{unit}/{IMPORT_DECLARATION_PATH}"),
        source,
    })?;
    Ok(Some(declaration.resolve(instance)))
}
