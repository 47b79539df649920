//! Tags command implementation

use anyhow::{Context, Result};
use clap::Args;

use super::utils::{load_or_sync, print_json, snyk_client, write_json_file};
use crate::config::Settings;
use crate::gaps::{apply_tag_updates, find_tag_updates};

#[derive(Args)]
pub struct TagsArgs {
    /// Update tags on projects instead of outputting them
    #[arg(long)]
    pub update: bool,

    /// Write tags to <tags_dir>/<group>.json, otherwise print to stdout
    #[arg(long)]
    pub save: bool,
}

pub fn run(settings: &Settings, args: TagsArgs) -> Result<()> {
    let (watchlist, mut orgs) = load_or_sync(settings)?;
    let updates = find_tag_updates(&watchlist, &orgs);

    let client = if args.update { Some(snyk_client(settings)?) } else { None };
    let mut applied = false;

    for group in &updates {
        if group.tags.is_empty() {
            eprintln!("No {} projects require tag updates", group.name);
            continue;
        }

        if let Some(client) = &client {
            eprintln!("Checking if {} projects need tag updates", group.name);
            let report = apply_tag_updates(client, &mut orgs, group)
                .with_context(|| format!("Failed to update tags for group {}", group.name))?;
            applied = true;
            if report.failed > 0 {
                tracing::warn!("{} tag updates failed in group {}", report.failed, group.name);
            }
        }

        if args.save {
            let path = settings.tags_dir.join(format!("{}.json", group.name));
            write_json_file(&path, &group.tags)?;
        }

        if !args.save && !args.update {
            print_json(&group.tags)?;
        }
    }

    if applied {
        orgs.save().context("Failed to save organization cache")?;
    }
    Ok(())
}
