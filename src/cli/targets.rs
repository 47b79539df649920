//! Targets command implementation

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::utils::{load_or_sync, print_json, write_json_file};
use crate::config::Settings;
use crate::gaps::{find_targets, TargetResolver};

#[derive(Args)]
pub struct TargetsArgs {
    /// Write targets to <targets_dir>/<group>.json, otherwise print to stdout
    #[arg(long)]
    pub save: bool,
}

pub fn run(settings: &Settings, args: TargetsArgs) -> Result<()> {
    let (watchlist, orgs) = load_or_sync(settings)?;
    let grouped = find_targets(&watchlist, &orgs, &TargetResolver::from_settings(settings));

    if !args.save {
        return print_json(&grouped);
    }

    eprintln!("Writing targets to {}", settings.targets_dir.display());
    for group in &grouped {
        let path = settings.targets_dir.join(format!("{}.json", group.name));
        write_json_file(&path, &json!({ "targets": group.targets }))?;
    }
    Ok(())
}
