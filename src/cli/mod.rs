//! Command-line interface for snyk-sync
//!
//! Provides `sync`, `status`, `targets`, `tags` and `autoconf`. Invoked without a subcommand it
//! checks the cache and syncs when stale.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::CliOverrides;

mod autoconf;
mod status;
mod sync;
mod tags;
mod targets;
mod utils;

/// Keep Snyk organizations and projects in step with GitHub repositories
#[derive(Parser)]
#[command(name = "snyk-sync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Force a sync of the local cache of the GitHub / Snyk data
    Sync,

    /// Report whether the cache is out of date (exit code 1 when stale or missing)
    Status,

    /// Emit import targets for repositories missing from Snyk
    Targets(targets::TargetsArgs),

    /// Emit or apply tags declared in import.yaml but missing from projects
    Tags(tags::TagsArgs),

    /// Generate snyk-sync.yaml and snyk-orgs.yaml from a live Snyk org
    Autoconf(autoconf::AutoconfArgs),
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Cache location
    #[arg(long, global = true, env = "SNYK_SYNC_CACHE_DIR", value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Maximum cache age, in minutes
    #[arg(long, global = true, env = "SNYK_SYNC_CACHE_TIMEOUT", value_name = "MINUTES")]
    cache_timeout: Option<u64>,

    /// Check forks for import.yaml files
    #[arg(long, global = true, env = "SNYK_SYNC_FORKS")]
    forks: bool,

    /// Path to snyk-sync.yaml
    #[arg(
        short,
        long,
        global = true,
        env = "SNYK_SYNC_CONFIG",
        default_value = "snyk-sync.yaml",
        value_name = "FILE"
    )]
    conf: PathBuf,

    /// Directory for per-group import target files
    #[arg(long, global = true, env = "SNYK_SYNC_TARGETS_DIR", value_name = "DIR")]
    targets_dir: Option<PathBuf>,

    /// Directory for per-group tag update files
    #[arg(long, global = true, env = "SNYK_SYNC_TAGS_DIR", value_name = "DIR")]
    tags_dir: Option<PathBuf>,

    /// Snyk orgs to watch (snyk-orgs.yaml)
    #[arg(long = "snyk-orgs-file", global = true, env = "SNYK_SYNC_ORGS", value_name = "FILE")]
    orgs_file: Option<PathBuf>,

    /// Default Snyk org slug from the orgs file
    #[arg(long, global = true, env = "SNYK_SYNC_DEFAULT_ORG", value_name = "SLUG")]
    default_org: Option<String>,

    /// Default Snyk integration to use with the default org
    #[arg(long, global = true, env = "SNYK_SYNC_DEFAULT_INT", value_name = "NAME")]
    default_int: Option<String>,

    /// Source-hosting instance name selecting import.yaml overrides
    #[arg(long, global = true, env = "SNYK_SYNC_INSTANCE", value_name = "NAME")]
    instance: Option<String>,

    /// Snyk access token (used by autoconf)
    #[arg(long, global = true, env = "SNYK_TOKEN", hide_env_values = true)]
    snyk_token: Option<String>,

    /// GitHub access token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, global = true, env = "SNYK_SYNC_GITHUB_API", value_name = "URL")]
    github_api: Option<String>,

    /// Snyk v1 API base URL
    #[arg(long, global = true, env = "SNYK_SYNC_SNYK_API", value_name = "URL")]
    snyk_api: Option<String>,

    /// Overall time budget for remote calls, in seconds
    #[arg(long, global = true, env = "SNYK_SYNC_DEADLINE", value_name = "SECS")]
    deadline: Option<u64>,

    /// Force a sync regardless of cache status
    #[arg(long = "sync", global = true)]
    force_sync: bool,
}

impl GlobalArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            cache_dir: self.cache_dir.clone(),
            cache_timeout: self.cache_timeout,
            forks: self.forks,
            force_sync: self.force_sync,
            targets_dir: self.targets_dir.clone(),
            tags_dir: self.tags_dir.clone(),
            orgs_file: self.orgs_file.clone(),
            default_org: self.default_org.clone(),
            default_int: self.default_int.clone(),
            instance: self.instance.clone(),
            github_token: self.github_token.clone(),
            snyk_token: self.snyk_token.clone(),
            github_api: self.github_api.clone(),
            snyk_api: self.snyk_api.clone(),
            deadline_secs: self.deadline,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let global = &cli.global;
    match cli.command {
        None => {
            tracing::info!("Snyk Sync invoked with no subcommand, executing all");
            utils::load_or_sync(&utils::load_settings(global)?).map(|_| ())
        }
        Some(Commands::Sync) => sync::run(&utils::load_settings(global)?),
        Some(Commands::Status) => status::run(&utils::load_settings(global)?),
        Some(Commands::Targets(args)) => targets::run(&utils::load_settings(global)?, args),
        Some(Commands::Tags(args)) => tags::run(&utils::load_settings(global)?, args),
        // Bootstraps the config files, so it must not require them.
        Some(Commands::Autoconf(args)) => autoconf::run(global, &args),
    }
}
