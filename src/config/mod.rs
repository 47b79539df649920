//! Configuration loading and merging
//!
//! Handles loading `snyk-sync.yaml` and `snyk-orgs.yaml`, and merging them with CLI
//! arguments and environment variables (CLI > Env > File > Defaults).

pub mod autoconf;
pub mod loader;
pub mod merge;
pub mod settings;

pub use autoconf::{discover, GeneratedConfig};
pub use loader::{load_config, load_org_table};
pub use merge::{config_dir, merge_cli_with_config, resolve_orgs_file, CliOverrides};
pub use settings::{GroupConfig, Settings, SyncConfig};
