use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "covenant",
    version,
    about = "Install and reconcile the covenant policy framework inside a repository"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the framework into a target repository.
    Install(SyncArgs),
    /// Refresh an existing install, preserving local edits by default.
    Update(SyncArgs),
    /// Like update, but always replaces the package directory.
    Upgrade(SyncArgs),
    /// Refresh docs/config/metadata only; the package directory is left alone.
    Deploy(SyncArgs),
    /// Remove everything the manifest says was installed.
    Uninstall {
        target: PathBuf,
        #[arg(long, default_value_t = false, help = "Delete documents that carry a managed block")]
        remove_docs: bool,
    },
    /// Strip managed blocks and generated registry state, keep the package directory.
    Undeploy { target: PathBuf },
    /// Print the recorded manifest without touching any file.
    Status { target: PathBuf },
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    pub target: PathBuf,
    #[arg(
        long,
        env = "COVENANT_SOURCE",
        help = "Framework distribution root (templates, package directory, registry)"
    )]
    pub source: PathBuf,
    #[command(flatten)]
    pub modes: ModeFlags,
    #[arg(long, default_value_t = false, help = "Do not force `updated: true` on rewritten policy blocks")]
    pub no_touch_updated: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ModeFlags {
    #[arg(long, value_enum, default_value_t = InstallMode::Auto)]
    pub install_mode: InstallMode,
    #[arg(long, value_enum)]
    pub docs_mode: Option<AssetMode>,
    #[arg(long, value_enum)]
    pub config_mode: Option<AssetMode>,
    #[arg(long, value_enum)]
    pub metadata_mode: Option<AssetMode>,
    #[arg(long, value_enum)]
    pub license_mode: Option<OverrideMode>,
    #[arg(long, value_enum)]
    pub version_mode: Option<OverrideMode>,
    #[arg(long, value_enum)]
    pub pyproject_mode: Option<OverrideMode>,
    #[arg(long, value_enum)]
    pub ci_mode: Option<OverrideMode>,
    #[arg(long)]
    pub preserve_custom: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Auto,
    Empty,
    Existing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AssetMode {
    Preserve,
    Overwrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverrideMode {
    Inherit,
    Preserve,
    Overwrite,
    Skip,
}
