use crate::cli::AssetMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    Empty,
    Existing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedOverride {
    Preserve,
    Overwrite,
    Skip,
}

impl From<AssetMode> for ResolvedOverride {
    fn from(mode: AssetMode) -> Self {
        match mode {
            AssetMode::Preserve => ResolvedOverride::Preserve,
            AssetMode::Overwrite => ResolvedOverride::Overwrite,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    pub install_mode: TargetState,
    pub docs_mode: AssetMode,
    pub config_mode: AssetMode,
    pub metadata_mode: AssetMode,
    pub license_mode: ResolvedOverride,
    pub version_mode: ResolvedOverride,
    pub pyproject_mode: ResolvedOverride,
    pub ci_mode: ResolvedOverride,
    pub preserve_custom: bool,
    /// Source and target roots coincide: the package directory is this repository's own code.
    #[serde(default)]
    pub core_is_self: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestMode {
    #[default]
    Install,
    Update,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPaths {
    #[serde(default)]
    pub core: Vec<String>,
    #[serde(default)]
    pub config: Vec<String>,
    #[serde(default)]
    pub docs: Vec<String>,
    /// `_oldN` copies of framework-written content; deleted on uninstall.
    #[serde(default)]
    pub backups: Vec<String>,
}

/// State of the ignore file before the framework first merged into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreOrigin {
    pub existed: bool,
    pub trailing_newline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: String,
    pub message: String,
}

/// Persisted record of the last lifecycle run; the sole basis for reversal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub mode: ManifestMode,
    #[serde(default)]
    pub installed: InstalledPaths,
    #[serde(default)]
    pub doc_blocks: Vec<String>,
    /// Path -> backup holding the user's content from before the first overwrite.
    #[serde(default)]
    pub originals: BTreeMap<String, String>,
    #[serde(default)]
    pub ignore_origin: Option<IgnoreOrigin>,
    #[serde(default)]
    pub options: Option<ResolvedOptions>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplacementEntry {
    pub replaced_by: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyReplacement {
    pub policy_id: String,
    pub replaced_by: String,
    pub note: Option<String>,
}

#[derive(Serialize, Clone, Debug, Default)]
pub struct LifecycleReport {
    pub verb: String,
    pub target: String,
    pub manifest: String,
    pub options: Option<ResolvedOptions>,
    pub written: Vec<String>,
    pub preserved: Vec<String>,
    pub doc_blocks: Vec<String>,
    pub migrated: Vec<String>,
    pub removed_policies: Vec<String>,
    pub normalized: Vec<String>,
    pub notifications: Vec<String>,
}

#[derive(Serialize, Clone, Debug, Default)]
pub struct RemovalReport {
    pub verb: String,
    pub target: String,
    pub manifest_found: bool,
    pub removed: Vec<String>,
    pub restored: Vec<String>,
    pub stripped: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct RegistryEntry {
    pub id: String,
    pub status: String,
    pub active: bool,
    pub custom: bool,
    pub script: Option<String>,
    pub sha256: Option<String>,
}
