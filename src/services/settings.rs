use crate::domain::constants::SETTINGS_FILE;
use crate::error::LifecycleError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub install: InstallDefaults,
    #[serde(default)]
    pub preserve_paths: Vec<String>,
    #[serde(default)]
    pub policy_state: BTreeMap<String, bool>,
}

/// Stored mode defaults. Kept as raw strings so bad values surface as
/// `UnsupportedOptionValue` from the resolver rather than a YAML error.
#[derive(Debug, Default, Deserialize)]
pub struct InstallDefaults {
    pub docs_mode: Option<String>,
    pub config_mode: Option<String>,
    pub metadata_mode: Option<String>,
    pub license_mode: Option<String>,
    pub version_mode: Option<String>,
    pub pyproject_mode: Option<String>,
    pub ci_mode: Option<String>,
    pub preserve_custom: Option<bool>,
}

pub fn load_settings(repo_root: &Path) -> anyhow::Result<Settings> {
    let path = repo_root.join(SETTINGS_FILE);
    if !path.is_file() {
        return Ok(Settings::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings = serde_yaml::from_str(&raw).map_err(|e| LifecycleError::Settings {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(settings)
}
