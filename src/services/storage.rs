use crate::domain::constants::{AUDIT_LOG_PATH, LEGACY_MANIFEST_PATHS, MANIFEST_PATH};
use crate::domain::models::{Manifest, Notification};
use crate::error::LifecycleError;
use std::path::{Path, PathBuf};

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

pub fn audit(repo_root: &Path, action: &str, data: serde_json::Value) {
    let path = repo_root.join(AUDIT_LOG_PATH);
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let event = serde_json::json!({
        "ts": now_timestamp(),
        "action": action,
        "data": data
    });
    let line = format!("{}\n", event);
    let written = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
    if let Err(e) = written {
        tracing::warn!(path = %path.display(), error = %e, "failed to append audit event");
    }
}

pub fn manifest_path(repo_root: &Path) -> PathBuf {
    repo_root.join(MANIFEST_PATH)
}

/// Loads the manifest from the primary path, then the legacy paths when allowed.
///
/// A missing file is `Ok(None)`; a file that exists but does not parse is an
/// error, since the manifest is the only record reversal can use.
pub fn load_manifest(repo_root: &Path, include_legacy: bool) -> anyhow::Result<Option<Manifest>> {
    let mut candidates = vec![manifest_path(repo_root)];
    if include_legacy {
        candidates.extend(LEGACY_MANIFEST_PATHS.iter().map(|p| repo_root.join(p)));
    }
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        let raw = std::fs::read_to_string(&path)?;
        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|e| LifecycleError::ManifestParse {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), "loaded manifest");
        return Ok(Some(manifest));
    }
    Ok(None)
}

pub fn write_manifest(repo_root: &Path, manifest: &Manifest) -> anyhow::Result<PathBuf> {
    let path = manifest_path(repo_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let value = sorted_value(serde_json::to_value(manifest)?);
    std::fs::write(&path, format!("{}\n", serde_json::to_string_pretty(&value)?))?;
    Ok(path)
}

pub fn delete_manifest(repo_root: &Path) -> anyhow::Result<bool> {
    let mut removed = false;
    let mut candidates = vec![manifest_path(repo_root)];
    candidates.extend(LEGACY_MANIFEST_PATHS.iter().map(|p| repo_root.join(p)));
    for path in candidates {
        if path.is_file() {
            std::fs::remove_file(&path)?;
            removed = true;
        }
    }
    Ok(removed)
}

pub fn push_notification(manifest: &mut Manifest, message: impl Into<String>) {
    manifest.notifications.push(Notification {
        timestamp: now_timestamp(),
        message: message.into(),
    });
}

fn sorted_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sorted_value(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sorted_value).collect())
        }
        other => other,
    }
}
