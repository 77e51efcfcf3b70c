use crate::domain::constants::{LOCAL_REGISTRY_DIR, POLICY_REGISTRY_FILE};
use crate::domain::models::RegistryEntry;
use crate::services::policy_doc::{is_truthy, policy_active, GovernanceDoc};
use crate::services::replacement::{core_script_path, custom_script_path};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

fn sha256_file(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)?;
    let mut h = Sha256::new();
    h.update(&bytes);
    Ok(hex::encode(h.finalize()))
}

pub fn build_entries(
    repo_root: &Path,
    doc: &GovernanceDoc,
    policy_state: &BTreeMap<String, bool>,
) -> anyhow::Result<Vec<RegistryEntry>> {
    let mut out = Vec::new();
    for section in doc.sections() {
        let custom = section.block.first("custom").map(is_truthy).unwrap_or(false);
        let candidates = [
            custom_script_path(repo_root, &section.id),
            core_script_path(repo_root, &section.id),
        ];
        let script = candidates.iter().find(|p| p.is_file());
        let (script, sha256) = match script {
            Some(path) => (
                Some(
                    path.strip_prefix(repo_root)
                        .unwrap_or(path)
                        .to_string_lossy()
                        .replace('\\', "/"),
                ),
                Some(sha256_file(path)?),
            ),
            None => (None, None),
        };
        out.push(RegistryEntry {
            active: policy_active(&section.block, policy_state.get(&section.id).copied()),
            status: section.block.first("status").unwrap_or("active").to_string(),
            id: section.id,
            custom,
            script,
            sha256,
        });
    }
    Ok(out)
}

pub fn write_registry(repo_root: &Path, entries: &[RegistryEntry]) -> anyhow::Result<bool> {
    let path = repo_root.join(POLICY_REGISTRY_FILE);
    let rendered = format!(
        "{}\n",
        serde_json::to_string_pretty(&serde_json::json!({ "policies": entries }))?
    );
    if std::fs::read_to_string(&path).ok().as_deref() == Some(rendered.as_str()) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, rendered)?;
    tracing::debug!(path = %path.display(), policies = entries.len(), "wrote policy registry");
    Ok(true)
}

pub fn remove_registry(repo_root: &Path) -> anyhow::Result<bool> {
    let dir = repo_root.join(LOCAL_REGISTRY_DIR);
    if !dir.is_dir() {
        return Ok(false);
    }
    std::fs::remove_dir_all(&dir)?;
    Ok(true)
}
