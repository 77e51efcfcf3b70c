use crate::domain::constants::{CORE_FIXERS_DIR, CORE_SCRIPTS_DIR, CUSTOM_FIXERS_DIR, CUSTOM_SCRIPTS_DIR, REPLACEMENTS_FILE};
use crate::domain::models::{PolicyReplacement, ReplacementEntry};
use crate::services::policy_doc::{is_truthy, policy_active, GovernanceDoc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn policy_file_name(policy_id: &str) -> String {
    format!("{}.py", policy_id.replace('-', "_"))
}

pub fn custom_script_path(root: &Path, policy_id: &str) -> PathBuf {
    root.join(CUSTOM_SCRIPTS_DIR).join(policy_file_name(policy_id))
}

pub fn custom_fixer_path(root: &Path, policy_id: &str) -> PathBuf {
    root.join(CUSTOM_FIXERS_DIR).join(policy_file_name(policy_id))
}

pub fn core_script_path(root: &Path, policy_id: &str) -> PathBuf {
    root.join(CORE_SCRIPTS_DIR).join(policy_file_name(policy_id))
}

pub fn core_fixer_path(root: &Path, policy_id: &str) -> PathBuf {
    root.join(CORE_FIXERS_DIR).join(policy_file_name(policy_id))
}

pub fn load_replacements(source_root: &Path) -> BTreeMap<String, PolicyReplacement> {
    let path = source_root.join(REPLACEMENTS_FILE);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return BTreeMap::new(),
    };
    let parsed: Option<BTreeMap<String, ReplacementEntry>> = match serde_yaml::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable replacement registry");
            return BTreeMap::new();
        }
    };
    parsed
        .unwrap_or_default()
        .into_iter()
        .map(|(policy_id, entry)| {
            let replacement = PolicyReplacement {
                policy_id: policy_id.clone(),
                replaced_by: entry.replaced_by,
                note: entry.note,
            };
            (policy_id, replacement)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySources {
    pub script: Option<Vec<u8>>,
    pub fixer: Option<Vec<u8>>,
}

pub fn snapshot_sources<'a>(
    target_root: &Path,
    policy_ids: impl IntoIterator<Item = &'a String>,
) -> anyhow::Result<BTreeMap<String, PolicySources>> {
    let mut out = BTreeMap::new();
    for id in policy_ids {
        let script = core_script_path(target_root, id);
        let fixer = core_fixer_path(target_root, id);
        let sources = PolicySources {
            script: if script.is_file() {
                Some(std::fs::read(&script)?)
            } else {
                None
            },
            fixer: if fixer.is_file() {
                Some(std::fs::read(&fixer)?)
            } else {
                None
            },
        };
        if sources.script.is_some() || sources.fixer.is_some() {
            tracing::debug!(policy = %id, "captured policy sources");
        }
        out.insert(id.clone(), sources);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementAction {
    Migrate,
    Remove,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplacementOutcome {
    pub migrated: Vec<String>,
    pub removed: Vec<String>,
    pub files: Vec<String>,
    pub notifications: Vec<String>,
}

pub fn classify(
    doc_before: &GovernanceDoc,
    doc_now: &GovernanceDoc,
    policy_id: &str,
    state_override: Option<bool>,
) -> Option<ReplacementAction> {
    let block = doc_before
        .block(policy_id)
        .or_else(|| doc_now.block(policy_id))?;
    if policy_active(&block, state_override) {
        Some(ReplacementAction::Migrate)
    } else {
        Some(ReplacementAction::Remove)
    }
}

fn rel(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn write_if_absent(path: &Path, bytes: &[u8]) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(true)
}

fn describe(replacement: &PolicyReplacement) -> String {
    match replacement.note.as_deref() {
        Some(note) if !note.trim().is_empty() => {
            format!("replaced by `{}` ({})", replacement.replaced_by, note.trim())
        }
        _ => format!("replaced by `{}`", replacement.replaced_by),
    }
}

/// Migrates or removes every replaced policy present in the governance document.
///
/// `doc_before` is the governance document as it was before this run; it
/// decides whether a policy was active and supplies the section to
/// re-insert when the refreshed document no longer carries it.
pub fn apply_replacements(
    target_root: &Path,
    doc: &mut GovernanceDoc,
    doc_before: &GovernanceDoc,
    replacements: &BTreeMap<String, PolicyReplacement>,
    snapshots: &BTreeMap<String, PolicySources>,
    policy_state: &BTreeMap<String, bool>,
) -> anyhow::Result<ReplacementOutcome> {
    let mut out = ReplacementOutcome::default();
    for (id, replacement) in replacements {
        let Some(action) = classify(doc_before, doc, id, policy_state.get(id).copied()) else {
            continue;
        };
        match action {
            ReplacementAction::Migrate => {
                let mut changed = false;
                if doc.block(id).is_none() {
                    if let Some(text) = doc_before.section_text(id) {
                        doc.append_section(&text);
                        changed = true;
                    }
                }
                let Some(mut block) = doc.block(id) else {
                    continue;
                };
                block.set_scalar("status", "deprecated");
                block.set_scalar("custom", "true");
                changed |= doc.set_block(id, &block);

                let sources = snapshots.get(id).cloned().unwrap_or_default();
                if let Some(script) = &sources.script {
                    let path = custom_script_path(target_root, id);
                    if write_if_absent(&path, script)? {
                        out.files.push(rel(target_root, &path));
                        changed = true;
                    }
                }
                if let Some(fixer) = &sources.fixer {
                    let path = custom_fixer_path(target_root, id);
                    if write_if_absent(&path, fixer)? {
                        out.files.push(rel(target_root, &path));
                        changed = true;
                    }
                }

                if changed {
                    tracing::info!(policy = %id, replaced_by = %replacement.replaced_by, "migrated replaced policy to custom ownership");
                    out.notifications.push(format!(
                        "Policy `{}` was {}; kept as a deprecated custom policy.",
                        id,
                        describe(replacement)
                    ));
                    out.migrated.push(id.clone());
                }
            }
            ReplacementAction::Remove => {
                let mut changed = doc.remove_section(id);
                for path in [
                    custom_script_path(target_root, id),
                    custom_fixer_path(target_root, id),
                ] {
                    if path.is_file() {
                        std::fs::remove_file(&path)?;
                        out.files.push(rel(target_root, &path));
                        changed = true;
                    }
                }
                if changed {
                    tracing::info!(policy = %id, replaced_by = %replacement.replaced_by, "removed disabled replaced policy");
                    out.notifications.push(format!(
                        "Policy `{}` was {}; removed because it was disabled.",
                        id,
                        describe(replacement)
                    ));
                    out.removed.push(id.clone());
                }
            }
        }
    }
    Ok(out)
}

pub fn detect_new_policies(
    template: &GovernanceDoc,
    ids_before: &[String],
    replacements: &BTreeMap<String, PolicyReplacement>,
) -> Vec<String> {
    template
        .sections()
        .into_iter()
        .filter(|s| {
            s.block
                .first("status")
                .map(|v| !v.eq_ignore_ascii_case("deleted"))
                .unwrap_or(true)
        })
        .filter(|s| !s.block.first("custom").map(is_truthy).unwrap_or(false))
        .map(|s| s.id)
        .filter(|id| !ids_before.contains(id) && !replacements.contains_key(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(enabled: &str) -> GovernanceDoc {
        GovernanceDoc::parse(&format!(
            "# Agents\n\n---\n\n## Policy: Old\n\n```policy-def\nid: old-policy\nstatus: active\nenabled: {}\ncustom: false\n```\n\nOld text.\n\n---\n\n## Policy: Keep\n\n```policy-def\nid: keep\nstatus: active\n```\n\nKeep text.\n\n---\n",
            enabled
        ))
    }

    fn registry() -> BTreeMap<String, PolicyReplacement> {
        let mut map = BTreeMap::new();
        map.insert(
            "old-policy".to_string(),
            PolicyReplacement {
                policy_id: "old-policy".to_string(),
                replaced_by: "new-policy".to_string(),
                note: Some("split into smaller checks".to_string()),
            },
        );
        map
    }

    fn snapshot() -> BTreeMap<String, PolicySources> {
        let mut map = BTreeMap::new();
        map.insert(
            "old-policy".to_string(),
            PolicySources {
                script: Some(b"def check(): pass\n".to_vec()),
                fixer: None,
            },
        );
        map
    }

    #[test]
    fn registry_parses_and_tolerates_garbage() {
        let tmp = TempDir::new().unwrap();
        assert!(load_replacements(tmp.path()).is_empty());

        let path = tmp.path().join(REPLACEMENTS_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "old-policy:\n  replaced_by: new-policy\n  note: moved\n").unwrap();
        let loaded = load_replacements(tmp.path());
        assert_eq!(loaded["old-policy"].replaced_by, "new-policy");
        assert_eq!(loaded["old-policy"].note.as_deref(), Some("moved"));

        std::fs::write(&path, "old-policy: [::").unwrap();
        assert!(load_replacements(tmp.path()).is_empty());
    }

    #[test]
    fn enabled_policy_is_migrated_to_custom_ownership() {
        let tmp = TempDir::new().unwrap();
        let before = doc("true");
        let mut now = before.clone();
        let out = apply_replacements(tmp.path(), &mut now, &before, &registry(), &snapshot(), &BTreeMap::new()).unwrap();

        assert_eq!(out.migrated, vec!["old-policy".to_string()]);
        let block = now.block("old-policy").unwrap();
        assert_eq!(block.first("status"), Some("deprecated"));
        assert_eq!(block.first("custom"), Some("true"));
        assert_eq!(
            std::fs::read_to_string(custom_script_path(tmp.path(), "old-policy")).unwrap(),
            "def check(): pass\n"
        );
        assert!(out.notifications[0].contains("new-policy"));

        let again = apply_replacements(tmp.path(), &mut now, &before, &registry(), &snapshot(), &BTreeMap::new()).unwrap();
        assert!(again.notifications.is_empty());
    }

    #[test]
    fn existing_custom_copy_is_never_clobbered() {
        let tmp = TempDir::new().unwrap();
        let custom = custom_script_path(tmp.path(), "old-policy");
        std::fs::create_dir_all(custom.parent().unwrap()).unwrap();
        std::fs::write(&custom, "# hand tuned\n").unwrap();

        let before = doc("true");
        let mut now = before.clone();
        apply_replacements(tmp.path(), &mut now, &before, &registry(), &snapshot(), &BTreeMap::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&custom).unwrap(), "# hand tuned\n");
    }

    #[test]
    fn disabled_policy_is_removed_with_custom_copies() {
        let tmp = TempDir::new().unwrap();
        let custom = custom_script_path(tmp.path(), "old-policy");
        std::fs::create_dir_all(custom.parent().unwrap()).unwrap();
        std::fs::write(&custom, "# stale\n").unwrap();

        let before = doc("false");
        let mut now = before.clone();
        let out = apply_replacements(tmp.path(), &mut now, &before, &registry(), &snapshot(), &BTreeMap::new()).unwrap();

        assert_eq!(out.removed, vec!["old-policy".to_string()]);
        assert!(!now.render().contains("old-policy"));
        assert!(!now.render().contains("---\n\n---"));
        assert_eq!(now.ids(), vec!["keep".to_string()]);
        assert!(!custom.exists());
    }

    #[test]
    fn settings_override_beats_document_flag() {
        let mut state = BTreeMap::new();
        state.insert("old-policy".to_string(), false);
        let before = doc("true");
        assert_eq!(
            classify(&before, &before, "old-policy", state.get("old-policy").copied()),
            Some(ReplacementAction::Remove)
        );
        assert_eq!(classify(&before, &before, "missing", None), None);
    }

    #[test]
    fn migrated_section_is_reinserted_when_refresh_dropped_it() {
        let tmp = TempDir::new().unwrap();
        let before = doc("true");
        let mut now = before.clone();
        now.remove_section("old-policy");
        apply_replacements(tmp.path(), &mut now, &before, &registry(), &snapshot(), &BTreeMap::new()).unwrap();
        let block = now.block("old-policy").unwrap();
        assert_eq!(block.first("status"), Some("deprecated"));
        assert!(now.render().contains("Old text."));
    }

    #[test]
    fn new_stock_policies_exclude_deleted_and_known_ids() {
        let template = GovernanceDoc::parse(
            "# T\n\n```policy-def\nid: keep\n```\n\n---\n\n## Policy: Fresh\n\n```policy-def\nid: fresh\nstatus: active\n```\n\n---\n\n## Policy: Gone\n\n```policy-def\nid: gone\nstatus: deleted\n```\n\n---\n",
        );
        let found = detect_new_policies(&template, &["keep".to_string()], &registry());
        assert_eq!(found, vec!["fresh".to_string()]);
    }
}
