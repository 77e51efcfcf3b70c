//! Lifecycle orchestrators.
//!
//! `install`, `update`, `upgrade` and `deploy` share one reconciliation pass
//! that differs only in its default bundle, whether the package directory is
//! refreshed, and whether replaced policies are migrated. `uninstall` and
//! `undeploy` read the manifest and run the inverse steps.

use crate::cli::{AssetMode, ModeFlags};
use crate::domain::constants::{
    CI_WORKFLOW, CUSTOM_FIXERS_DIR, CUSTOM_SCRIPTS_DIR, DEFAULT_UNINSTALL_CONFIG,
    DEFAULT_UNINSTALL_CORE, GOVERNANCE_DOC, IGNORE_FILE, LICENSE_FILE, LICENSE_TEMPLATE,
    LOCAL_REGISTRY_DIR, MANAGED_DOCS, PACKAGE_DIR, PRE_COMMIT_CONFIG, PYPROJECT_FILE,
    ROOT_VERSION_FILE, SETTINGS_FILE, STATE_DIR, VERSION_FILE,
};
use crate::domain::models::{
    IgnoreOrigin, InstalledPaths, LifecycleReport, Manifest, ManifestMode, PolicyReplacement, RemovalReport,
    ResolvedOptions, ResolvedOverride,
};
use crate::error::LifecycleError;
use crate::services::blocks::{self, BlockChange, IgnoreStrip};
use crate::services::modes::{resolve_options, DefaultBundle};
use crate::services::normalize::{normalize_doc, overwrite_from_template, SchemaSet};
use crate::services::policy_doc::{is_truthy, GovernanceDoc};
use crate::services::reconcile::{self, InstallOutcome};
use crate::services::registry;
use crate::services::replacement::{self, PolicySources};
use crate::services::settings::{load_settings, Settings};
use crate::services::storage;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Install,
    Update,
    Upgrade,
    Deploy,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Install => "install",
            Verb::Update => "update",
            Verb::Upgrade => "upgrade",
            Verb::Deploy => "deploy",
        }
    }

    fn bundle(self) -> DefaultBundle {
        match self {
            Verb::Install | Verb::Deploy => DefaultBundle::Install,
            Verb::Update | Verb::Upgrade => DefaultBundle::Update,
        }
    }

    fn manifest_mode(self) -> ManifestMode {
        match self {
            Verb::Install | Verb::Deploy => ManifestMode::Install,
            Verb::Update | Verb::Upgrade => ManifestMode::Update,
        }
    }

    fn migrates_policies(self) -> bool {
        matches!(self, Verb::Update | Verb::Upgrade)
    }
}

#[derive(Debug, Clone)]
pub struct SyncRequest<'a> {
    pub target: &'a Path,
    pub source: &'a Path,
    pub flags: &'a ModeFlags,
    pub touch_updated: bool,
}

pub fn install(req: &SyncRequest) -> anyhow::Result<LifecycleReport> {
    sync(Verb::Install, req)
}

pub fn update(req: &SyncRequest) -> anyhow::Result<LifecycleReport> {
    sync(Verb::Update, req)
}

pub fn upgrade(req: &SyncRequest) -> anyhow::Result<LifecycleReport> {
    sync(Verb::Upgrade, req)
}

pub fn deploy(req: &SyncRequest) -> anyhow::Result<LifecycleReport> {
    sync(Verb::Deploy, req)
}

fn ensure_target(target: &Path) -> Result<(), LifecycleError> {
    if target.is_dir() {
        Ok(())
    } else {
        Err(LifecycleError::MissingTarget(target.to_path_buf()))
    }
}

fn same_root(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

fn read_doc(path: &Path) -> anyhow::Result<Option<GovernanceDoc>> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading governance document {}", path.display()))?;
    Ok(Some(GovernanceDoc::parse(&text)))
}

fn sync(verb: Verb, req: &SyncRequest) -> anyhow::Result<LifecycleReport> {
    let (target, source) = (req.target, req.source);
    ensure_target(target)?;
    if !source.is_dir() {
        return Err(LifecycleError::SourceNotFound(source.to_path_buf()).into());
    }

    let settings = load_settings(target)?;
    let mut options = resolve_options(target, req.flags, &settings.install, verb.bundle())?;
    options.core_is_self = same_root(source, target);
    let prior = storage::load_manifest(target, true)?.unwrap_or_default();
    tracing::info!(
        verb = verb.as_str(),
        target = %target.display(),
        install_mode = ?options.install_mode,
        core_is_self = options.core_is_self,
        "starting lifecycle run"
    );

    let doc_before = read_doc(&target.join(GOVERNANCE_DOC))?;
    let replacements = if verb.migrates_policies() {
        replacement::load_replacements(source)
    } else {
        BTreeMap::new()
    };
    let snapshots = match &doc_before {
        Some(doc) => {
            let present: Vec<String> = replacements
                .keys()
                .filter(|id| doc.block(id).is_some())
                .cloned()
                .collect();
            replacement::snapshot_sources(target, &present)?
        }
        None => BTreeMap::new(),
    };

    let ignore_before = ignore_origin(target);
    let core = reconcile_core(verb, source, target, &options, &settings)?;
    let config = reconcile_config(source, target, &options)?;
    let ignore_changed = reconcile_ignore(source, target, &options)?;
    let docs = reconcile_docs(source, target, &options)?;
    let metadata = reconcile_metadata(
        verb,
        req,
        &options,
        &settings,
        doc_before.as_ref(),
        &replacements,
        &snapshots,
    )?;

    // Deploy into a bare target must not create the package directory.
    let has_package = target.join(PACKAGE_DIR).is_dir();
    if let Some(doc) = read_doc(&target.join(GOVERNANCE_DOC))?.filter(|_| has_package) {
        let entries = registry::build_entries(target, &doc, &settings.policy_state)?;
        registry::write_registry(target, &entries)?;
    }

    let mut manifest = prior.clone();
    manifest.updated_at = storage::now_timestamp();
    manifest.mode = verb.manifest_mode();
    manifest.installed.core = if options.core_is_self {
        Vec::new()
    } else {
        carry_forward(target, &core.written, &prior.installed.core)
    };
    let mut config_owned = config.written.clone();
    if ignore_changed.is_some() {
        config_owned.push(IGNORE_FILE.to_string());
    }
    manifest.installed.config = carry_forward(target, &config_owned, &prior.installed.config);
    record_backups(target, &mut manifest, &prior, &config.backups);
    if ignore_changed.is_some() && manifest.ignore_origin.is_none() {
        manifest.ignore_origin = ignore_before;
    }
    manifest.installed.docs = carry_forward(target, &docs.created, &prior.installed.docs);
    manifest.doc_blocks = carry_forward(target, &docs.blocks, &prior.doc_blocks)
        .into_iter()
        .filter(|rel| {
            std::fs::read_to_string(target.join(rel))
                .map(|t| blocks::has_block(&t))
                .unwrap_or(false)
        })
        .collect();
    manifest.options = Some(options.clone());

    let mut fresh = Vec::new();
    for message in &metadata.notifications {
        if manifest.notifications.iter().any(|n| &n.message == message) {
            continue;
        }
        storage::push_notification(&mut manifest, message.clone());
        fresh.push(message.clone());
    }
    let manifest_path = storage::write_manifest(target, &manifest)?;

    let mut written = core.written.clone();
    written.extend(config.written.iter().cloned());
    if ignore_changed == Some(true) {
        written.push(IGNORE_FILE.to_string());
    }
    written.extend(docs.written.iter().cloned());
    if metadata.changed && !written.iter().any(|p| p == GOVERNANCE_DOC) {
        written.push(GOVERNANCE_DOC.to_string());
    }
    written.extend(metadata.files.iter().cloned());

    let mut preserved = core.preserved.clone();
    preserved.extend(config.preserved.iter().cloned());
    preserved.extend(docs.preserved.iter().cloned());

    tracing::info!(
        verb = verb.as_str(),
        written = written.len(),
        preserved = preserved.len(),
        migrated = metadata.migrated.len(),
        removed = metadata.removed.len(),
        normalized = metadata.normalized.len(),
        "lifecycle run complete"
    );
    storage::audit(
        target,
        verb.as_str(),
        serde_json::json!({
            "source": source.display().to_string(),
            "written": written.len(),
            "preserved": preserved.len(),
            "backups": core.backups.len() + config.backups.len(),
            "migrated": metadata.migrated,
            "removed": metadata.removed,
            "normalized": metadata.normalized.len(),
        }),
    );

    Ok(LifecycleReport {
        verb: verb.as_str().to_string(),
        target: target.display().to_string(),
        manifest: manifest_path.display().to_string(),
        options: Some(options),
        written,
        preserved,
        doc_blocks: manifest.doc_blocks.clone(),
        migrated: metadata.migrated,
        removed_policies: metadata.removed,
        normalized: metadata.normalized,
        notifications: fresh,
    })
}

fn carry_forward(target: &Path, now: &[String], before: &[String]) -> Vec<String> {
    let mut out: BTreeSet<String> = now.iter().cloned().collect();
    out.extend(
        before
            .iter()
            .filter(|rel| target.join(rel).exists())
            .cloned(),
    );
    out.into_iter().collect()
}

/// Splits this run's backups into pre-install originals and copies of
/// framework content, keeping only entries whose backup file still exists.
fn record_backups(
    target: &Path,
    manifest: &mut Manifest,
    prior: &Manifest,
    backups: &BTreeMap<String, String>,
) {
    for (rel, backup) in backups {
        let owned = prior.installed.config.contains(rel) || prior.originals.contains_key(rel);
        if owned {
            manifest.installed.backups.push(backup.clone());
        } else {
            manifest.originals.insert(rel.clone(), backup.clone());
        }
    }
    manifest.originals.retain(|_, backup| target.join(backup.as_str()).is_file());
    let generated: BTreeSet<String> = manifest
        .installed
        .backups
        .drain(..)
        .filter(|backup| target.join(backup).is_file())
        .collect();
    manifest.installed.backups = generated.into_iter().collect();
}

fn ignore_origin(target: &Path) -> Option<IgnoreOrigin> {
    match std::fs::read_to_string(target.join(IGNORE_FILE)) {
        Ok(text) if blocks::has_ignore_block(&text) => None,
        Ok(text) => Some(IgnoreOrigin {
            existed: true,
            trailing_newline: text.ends_with('\n'),
        }),
        Err(_) => Some(IgnoreOrigin {
            existed: false,
            trailing_newline: true,
        }),
    }
}

fn preserve_set(options: &ResolvedOptions, settings: &Settings) -> Vec<String> {
    let mut keep = Vec::new();
    if options.preserve_custom {
        keep.push(CUSTOM_SCRIPTS_DIR.to_string());
        keep.push(CUSTOM_FIXERS_DIR.to_string());
    }
    if options.config_mode == AssetMode::Preserve {
        keep.push(SETTINGS_FILE.to_string());
    }
    for extra in &settings.preserve_paths {
        if !keep.contains(extra) {
            keep.push(extra.clone());
        }
    }
    keep
}

fn core_is_current(source: &Path, target: &Path) -> bool {
    if !target.join(PACKAGE_DIR).is_dir() {
        return false;
    }
    match (
        read_trimmed(&source.join(VERSION_FILE)),
        read_trimmed(&target.join(VERSION_FILE)),
    ) {
        (Some(src), Some(dst)) => src == dst,
        _ => false,
    }
}

fn reconcile_core(
    verb: Verb,
    source: &Path,
    target: &Path,
    options: &ResolvedOptions,
    settings: &Settings,
) -> anyhow::Result<InstallOutcome> {
    if verb == Verb::Deploy {
        return Ok(InstallOutcome::default());
    }
    if options.core_is_self {
        tracing::info!("source and target coincide; package directory left in place");
        return Ok(InstallOutcome::default());
    }
    if verb == Verb::Update && core_is_current(source, target) {
        tracing::info!("package directory already at source version");
        if options.config_mode == AssetMode::Overwrite {
            return reconcile::install_paths(
                source,
                target,
                &[SETTINGS_FILE.to_string()],
                false,
                &BTreeMap::new(),
            );
        }
        return Ok(InstallOutcome::default());
    }

    let keep = preserve_set(options, settings);
    let scratch = tempfile::TempDir::new().context("creating scratch directory for preserved paths")?;
    let saved = reconcile::backup_paths(target, &keep, scratch.path())?;
    let mut outcome = reconcile::install_paths(
        source,
        target,
        &[PACKAGE_DIR.to_string()],
        false,
        &BTreeMap::new(),
    )?;
    let restored = reconcile::restore_paths(scratch.path(), target, &saved)?;
    tracing::info!(
        preserved = restored.len(),
        missing = outcome.missing.len(),
        "package directory replaced"
    );
    outcome.preserved.extend(restored);
    Ok(outcome)
}

fn config_plan(options: &ResolvedOptions) -> Vec<(&'static str, bool)> {
    let mut plan = vec![(PRE_COMMIT_CONFIG, options.config_mode == AssetMode::Preserve)];
    for (path, mode) in [
        (LICENSE_FILE, options.license_mode),
        (ROOT_VERSION_FILE, options.version_mode),
        (PYPROJECT_FILE, options.pyproject_mode),
        (CI_WORKFLOW, options.ci_mode),
    ] {
        match mode {
            ResolvedOverride::Skip => tracing::debug!(path, "asset skipped by override"),
            ResolvedOverride::Preserve => plan.push((path, true)),
            ResolvedOverride::Overwrite => plan.push((path, false)),
        }
    }
    plan
}

fn reconcile_config(
    source: &Path,
    target: &Path,
    options: &ResolvedOptions,
) -> anyhow::Result<InstallOutcome> {
    let mut overrides = BTreeMap::new();
    if source.join(LICENSE_TEMPLATE).is_file() {
        overrides.insert(LICENSE_FILE.to_string(), LICENSE_TEMPLATE.to_string());
    }
    let mut outcome = InstallOutcome::default();
    for (path, skip_existing) in config_plan(options) {
        outcome.merge(reconcile::install_paths(
            source,
            target,
            &[path.to_string()],
            skip_existing,
            &overrides,
        )?);
    }
    tracing::info!(
        written = outcome.written.len(),
        preserved = outcome.preserved.len(),
        backups = outcome.backups.len(),
        "config assets reconciled"
    );
    Ok(outcome)
}

fn reconcile_ignore(
    source: &Path,
    target: &Path,
    options: &ResolvedOptions,
) -> anyhow::Result<Option<bool>> {
    let template_path = source.join(IGNORE_FILE);
    if !template_path.is_file() {
        return Ok(None);
    }
    let template = std::fs::read_to_string(&template_path)?;
    let path = target.join(IGNORE_FILE);
    let existing = if path.is_file() {
        Some(std::fs::read_to_string(&path)?)
    } else {
        None
    };
    if options.config_mode == AssetMode::Preserve
        && existing.as_deref().map(blocks::has_ignore_block).unwrap_or(false)
    {
        return Ok(Some(false));
    }
    let merged = blocks::merge_ignore(existing.as_deref(), &template);
    if existing.as_deref() == Some(merged.as_str()) {
        return Ok(Some(false));
    }
    std::fs::write(&path, merged)?;
    tracing::debug!(path = IGNORE_FILE, "ignore file merged");
    Ok(Some(true))
}

#[derive(Debug, Default)]
struct DocOutcome {
    created: Vec<String>,
    blocks: Vec<String>,
    written: Vec<String>,
    preserved: Vec<String>,
}

fn reconcile_docs(
    source: &Path,
    target: &Path,
    options: &ResolvedOptions,
) -> anyhow::Result<DocOutcome> {
    let mut out = DocOutcome::default();
    for rel in MANAGED_DOCS {
        let template_path = source.join(rel);
        if !template_path.is_file() {
            continue;
        }
        let path = target.join(rel);
        if !path.exists() {
            reconcile::copy_path(&template_path, &path)?;
            out.created.push(rel.to_string());
            out.written.push(rel.to_string());
            if blocks::has_block(&std::fs::read_to_string(&path)?) {
                out.blocks.push(rel.to_string());
            }
            continue;
        }

        let template = std::fs::read_to_string(&template_path)?;
        let Some(payload) = blocks::extract_block(&template) else {
            continue;
        };
        let text = std::fs::read_to_string(&path)?;
        if options.docs_mode == AssetMode::Preserve && blocks::has_block(&text) {
            out.preserved.push(rel.to_string());
            out.blocks.push(rel.to_string());
            continue;
        }
        let change = blocks::inject_block_file(&path, &payload)?;
        tracing::debug!(path = %rel, change = ?change, "managed block injected");
        if change != BlockChange::Unchanged {
            out.written.push(rel.to_string());
        }
        out.blocks.push(rel.to_string());
    }
    tracing::info!(
        created = out.created.len(),
        blocks = out.blocks.len(),
        "documents reconciled"
    );
    Ok(out)
}

#[derive(Debug, Default)]
struct MetadataOutcome {
    changed: bool,
    normalized: Vec<String>,
    migrated: Vec<String>,
    removed: Vec<String>,
    files: Vec<String>,
    notifications: Vec<String>,
}

fn reconcile_metadata(
    verb: Verb,
    req: &SyncRequest,
    options: &ResolvedOptions,
    settings: &Settings,
    doc_before: Option<&GovernanceDoc>,
    replacements: &BTreeMap<String, PolicyReplacement>,
    snapshots: &BTreeMap<String, PolicySources>,
) -> anyhow::Result<MetadataOutcome> {
    let mut out = MetadataOutcome::default();
    let path = req.target.join(GOVERNANCE_DOC);
    if !path.is_file() {
        return Ok(out);
    }
    let original = std::fs::read_to_string(&path)?;
    let mut doc = GovernanceDoc::parse(&original);
    let template = read_doc(&req.source.join(GOVERNANCE_DOC))?.unwrap_or_default();

    // Custom-owned sections survive a refreshed block; preserve mode also keeps stock metadata.
    if let Some(before) = doc_before {
        for section in before.sections() {
            let custom = section.block.first("custom").map(is_truthy).unwrap_or(false);
            if doc.block(&section.id).is_none() {
                if custom {
                    if let Some(text) = before.section_text(&section.id) {
                        doc.append_section(&text);
                    }
                }
            } else if custom || options.metadata_mode == AssetMode::Preserve {
                doc.set_block(&section.id, &section.block);
            }
        }
    }

    if options.metadata_mode == AssetMode::Overwrite {
        let mut stock = template.clone();
        for id in replacements.keys() {
            stock.remove_section(id);
        }
        let touched = overwrite_from_template(&mut doc, &stock);
        tracing::debug!(policies = touched.len(), "metadata overwritten from template");
    }

    if verb.migrates_policies() {
        let empty = GovernanceDoc::default();
        let outcome = replacement::apply_replacements(
            req.target,
            &mut doc,
            doc_before.unwrap_or(&empty),
            replacements,
            snapshots,
            &settings.policy_state,
        )?;
        out.migrated = outcome.migrated;
        out.removed = outcome.removed;
        out.files = outcome.files;
        out.notifications = outcome.notifications;

        if let Some(before) = doc_before {
            for id in replacement::detect_new_policies(&template, &before.ids(), replacements) {
                out.notifications
                    .push(format!("New stock policy available: `{}`.", id));
            }
        }
    }

    let schemas = SchemaSet::from_template(&template);
    out.normalized = normalize_doc(&mut doc, &schemas, req.touch_updated);

    let rendered = doc.render();
    if rendered != original {
        std::fs::write(&path, rendered)
            .with_context(|| format!("writing governance document {}", path.display()))?;
        out.changed = true;
    }
    tracing::info!(
        normalized = out.normalized.len(),
        migrated = out.migrated.len(),
        removed = out.removed.len(),
        "policy metadata reconciled"
    );
    Ok(out)
}

fn manifest_docs(manifest: &Manifest) -> BTreeSet<String> {
    manifest
        .doc_blocks
        .iter()
        .chain(manifest.installed.docs.iter())
        .cloned()
        .collect()
}

fn strip_docs(target: &Path, docs: &BTreeSet<String>) -> anyhow::Result<Vec<String>> {
    let mut stripped = Vec::new();
    for rel in docs {
        if blocks::strip_block_file(&target.join(rel))? {
            stripped.push(rel.clone());
        }
    }
    Ok(stripped)
}

/// Takes the managed section out of the ignore file. A file that existed before
/// install is never deleted and gets its original line ending back.
fn strip_ignore_file(
    target: &Path,
    origin: Option<IgnoreOrigin>,
    report: &mut RemovalReport,
) -> anyhow::Result<()> {
    let path = target.join(IGNORE_FILE);
    if !path.is_file() {
        return Ok(());
    }
    let text = std::fs::read_to_string(&path)?;
    if !blocks::has_ignore_block(&text) {
        return Ok(());
    }
    let existed = origin.map(|o| o.existed).unwrap_or(false);
    let mut rest = match blocks::strip_ignore(&text) {
        IgnoreStrip::Delete if !existed => {
            std::fs::remove_file(&path)?;
            report.removed.push(IGNORE_FILE.to_string());
            return Ok(());
        }
        IgnoreStrip::Delete => String::new(),
        IgnoreStrip::Keep(rest) => rest,
    };
    if origin.map(|o| !o.trailing_newline).unwrap_or(false) && rest.ends_with('\n') {
        rest.pop();
    }
    std::fs::write(&path, rest)?;
    report.stripped.push(IGNORE_FILE.to_string());
    Ok(())
}

pub fn uninstall(target: &Path, remove_docs: bool) -> anyhow::Result<RemovalReport> {
    ensure_target(target)?;
    let manifest = storage::load_manifest(target, true)?;
    let mut report = RemovalReport {
        verb: "uninstall".to_string(),
        target: target.display().to_string(),
        manifest_found: manifest.is_some(),
        ..Default::default()
    };

    let fallback = Manifest {
        installed: InstalledPaths {
            core: DEFAULT_UNINSTALL_CORE.iter().map(|s| s.to_string()).collect(),
            config: DEFAULT_UNINSTALL_CONFIG
                .iter()
                .map(|s| s.to_string())
                .chain(std::iter::once(IGNORE_FILE.to_string()))
                .collect(),
            ..Default::default()
        },
        doc_blocks: MANAGED_DOCS.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    let recorded = match &manifest {
        Some(m) => m,
        None => {
            tracing::warn!(target = %target.display(), "no manifest found; using default uninstall paths");
            &fallback
        }
    };
    let core_is_self = recorded
        .options
        .as_ref()
        .map(|o| o.core_is_self)
        .unwrap_or(false);
    let docs = manifest_docs(recorded);

    report.stripped = strip_docs(target, &docs)?;
    for rel in &docs {
        let owned = recorded.installed.docs.contains(rel);
        if (owned || remove_docs) && reconcile::remove_path(&target.join(rel))? {
            report.removed.push(rel.clone());
        }
    }

    if registry::remove_registry(target)? {
        report.removed.push(LOCAL_REGISTRY_DIR.to_string());
    }

    if core_is_self {
        tracing::info!("package directory belongs to this repository; left in place");
    } else {
        for rel in &recorded.installed.core {
            if reconcile::remove_path(&target.join(rel))? {
                report.removed.push(rel.clone());
            }
        }
    }

    for rel in &recorded.installed.config {
        if rel == IGNORE_FILE {
            strip_ignore_file(target, recorded.ignore_origin, &mut report)?;
            continue;
        }
        if reconcile::remove_path(&target.join(rel))? {
            report.removed.push(rel.clone());
        }
    }
    for backup in &recorded.installed.backups {
        if reconcile::remove_path(&target.join(backup))? {
            report.removed.push(backup.clone());
        }
    }
    for (rel, backup) in &recorded.originals {
        if reconcile::restore_backup(&target.join(rel), &target.join(backup))? {
            report.restored.push(rel.clone());
        }
    }

    storage::delete_manifest(target)?;
    reconcile::remove_path(&target.join(STATE_DIR))?;
    tracing::info!(
        removed = report.removed.len(),
        restored = report.restored.len(),
        stripped = report.stripped.len(),
        "uninstall complete"
    );
    Ok(report)
}

pub fn undeploy(target: &Path) -> anyhow::Result<RemovalReport> {
    ensure_target(target)?;
    let manifest = storage::load_manifest(target, true)?;
    let mut report = RemovalReport {
        verb: "undeploy".to_string(),
        target: target.display().to_string(),
        manifest_found: manifest.is_some(),
        ..Default::default()
    };

    let docs: BTreeSet<String> = match &manifest {
        Some(m) => manifest_docs(m),
        None => MANAGED_DOCS.iter().map(|s| s.to_string()).collect(),
    };
    report.stripped = strip_docs(target, &docs)?;
    if registry::remove_registry(target)? {
        report.removed.push(LOCAL_REGISTRY_DIR.to_string());
    }

    if let Some(mut manifest) = manifest {
        manifest.doc_blocks.clear();
        manifest.updated_at = storage::now_timestamp();
        if !report.stripped.is_empty() {
            storage::push_notification(
                &mut manifest,
                format!("Undeployed managed blocks from {}.", report.stripped.join(", ")),
            );
        }
        storage::write_manifest(target, &manifest)?;
    }
    storage::audit(
        target,
        "undeploy",
        serde_json::json!({ "stripped": report.stripped, "removed": report.removed }),
    );
    tracing::info!(stripped = report.stripped.len(), "undeploy complete");
    Ok(report)
}

pub fn status(target: &Path) -> anyhow::Result<Option<Manifest>> {
    ensure_target(target)?;
    storage::load_manifest(target, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::InstallMode;
    use crate::domain::constants::{BLOCK_BEGIN, BLOCK_END};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn source() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, VERSION_FILE, "1.0.0\n");
        write(root, SETTINGS_FILE, "install: {}\n");
        write(root, "covenant/core/policy_scripts/guard.py", "print('guard')\n");
        write(root, PRE_COMMIT_CONFIG, "repos: []\n");
        write(root, IGNORE_FILE, "__pycache__/\n");
        write(
            root,
            GOVERNANCE_DOC,
            &format!(
                "# Agents\n{}\n## Policy: Guard\n\n```policy-def\nid: guard\nstatus: active\nseverity: warning\nauto_fix: false\nupdated: false\napplies_to: *\nenforcement: active\nenabled: true\ncustom: false\n```\n\nGuard.\n\n---\n{}\n",
                BLOCK_BEGIN, BLOCK_END
            ),
        );
        tmp
    }

    fn request<'a>(target: &'a Path, source: &'a Path, flags: &'a ModeFlags) -> SyncRequest<'a> {
        SyncRequest {
            target,
            source,
            flags,
            touch_updated: true,
        }
    }

    #[test]
    fn install_into_empty_target_records_what_it_wrote() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let flags = ModeFlags::default();
        let report = install(&request(dst.path(), src.path(), &flags)).unwrap();

        let manifest = storage::load_manifest(dst.path(), false).unwrap().unwrap();
        assert_eq!(manifest.installed.core, vec![PACKAGE_DIR.to_string()]);
        assert_eq!(
            manifest.installed.config,
            vec![IGNORE_FILE.to_string(), PRE_COMMIT_CONFIG.to_string()]
        );
        assert_eq!(manifest.installed.docs, vec![GOVERNANCE_DOC.to_string()]);
        assert_eq!(manifest.doc_blocks, vec![GOVERNANCE_DOC.to_string()]);
        assert!(!report.options.unwrap().core_is_self);
        assert!(dst.path().join("covenant/registry/local/policy_registry.json").is_file());
    }

    #[test]
    fn deploy_leaves_package_directory_alone() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let flags = ModeFlags::default();
        deploy(&request(dst.path(), src.path(), &flags)).unwrap();
        assert!(!dst.path().join(PACKAGE_DIR).exists());
        assert!(dst.path().join(GOVERNANCE_DOC).is_file());
        let manifest = storage::load_manifest(dst.path(), false).unwrap().unwrap();
        assert!(manifest.installed.core.is_empty());
        assert_eq!(manifest.mode, ManifestMode::Install);

        undeploy(dst.path()).unwrap();
        assert!(!dst.path().join(PACKAGE_DIR).exists());
    }

    #[test]
    fn source_equal_to_target_marks_core_as_self() {
        let src = source();
        let flags = ModeFlags {
            install_mode: InstallMode::Existing,
            ..Default::default()
        };
        let report = install(&request(src.path(), src.path(), &flags)).unwrap();
        assert!(report.options.unwrap().core_is_self);
        let manifest = storage::load_manifest(src.path(), false).unwrap().unwrap();
        assert!(manifest.installed.core.is_empty());

        uninstall(src.path(), false).unwrap();
        assert!(src.path().join("covenant/core/policy_scripts/guard.py").is_file());
    }

    #[test]
    fn update_with_matching_version_skips_core_refresh() {
        let src = source();
        let dst = TempDir::new().unwrap();
        let flags = ModeFlags::default();
        install(&request(dst.path(), src.path(), &flags)).unwrap();
        write(dst.path(), "covenant/core/local_note.txt", "mine");

        update(&request(dst.path(), src.path(), &flags)).unwrap();
        assert!(dst.path().join("covenant/core/local_note.txt").is_file());

        upgrade(&request(dst.path(), src.path(), &flags)).unwrap();
        assert!(!dst.path().join("covenant/core/local_note.txt").exists());
        let manifest = storage::load_manifest(dst.path(), false).unwrap().unwrap();
        assert_eq!(manifest.mode, ManifestMode::Update);
    }

    #[test]
    fn missing_directories_are_typed_errors() {
        let src = source();
        let flags = ModeFlags::default();
        let gone = src.path().join("nope");
        let err = install(&request(&gone, src.path(), &flags)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LifecycleError>(),
            Some(LifecycleError::MissingTarget(_))
        ));
        let dst = TempDir::new().unwrap();
        let err = install(&request(dst.path(), &gone, &flags)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LifecycleError>(),
            Some(LifecycleError::SourceNotFound(_))
        ));
    }

    #[test]
    fn undeploy_strips_blocks_and_keeps_package() {
        let src = source();
        let dst = TempDir::new().unwrap();
        write(dst.path(), "README.md", "# Mine\n");
        write(
            src.path(),
            "README.md",
            &format!("# Readme\n{}\nmanaged\n{}\n", BLOCK_BEGIN, BLOCK_END),
        );
        let flags = ModeFlags::default();
        install(&request(dst.path(), src.path(), &flags)).unwrap();
        assert!(std::fs::read_to_string(dst.path().join("README.md")).unwrap().contains(BLOCK_BEGIN));

        let report = undeploy(dst.path()).unwrap();
        assert!(report.stripped.contains(&"README.md".to_string()));
        assert_eq!(std::fs::read_to_string(dst.path().join("README.md")).unwrap(), "# Mine\n");
        assert!(dst.path().join("covenant/core").is_dir());
        assert!(!dst.path().join(LOCAL_REGISTRY_DIR).exists());
        let manifest = storage::load_manifest(dst.path(), false).unwrap().unwrap();
        assert!(manifest.doc_blocks.is_empty());
        assert_eq!(manifest.notifications.len(), 1);
    }
}
