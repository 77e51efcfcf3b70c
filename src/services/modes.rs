use crate::cli::{AssetMode, InstallMode, ModeFlags, OverrideMode};
use crate::domain::constants::PACKAGE_DIR;
use crate::domain::models::{ResolvedOptions, ResolvedOverride, TargetState};
use crate::error::LifecycleError;
use crate::services::settings::InstallDefaults;
use crate::services::storage;
use std::path::Path;

const ASSET_MODES: &str = "preserve, overwrite";
const OVERRIDE_MODES: &str = "inherit, preserve, overwrite, skip";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultBundle {
    Install,
    Update,
}

pub fn detect_install_mode(target: &Path, requested: InstallMode) -> TargetState {
    match requested {
        InstallMode::Empty => TargetState::Empty,
        InstallMode::Existing => TargetState::Existing,
        InstallMode::Auto => {
            let has_manifest = matches!(storage::load_manifest(target, true), Ok(Some(_)))
                || storage::manifest_path(target).exists();
            if has_manifest || target.join(PACKAGE_DIR).is_dir() {
                TargetState::Existing
            } else {
                TargetState::Empty
            }
        }
    }
}

pub fn parse_asset_mode(option: &str, raw: &str) -> Result<AssetMode, LifecycleError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "preserve" => Ok(AssetMode::Preserve),
        "overwrite" => Ok(AssetMode::Overwrite),
        _ => Err(LifecycleError::UnsupportedOptionValue {
            option: option.to_string(),
            value: raw.to_string(),
            expected: ASSET_MODES,
        }),
    }
}

pub fn parse_override_mode(option: &str, raw: &str) -> Result<OverrideMode, LifecycleError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "inherit" => Ok(OverrideMode::Inherit),
        "preserve" => Ok(OverrideMode::Preserve),
        "overwrite" => Ok(OverrideMode::Overwrite),
        "skip" => Ok(OverrideMode::Skip),
        _ => Err(LifecycleError::UnsupportedOptionValue {
            option: option.to_string(),
            value: raw.to_string(),
            expected: OVERRIDE_MODES,
        }),
    }
}

pub fn resolve_override(mode: OverrideMode, owner: AssetMode) -> ResolvedOverride {
    match mode {
        OverrideMode::Inherit => owner.into(),
        OverrideMode::Preserve => ResolvedOverride::Preserve,
        OverrideMode::Overwrite => ResolvedOverride::Overwrite,
        OverrideMode::Skip => ResolvedOverride::Skip,
    }
}

fn pick_asset(
    option: &str,
    flag: Option<AssetMode>,
    stored: Option<&String>,
    fallback: AssetMode,
) -> Result<AssetMode, LifecycleError> {
    if let Some(mode) = flag {
        return Ok(mode);
    }
    match stored {
        Some(raw) => parse_asset_mode(option, raw),
        None => Ok(fallback),
    }
}

fn pick_override(
    option: &str,
    flag: Option<OverrideMode>,
    stored: Option<&String>,
) -> Result<OverrideMode, LifecycleError> {
    if let Some(mode) = flag {
        return Ok(mode);
    }
    match stored {
        Some(raw) => parse_override_mode(option, raw),
        None => Ok(OverrideMode::Inherit),
    }
}

/// Resolves CLI flags over stored defaults over the verb's default bundle.
///
/// Every stored value is validated before anything is returned, so a bad
/// settings file aborts the run before a single file is touched.
pub fn resolve_options(
    target: &Path,
    flags: &ModeFlags,
    stored: &InstallDefaults,
    bundle: DefaultBundle,
) -> Result<ResolvedOptions, LifecycleError> {
    let install_mode = detect_install_mode(target, flags.install_mode);
    let fallback = match (bundle, install_mode) {
        (DefaultBundle::Install, TargetState::Empty) => AssetMode::Overwrite,
        _ => AssetMode::Preserve,
    };

    let docs_mode = pick_asset("docs_mode", flags.docs_mode, stored.docs_mode.as_ref(), fallback)?;
    let config_mode = pick_asset(
        "config_mode",
        flags.config_mode,
        stored.config_mode.as_ref(),
        fallback,
    )?;
    let metadata_mode = pick_asset(
        "metadata_mode",
        flags.metadata_mode,
        stored.metadata_mode.as_ref(),
        fallback,
    )?;

    let license = pick_override("license_mode", flags.license_mode, stored.license_mode.as_ref())?;
    let version = pick_override("version_mode", flags.version_mode, stored.version_mode.as_ref())?;
    let pyproject = pick_override(
        "pyproject_mode",
        flags.pyproject_mode,
        stored.pyproject_mode.as_ref(),
    )?;
    let ci = pick_override("ci_mode", flags.ci_mode, stored.ci_mode.as_ref())?;

    let preserve_custom = flags
        .preserve_custom
        .or(stored.preserve_custom)
        .unwrap_or(install_mode == TargetState::Existing);

    Ok(ResolvedOptions {
        install_mode,
        docs_mode,
        config_mode,
        metadata_mode,
        license_mode: resolve_override(license, docs_mode),
        version_mode: resolve_override(version, config_mode),
        pyproject_mode: resolve_override(pyproject, config_mode),
        ci_mode: resolve_override(ci, config_mode),
        preserve_custom,
        core_is_self: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn auto_on_bare_target_is_empty_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let opts = resolve_options(
            tmp.path(),
            &ModeFlags::default(),
            &InstallDefaults::default(),
            DefaultBundle::Install,
        )
        .unwrap();
        assert_eq!(opts.install_mode, TargetState::Empty);
        assert_eq!(opts.docs_mode, AssetMode::Overwrite);
        assert_eq!(opts.config_mode, AssetMode::Overwrite);
        assert_eq!(opts.metadata_mode, AssetMode::Overwrite);
        assert_eq!(opts.license_mode, ResolvedOverride::Overwrite);
        assert!(!opts.preserve_custom);
    }

    #[test]
    fn package_dir_makes_target_existing() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(PACKAGE_DIR)).unwrap();
        let opts = resolve_options(
            tmp.path(),
            &ModeFlags::default(),
            &InstallDefaults::default(),
            DefaultBundle::Install,
        )
        .unwrap();
        assert_eq!(opts.install_mode, TargetState::Existing);
        assert_eq!(opts.docs_mode, AssetMode::Preserve);
        assert!(opts.preserve_custom);
    }

    #[test]
    fn update_bundle_preserves_even_on_empty_target() {
        let tmp = TempDir::new().unwrap();
        let opts = resolve_options(
            tmp.path(),
            &ModeFlags::default(),
            &InstallDefaults::default(),
            DefaultBundle::Update,
        )
        .unwrap();
        assert_eq!(opts.install_mode, TargetState::Empty);
        assert_eq!(opts.config_mode, AssetMode::Preserve);
    }

    #[test]
    fn explicit_flags_win_and_inherit_follows_owner() {
        let tmp = TempDir::new().unwrap();
        let flags = ModeFlags {
            install_mode: InstallMode::Existing,
            config_mode: Some(AssetMode::Overwrite),
            version_mode: Some(OverrideMode::Inherit),
            pyproject_mode: Some(OverrideMode::Skip),
            license_mode: Some(OverrideMode::Overwrite),
            ..Default::default()
        };
        let opts = resolve_options(
            tmp.path(),
            &flags,
            &InstallDefaults::default(),
            DefaultBundle::Install,
        )
        .unwrap();
        assert_eq!(opts.docs_mode, AssetMode::Preserve);
        assert_eq!(opts.version_mode, ResolvedOverride::Overwrite);
        assert_eq!(opts.ci_mode, ResolvedOverride::Overwrite);
        assert_eq!(opts.pyproject_mode, ResolvedOverride::Skip);
        assert_eq!(opts.license_mode, ResolvedOverride::Overwrite);
    }

    #[test]
    fn stored_defaults_sit_between_flags_and_bundle() {
        let tmp = TempDir::new().unwrap();
        let stored = InstallDefaults {
            docs_mode: Some("preserve".to_string()),
            ci_mode: Some("skip".to_string()),
            ..Default::default()
        };
        let flags = ModeFlags {
            install_mode: InstallMode::Empty,
            ..Default::default()
        };
        let opts = resolve_options(tmp.path(), &flags, &stored, DefaultBundle::Install).unwrap();
        assert_eq!(opts.docs_mode, AssetMode::Preserve);
        assert_eq!(opts.config_mode, AssetMode::Overwrite);
        assert_eq!(opts.ci_mode, ResolvedOverride::Skip);
    }

    #[test]
    fn unsupported_stored_value_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let stored = InstallDefaults {
            license_mode: Some("sometimes".to_string()),
            ..Default::default()
        };
        let err = resolve_options(
            tmp.path(),
            &ModeFlags::default(),
            &stored,
            DefaultBundle::Install,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::UnsupportedOptionValue { ref option, .. } if option == "license_mode"
        ));
    }
}
