use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Created,
    Replaced { backup: Option<PathBuf> },
    Unchanged,
    MissingSource,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub written: Vec<String>,
    pub unchanged: Vec<String>,
    pub preserved: Vec<String>,
    pub missing: Vec<String>,
    /// Written path -> the `_old` name its previous content was moved to.
    pub backups: BTreeMap<String, String>,
}

impl InstallOutcome {
    pub fn merge(&mut self, other: InstallOutcome) {
        self.written.extend(other.written);
        self.unchanged.extend(other.unchanged);
        self.preserved.extend(other.preserved);
        self.missing.extend(other.missing);
        self.backups.extend(other.backups);
    }
}

fn backup_candidate(path: &Path, n: usize) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let tag = if n == 1 {
        "_old".to_string()
    } else {
        format!("_old{}", n)
    };
    parent.join(format!("{}{}{}", stem, tag, suffix))
}

pub fn backup_name(path: &Path) -> PathBuf {
    let mut n = 1usize;
    loop {
        let candidate = backup_candidate(path, n);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

pub fn restore_backup(path: &Path, backup: &Path) -> anyhow::Result<bool> {
    if path.exists() || !backup.is_file() {
        return Ok(false);
    }
    std::fs::rename(backup, path)?;
    tracing::debug!(path = %path.display(), "restored pre-install content");
    Ok(true)
}

pub fn copy_dir_all(src: &Path, dst: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let to = dst.join(entry.file_name());
        if ty.is_dir() {
            copy_dir_all(&entry.path(), &to)?;
        } else {
            std::fs::copy(entry.path(), to)?;
        }
    }
    Ok(())
}

pub fn remove_path(path: &Path) -> anyhow::Result<bool> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
        Ok(true)
    } else if path.exists() {
        std::fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Copies a file or directory.
///
/// Directories are replaced wholesale: whatever was at `dst` is deleted.
/// Files never silently discard content: an existing, different `dst` is
/// renamed to its next free `_old` name before the new bytes land.
pub fn copy_path(src: &Path, dst: &Path) -> anyhow::Result<CopyOutcome> {
    if !src.exists() {
        return Ok(CopyOutcome::MissingSource);
    }
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if src.is_dir() {
        let existed = remove_path(dst)?;
        copy_dir_all(src, dst)?;
        return Ok(if existed {
            CopyOutcome::Replaced { backup: None }
        } else {
            CopyOutcome::Created
        });
    }

    if !dst.exists() {
        std::fs::copy(src, dst)?;
        return Ok(CopyOutcome::Created);
    }

    if dst.is_file() && std::fs::read(dst)? == std::fs::read(src)? {
        return Ok(CopyOutcome::Unchanged);
    }

    let backup = backup_name(dst);
    std::fs::rename(dst, &backup)?;
    std::fs::copy(src, dst)?;
    tracing::debug!(path = %dst.display(), backup = %backup.display(), "moved existing file aside");
    Ok(CopyOutcome::Replaced {
        backup: Some(backup),
    })
}

pub fn backup_paths(root: &Path, rel_paths: &[String], scratch: &Path) -> anyhow::Result<Vec<String>> {
    let mut saved = Vec::new();
    for rel in rel_paths {
        let from = root.join(rel);
        if !from.exists() {
            continue;
        }
        let to = scratch.join(rel);
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if from.is_dir() {
            copy_dir_all(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
        saved.push(rel.clone());
    }
    Ok(saved)
}

pub fn restore_paths(scratch: &Path, root: &Path, rel_paths: &[String]) -> anyhow::Result<Vec<String>> {
    let mut restored = Vec::new();
    for rel in rel_paths {
        let from = scratch.join(rel);
        if !from.exists() {
            continue;
        }
        let to = root.join(rel);
        remove_path(&to)?;
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if from.is_dir() {
            copy_dir_all(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
        restored.push(rel.clone());
    }
    Ok(restored)
}

pub fn install_paths(
    source_root: &Path,
    target_root: &Path,
    rel_paths: &[String],
    skip_existing: bool,
    overrides: &BTreeMap<String, String>,
) -> anyhow::Result<InstallOutcome> {
    let mut out = InstallOutcome::default();
    for rel in rel_paths {
        let src = match overrides.get(rel) {
            Some(alt) => source_root.join(alt),
            None => source_root.join(rel),
        };
        let dst = target_root.join(rel);
        if skip_existing && dst.exists() {
            tracing::debug!(path = %rel, "preserving existing asset");
            out.preserved.push(rel.clone());
            continue;
        }
        match copy_path(&src, &dst)? {
            CopyOutcome::MissingSource => {
                tracing::debug!(path = %rel, "source asset absent, skipping");
                out.missing.push(rel.clone());
            }
            CopyOutcome::Replaced {
                backup: Some(backup),
            } => {
                let backup = backup.strip_prefix(target_root).unwrap_or(&backup);
                out.backups
                    .insert(rel.clone(), backup.to_string_lossy().replace('\\', "/"));
                out.written.push(rel.clone());
            }
            CopyOutcome::Unchanged => out.unchanged.push(rel.clone()),
            _ => out.written.push(rel.clone()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn overwriting_a_file_keeps_numbered_backups() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.yaml");
        let dst = tmp.path().join("target/config.yaml");
        std::fs::create_dir_all(dst.parent().unwrap()).unwrap();
        std::fs::write(&dst, "mine: 1\n").unwrap();

        std::fs::write(&src, "theirs: 1\n").unwrap();
        copy_path(&src, &dst).unwrap();
        std::fs::write(&src, "theirs: 2\n").unwrap();
        copy_path(&src, &dst).unwrap();

        let dir = dst.parent().unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("config_old.yaml")).unwrap(), "mine: 1\n");
        assert_eq!(std::fs::read_to_string(dir.join("config_old2.yaml")).unwrap(), "theirs: 1\n");
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "theirs: 2\n");
    }

    #[test]
    fn named_backup_comes_back_only_once_the_path_is_gone() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        let backup = tmp.path().join("config_old2.yaml");
        std::fs::write(tmp.path().join("config_old.yaml"), "framework v1").unwrap();
        std::fs::write(&backup, "original").unwrap();
        std::fs::write(&path, "framework v2").unwrap();

        assert!(!restore_backup(&path, &backup).unwrap());
        std::fs::remove_file(&path).unwrap();
        assert!(restore_backup(&path, &backup).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
        assert!(!backup.exists());
        assert!(tmp.path().join("config_old.yaml").exists());
        assert!(!restore_backup(&path, &backup).unwrap());
    }

    #[test]
    fn identical_file_is_left_untouched() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        let dst = tmp.path().join("b.txt");
        std::fs::write(&src, "same").unwrap();
        std::fs::write(&dst, "same").unwrap();
        assert_eq!(copy_path(&src, &dst).unwrap(), CopyOutcome::Unchanged);
        assert!(!tmp.path().join("b_old.txt").exists());
    }

    #[test]
    fn extensionless_and_dotfiles_get_suffix_appended() {
        assert_eq!(backup_name(Path::new("/x/LICENSE")), PathBuf::from("/x/LICENSE_old"));
        assert_eq!(
            backup_name(Path::new("/x/.gitignore")),
            PathBuf::from("/x/.gitignore_old")
        );
    }

    #[test]
    fn directory_copy_is_destructive() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src/pkg");
        let dst = tmp.path().join("dst/pkg");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(src.join("new.py"), "new").unwrap();
        std::fs::write(dst.join("stale.py"), "stale").unwrap();

        let outcome = copy_path(&src, &dst).unwrap();
        assert_eq!(outcome, CopyOutcome::Replaced { backup: None });
        assert!(dst.join("new.py").exists());
        assert!(!dst.join("stale.py").exists());
    }

    #[test]
    fn backup_and_restore_survive_directory_replace() {
        let tmp = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let root = tmp.path().join("repo");
        let pkg = root.join("pkg");
        std::fs::create_dir_all(pkg.join("custom")).unwrap();
        std::fs::write(pkg.join("custom/mine.py"), "mine").unwrap();
        std::fs::write(pkg.join("config.yaml"), "local: true\n").unwrap();

        let keep = vec!["pkg/custom".to_string(), "pkg/config.yaml".to_string()];
        let saved = backup_paths(&root, &keep, scratch.path()).unwrap();
        assert_eq!(saved, keep);

        let fresh = tmp.path().join("fresh");
        std::fs::create_dir_all(&fresh).unwrap();
        std::fs::write(fresh.join("config.yaml"), "local: false\n").unwrap();
        copy_path(&fresh, &pkg).unwrap();
        assert!(!pkg.join("custom").exists());

        restore_paths(scratch.path(), &root, &keep).unwrap();
        assert_eq!(std::fs::read_to_string(pkg.join("custom/mine.py")).unwrap(), "mine");
        assert_eq!(std::fs::read_to_string(pkg.join("config.yaml")).unwrap(), "local: true\n");
    }

    #[test]
    fn install_paths_honours_skip_existing_overrides_and_missing_sources() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        let target = tmp.path().join("target");
        std::fs::create_dir_all(source.join("templates")).unwrap();
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(source.join("templates/LICENSE"), "MIT").unwrap();
        std::fs::write(source.join("VERSION"), "1.0.0\n").unwrap();
        std::fs::write(target.join("VERSION"), "0.1.0\n").unwrap();

        let mut overrides = BTreeMap::new();
        overrides.insert("LICENSE".to_string(), "templates/LICENSE".to_string());
        let paths = vec![
            "LICENSE".to_string(),
            "VERSION".to_string(),
            "pyproject.toml".to_string(),
        ];
        let out = install_paths(&source, &target, &paths, true, &overrides).unwrap();

        assert_eq!(out.written, vec!["LICENSE".to_string()]);
        assert_eq!(out.preserved, vec!["VERSION".to_string()]);
        assert_eq!(out.missing, vec!["pyproject.toml".to_string()]);
        assert_eq!(std::fs::read_to_string(target.join("LICENSE")).unwrap(), "MIT");
        assert_eq!(std::fs::read_to_string(target.join("VERSION")).unwrap(), "0.1.0\n");

        let again = install_paths(&source, &target, &paths, false, &overrides).unwrap();
        assert_eq!(again.unchanged, vec!["LICENSE".to_string()]);
        assert_eq!(again.written, vec!["VERSION".to_string()]);
        assert_eq!(
            again.backups.get("VERSION").map(String::as_str),
            Some("VERSION_old")
        );
    }
}
