#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const BEGIN: &str = "<!-- COVENANT:BEGIN -->";
pub const END: &str = "<!-- COVENANT:END -->";

pub struct TestEnv {
    _tmp: TempDir,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let source = make_fixture_source(tmp.path());
        let target = tmp.path().join("target");
        fs::create_dir_all(&target).expect("create target");
        Self {
            _tmp: tmp,
            source,
            target,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("covenant");
        cmd.env("COVENANT_LOG", "covenant=warn")
            .env_remove("COVENANT_SOURCE");
        cmd
    }

    pub fn target_str(&self) -> &str {
        self.target.to_str().expect("target path utf8")
    }

    pub fn source_str(&self) -> &str {
        self.source.to_str().expect("source path utf8")
    }

    /// Runs a reconciling verb (`install`, `update`, ...) against the fixture pair.
    pub fn sync_json(&self, verb: &str, flags: &[&str]) -> Value {
        let mut args = vec![verb, self.target_str(), "--source", self.source_str()];
        args.extend_from_slice(flags);
        self.run_json(&args)
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn write_target(&self, rel: &str, body: &str) {
        write(&self.target, rel, body);
    }

    pub fn write_source(&self, rel: &str, body: &str) {
        write(&self.source, rel, body);
    }

    pub fn read_target(&self, rel: &str) -> String {
        fs::read_to_string(self.target.join(rel)).unwrap_or_else(|_| panic!("read {}", rel))
    }

    pub fn manifest(&self) -> Value {
        let raw = fs::read_to_string(self.target.join(".covenant/manifest.json")).expect("manifest");
        serde_json::from_str(&raw).expect("manifest json")
    }
}

pub fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    fs::write(path, body).expect("write fixture file");
}

/// Every file under `root` with its bytes; the audit log is left out.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out.remove(".covenant/audit.jsonl");
    out
}

fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            walk(root, &path, out);
        } else {
            let rel = path
                .strip_prefix(root)
                .expect("under root")
                .to_string_lossy()
                .replace('\\', "/");
            out.insert(rel, fs::read(&path).expect("read file"));
        }
    }
}

pub fn policy_section(id: &str, enabled: bool) -> String {
    format!(
        "## Policy: {id}\n\n```policy-def\nid: {id}\nstatus: active\nseverity: warning\nauto_fix: false\nupdated: false\napplies_to: *\nenforcement: active\nenabled: {enabled}\ncustom: false\n```\n\nChecks {id}.\n\n---\n"
    )
}

pub fn governance_doc(sections: &[String]) -> String {
    format!(
        "# Agents\n{}\n## Policy Definitions\n\n---\n\n{}{}\n",
        BEGIN,
        sections.join("\n"),
        END
    )
}

fn make_fixture_source(base: &Path) -> PathBuf {
    let source = base.join("source");
    write(&source, "covenant/VERSION", "2.0.0\n");
    write(&source, "covenant/config.yaml", "preserve_paths: []\n");
    write(
        &source,
        "covenant/core/policy_scripts/new_policy.py",
        "def check():\n    return 'new'\n",
    );
    write(
        &source,
        "covenant/core/policy_scripts/guard.py",
        "def check():\n    return 'guard'\n",
    );
    write(&source, "covenant/templates/LICENSE", "MIT License\n");
    write(
        &source,
        "covenant/registry/policy_replacements.yaml",
        "old-policy:\n  replaced_by: new-policy\n  note: merged into new-policy\n",
    );
    write(
        &source,
        "AGENTS.md",
        &governance_doc(&[policy_section("guard", true), policy_section("new-policy", true)]),
    );
    write(
        &source,
        "README.md",
        &format!("# Covenant\n{}\nThis repository is governed by covenant.\n{}\n", BEGIN, END),
    );
    write(&source, ".pre-commit-config.yaml", "repos: []\n");
    write(&source, ".gitignore", "__pycache__/\n.covenant/\n");
    source
}
