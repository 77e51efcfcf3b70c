/// Framework package directory inside a target repository.
pub const PACKAGE_DIR: &str = "covenant";

pub const SETTINGS_FILE: &str = "covenant/config.yaml";
pub const VERSION_FILE: &str = "covenant/VERSION";
pub const CUSTOM_SCRIPTS_DIR: &str = "covenant/custom/policy_scripts";
pub const CUSTOM_FIXERS_DIR: &str = "covenant/custom/fixers";
pub const CORE_SCRIPTS_DIR: &str = "covenant/core/policy_scripts";
pub const CORE_FIXERS_DIR: &str = "covenant/core/fixers";
pub const REPLACEMENTS_FILE: &str = "covenant/registry/policy_replacements.yaml";
pub const LOCAL_REGISTRY_DIR: &str = "covenant/registry/local";
pub const POLICY_REGISTRY_FILE: &str = "covenant/registry/local/policy_registry.json";

/// Engine state directory; removed entirely by uninstall.
pub const STATE_DIR: &str = ".covenant";
pub const MANIFEST_PATH: &str = ".covenant/manifest.json";
pub const LEGACY_MANIFEST_PATHS: &[&str] = &["covenant/registry/manifest.json"];
pub const AUDIT_LOG_PATH: &str = ".covenant/audit.jsonl";

pub const GOVERNANCE_DOC: &str = "AGENTS.md";
pub const MANAGED_DOCS: &[&str] = &[
    "AGENTS.md",
    "README.md",
    "CHANGELOG.md",
    "CONTRIBUTING.md",
];

pub const PRE_COMMIT_CONFIG: &str = ".pre-commit-config.yaml";
pub const IGNORE_FILE: &str = ".gitignore";
pub const LICENSE_FILE: &str = "LICENSE";
pub const LICENSE_TEMPLATE: &str = "covenant/templates/LICENSE";
pub const ROOT_VERSION_FILE: &str = "VERSION";
pub const PYPROJECT_FILE: &str = "pyproject.toml";
pub const CI_WORKFLOW: &str = ".github/workflows/covenant.yml";

/// Paths uninstall falls back to when no manifest exists.
pub const DEFAULT_UNINSTALL_CORE: &[&str] = &["covenant"];
pub const DEFAULT_UNINSTALL_CONFIG: &[&str] =
    &[".pre-commit-config.yaml", ".github/workflows/covenant.yml"];

pub const BLOCK_BEGIN: &str = "<!-- COVENANT:BEGIN -->";
pub const BLOCK_END: &str = "<!-- COVENANT:END -->";
pub const IGNORE_BEGIN: &str = "# COVENANT:BEGIN";
pub const IGNORE_END: &str = "# COVENANT:END";
pub const IGNORE_USER_BEGIN: &str = "# COVENANT:USER:BEGIN";
pub const IGNORE_USER_END: &str = "# COVENANT:USER:END";

/// Fence info string that opens a policy metadata block.
pub const POLICY_FENCE: &str = "```policy-def";
