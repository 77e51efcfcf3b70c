use std::path::PathBuf;

/// Failures callers may want to match on; everything else travels as `anyhow::Error`.
#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("unsupported value `{value}` for option `{option}` (expected one of: {expected})")]
    UnsupportedOptionValue {
        option: String,
        value: String,
        expected: &'static str,
    },
    #[error("manifest at {path} is unreadable: {reason}")]
    ManifestParse { path: PathBuf, reason: String },
    #[error("target directory does not exist: {0}")]
    MissingTarget(PathBuf),
    #[error("framework source root does not exist: {0}")]
    SourceNotFound(PathBuf),
    #[error("settings file {path} is invalid: {reason}")]
    Settings { path: PathBuf, reason: String },
}
