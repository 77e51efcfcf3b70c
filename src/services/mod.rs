//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `lifecycle.rs` — install/update/upgrade/deploy/uninstall/undeploy orchestration.
//! - `modes.rs` — install-mode detection and mode/override resolution.
//! - `reconcile.rs` — copy/backup/restore primitives for files and directories.
//! - `blocks.rs` — managed block injection/stripping and ignore-file merge.
//! - `policy_doc.rs` — governance document and metadata block parser/renderer.
//! - `replacement.rs` — replaced-policy migration/removal and source snapshots.
//! - `normalize.rs` — metadata schema, defaults and legacy selector migration.
//! - `registry.rs` — generated local policy registry.
//! - `settings.rs` — package settings file (stored defaults, policy state).
//! - `storage.rs` — manifest persistence + audit log.
//! - `telemetry.rs` — tracing subscriber setup.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers where possible.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod blocks;
pub mod lifecycle;
pub mod modes;
pub mod normalize;
pub mod output;
pub mod policy_doc;
pub mod reconcile;
pub mod registry;
pub mod replacement;
pub mod settings;
pub mod storage;
pub mod telemetry;
