//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep manifest/options/report structs in one place.
//! - Avoid cyclic imports between services.
//! - Make manifest and `--json` schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — manifest, resolved options, policy replacement and report structs.
//! - `constants.rs` — repo-relative layout of the framework inside a target.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem side effects.
//!
//! ## Compatibility note
//! The manifest is the only record uninstall/undeploy can rely on.
//! Keep schema-impacting changes synchronized with `docs/contracts/*`.

pub mod constants;
pub mod models;
