//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `lifecycle.rs` — install/update/upgrade/deploy/uninstall/undeploy.
//! - `inspect.rs` — status.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Keep behavior and output schema stable.

pub mod inspect;
pub mod lifecycle;

pub use inspect::handle_inspect_commands;
pub use lifecycle::handle_lifecycle_commands;
