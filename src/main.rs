use clap::Parser;

mod cli;
mod commands;
mod domain;
mod error;
mod services;

pub use cli::{Cli, Commands, SyncArgs};
pub use services::lifecycle::{
    deploy, install, status, undeploy, uninstall, update, upgrade, SyncRequest, Verb,
};
pub use services::output::{lifecycle_text, manifest_text, print_one, removal_text};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    services::telemetry::init_tracing();

    match &cli.command {
        Commands::Status { .. } => commands::handle_inspect_commands(&cli)?,
        _ => commands::handle_lifecycle_commands(&cli)?,
    }
    Ok(())
}
