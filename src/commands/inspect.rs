use crate::*;

pub fn handle_inspect_commands(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Status { target } = &cli.command {
        let manifest = status(target)?;
        print_one(cli.json, manifest, manifest_text)?;
    }
    Ok(())
}
