use crate::*;

fn run_sync(json: bool, verb: Verb, args: &SyncArgs) -> anyhow::Result<()> {
    let req = SyncRequest {
        target: &args.target,
        source: &args.source,
        flags: &args.modes,
        touch_updated: !args.no_touch_updated,
    };
    let report = match verb {
        Verb::Install => install(&req)?,
        Verb::Update => update(&req)?,
        Verb::Upgrade => upgrade(&req)?,
        Verb::Deploy => deploy(&req)?,
    };
    print_one(json, report, lifecycle_text)
}

pub fn handle_lifecycle_commands(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Install(args) => run_sync(cli.json, Verb::Install, args)?,
        Commands::Update(args) => run_sync(cli.json, Verb::Update, args)?,
        Commands::Upgrade(args) => run_sync(cli.json, Verb::Upgrade, args)?,
        Commands::Deploy(args) => run_sync(cli.json, Verb::Deploy, args)?,
        Commands::Uninstall {
            target,
            remove_docs,
        } => {
            let report = uninstall(target, *remove_docs)?;
            print_one(cli.json, report, removal_text)?;
        }
        Commands::Undeploy { target } => {
            let report = undeploy(target)?;
            print_one(cli.json, report, removal_text)?;
        }
        _ => {}
    }
    Ok(())
}
