mod bindings;
mod cli;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Export(args)) => run::export(args),
        Some(Command::Config(config_cmd)) => match config_cmd.action {
            ConfigAction::Check { file } => run::check_config(&file),
        },
        None => run::run(cli.run),
    }
}
