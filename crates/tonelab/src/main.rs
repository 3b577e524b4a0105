mod cli;
mod controls;
mod export;
mod inspect;
mod preview;
mod run;
mod settings;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::run(cli)
}
