mod cli;
mod defaults;
mod run;
mod watch;
mod window;

use anyhow::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    run::initialise_tracing();
    run::run(args)
}
