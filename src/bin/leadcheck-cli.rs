#[path = "leadcheck-cli/args.rs"]
mod args;
#[path = "leadcheck-cli/input.rs"]
mod input;
#[path = "leadcheck-cli/output.rs"]
mod output;

use std::io;

use anyhow::{Context, Result};
use colored::Colorize;
use leadcheck_lib::BulkVerifier;

use crate::args::Cli;

const FILE_NOT_FOUND: &str = "The specified file was not found. Please try again.";

fn main() -> Result<()> {
    let cli = Cli::parse();
    output::init_tracing(cli.verbose);

    let options = cli.verify_options()?;
    let addresses = match input::collect(&cli) {
        Ok(addresses) => addresses,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if cli.no_color {
                println!("{FILE_NOT_FOUND}");
            } else {
                println!("{}", FILE_NOT_FOUND.red());
            }
            std::process::exit(1);
        }
        Err(err) => return Err(err).context("read email leads"),
    };

    let results = BulkVerifier::new(options)
        .verify_all(&addresses)
        .context("set up DNS resolution")?;

    output::write_valid_file(&results, &cli.valid_out)?;
    output::write_reports(&results, &cli)?;

    // codes de sortie : 0 tout accepté, 2 au moins un rejet, 1 fatal
    if output::any_rejected(&results) {
        std::process::exit(2);
    }
    Ok(())
}
