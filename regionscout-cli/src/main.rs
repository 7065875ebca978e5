//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use regionscout_cli::{CliError, init_logging};

fn main() {
    if let Err(err) = init_logging() {
        eprintln!("regionscout: logging disabled: {err}");
    }
    match regionscout_cli::run() {
        Ok(()) => {}
        // Help and version requests exit through clap with their own status.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("regionscout: {:?}", eyre::Report::new(err));
            std::process::exit(1);
        }
    }
}
