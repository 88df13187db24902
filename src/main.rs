use anyhow::Result;
use clap::Parser;
use tix_reshape::cli;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        if tracing::dispatcher::has_been_set() {
            error!("{:#}", err);
        } else {
            // Failed before logging was initialised, e.g. on a bad config file.
            eprintln!("error: {:#}", err);
        }
        std::process::exit(1);
    }
    Ok(())
}
