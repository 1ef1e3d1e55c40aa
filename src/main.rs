use anyhow::Result;
use clap::Parser;
use submission_export::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_silent = args.silent;
    logging::init_logging(args.verbose, is_silent);

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if is_silent {
                eprintln!("{:#}", e);
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
