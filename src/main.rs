//! tplserve CLI entry point
//!
//! Parses the command line, runs the selected command and renders any error
//! with context and suggestions before exiting non-zero.

use anyhow::Result;
use clap::Parser;
use tplserve::cli;
use tplserve::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
