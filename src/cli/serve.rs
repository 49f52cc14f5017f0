//! Serve the document root over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use super::common::{build_dispatcher, load_config};
use crate::server;

#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Document root (overrides `root` from the config file)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Never check sources for changes
    #[arg(long)]
    pub production: bool,
}

impl ServeCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let mut config = load_config(config_path, self.root).await?;
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if self.production {
            config.development = false;
        }

        let addr: SocketAddr = config
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", config.listen))?;
        let dispatcher = Arc::new(build_dispatcher(&config)?);

        server::serve(dispatcher, addr, server::ctrl_c()).await
    }
}
