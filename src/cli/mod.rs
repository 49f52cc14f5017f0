//! Command-line interface for tplserve.
//!
//! # Commands
//!
//! - `serve` - serve the document root over HTTP
//! - `render` - render one request URI to stdout
//! - `precompile` - compile every template without executing it
//! - `stats` - show the effective configuration and discovered templates
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only
//! - `--config` / `-c` - configuration file (default `~/.tplserve/config.toml`)
//!
//! Without `--verbose` or `--quiet`, `RUST_LOG` selects the log filter and
//! falls back to `info`. Logs go to stderr so rendered output on stdout stays
//! clean.
//!
//! ```bash
//! tplserve serve --root site --listen 0.0.0.0:8080
//! tplserve render '/index.html?name=world' --root site
//! tplserve precompile --root site --jobs 8
//! RUST_LOG=dispatch=trace tplserve render /index.html
//! ```

pub mod common;
mod precompile;
mod render;
mod serve;
mod stats;

pub use precompile::{PrecompileCommand, PrecompileReport, precompile_all};
pub use render::RenderCommand;
pub use serve::ServeCommand;
pub use stats::{SiteStats, StatsCommand};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests and embedders can run commands with an
/// explicit configuration.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` leaves `RUST_LOG` in charge
    pub log_level: Option<String>,

    /// Configuration file to load instead of the default location
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// The log filter this configuration asks for.
    pub fn env_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        }
    }

    /// Install the global `tracing` subscriber. Later calls are ignored.
    pub fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init();
    }
}

/// Serve and precompile templates with a single-flight compiled-template cache.
#[derive(Parser)]
#[command(
    name = "tplserve",
    about = "Template server with on-demand compilation",
    version,
    author,
    long_about = "tplserve maps request paths to template sources, compiles each source once on first use and reuses the compiled template for every later request."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the document root over HTTP
    Serve(ServeCommand),

    /// Render one request URI and print the body
    Render(RenderCommand),

    /// Compile every template under the document root without executing it
    Precompile(PrecompileCommand),

    /// Show the effective configuration and the templates it covers
    Stats(StatsCommand),
}

impl Cli {
    /// Run the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Initialize logging from `config` and run the subcommand.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Serve(cmd) => cmd.execute(config.config_path).await,
            Commands::Render(cmd) => cmd.execute(config.config_path).await,
            Commands::Precompile(cmd) => cmd.execute(config.config_path).await,
            Commands::Stats(cmd) => cmd.execute(config.config_path).await,
        }
    }
}
