//! Report the effective configuration and what precompilation would load.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::common::{discover_templates, load_config};
use crate::config::RuntimeConfig;

#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Document root (overrides `root` from the config file)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

/// Summary printed by `tplserve stats`.
#[derive(Debug, Serialize)]
pub struct SiteStats {
    pub root: PathBuf,
    pub development: bool,
    pub check_interval_secs: u64,
    pub error_page: Option<String>,
    pub patterns: Vec<String>,
    pub templates: Vec<String>,
}

impl SiteStats {
    /// Collect statistics for `config`.
    pub fn collect(config: &RuntimeConfig) -> Result<Self> {
        let patterns = config.template_patterns()?;
        let templates = discover_templates(&config.root, &patterns)?;
        Ok(Self {
            root: config.root.clone(),
            development: config.development,
            check_interval_secs: config.check_interval_secs,
            error_page: config.error_page_identity()?.map(|p| p.to_string()),
            patterns: config.templates.clone(),
            templates: templates.iter().map(ToString::to_string).collect(),
        })
    }
}

impl StatsCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = load_config(config_path, self.root).await?;
        let stats = SiteStats::collect(&config)?;

        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!("{} {}", "Root:".bold(), stats.root.display());
        println!(
            "{} {}",
            "Mode:".bold(),
            if stats.development {
                format!("development (checks every {}s)", stats.check_interval_secs).as_str().yellow()
            } else {
                "production".green()
            }
        );
        println!("{} {}", "Error page:".bold(), stats.error_page.as_deref().unwrap_or("none"));
        println!("{} {}", "Patterns:".bold(), stats.patterns.join(", "));
        println!("{} {}", "Templates:".bold(), stats.templates.len());
        for template in &stats.templates {
            println!("  {template}");
        }
        Ok(())
    }
}
