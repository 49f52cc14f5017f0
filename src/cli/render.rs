//! Render one template to stdout.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Args;

use super::common::{build_dispatcher, load_config};
use crate::request::TemplateRequest;

#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Request URI, optionally with a query string (e.g. `/index.html?name=x`)
    #[arg(value_name = "URI")]
    pub uri: String,

    /// Document root (overrides `root` from the config file)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Request attribute as NAME=VALUE; may be repeated
    #[arg(long = "attr", value_name = "NAME=VALUE", value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,
}

fn parse_attribute(raw: &str) -> Result<(String, String)> {
    let (name, value) =
        raw.split_once('=').ok_or_else(|| anyhow!("expected NAME=VALUE, got '{raw}'"))?;
    Ok((name.to_string(), value.to_string()))
}

impl RenderCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = load_config(config_path, self.root).await?;
        let dispatcher = build_dispatcher(&config)?;

        let mut request = TemplateRequest::get(&self.uri);
        for (name, value) in self.attributes {
            request = request.with_attribute(name, value);
        }

        let response = tokio::task::spawn_blocking(move || dispatcher.service(&request))
            .await
            .context("Render task failed")??;

        print!("{}", response.body);
        Ok(())
    }
}
