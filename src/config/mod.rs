//! Runtime configuration.
//!
//! `tplserve` reads one TOML file. Every key is optional; missing keys take
//! the defaults below and command-line flags override file values.
//!
//! **Location:**
//! - Unix/macOS: `~/.tplserve/config.toml`
//! - Windows: `%LOCALAPPDATA%\tplserve\config.toml`
//! - or any path passed with `--config`
//!
//! ```toml
//! # Document root holding the template sources
//! root = "site"
//! listen = "127.0.0.1:8080"
//!
//! # Recompile sources changed on disk, checking each at most every 4 seconds
//! development = true
//! check_interval_secs = 4
//!
//! # Template rendering server-side failures (receives `error`)
//! error_page = "/error.html"
//!
//! # Files compiled by `tplserve precompile`
//! templates = ["**/*.html", "**/*.tpl"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::cache::WrapperOptions;
use crate::constants::{DEFAULT_CHECK_INTERVAL, DEFAULT_LISTEN, DEFAULT_TEMPLATE_PATTERNS};
use crate::core::SourceIdentity;

/// Settings for one runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Document root
    pub root: PathBuf,

    /// Socket address for `serve`
    pub listen: String,

    /// Check sources for changes and recompile them
    pub development: bool,

    /// Seconds between modification checks of one source
    pub check_interval_secs: u64,

    /// Identity of the error page template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_page: Option<String>,

    /// Glob patterns, relative to the root, selecting templates to precompile
    pub templates: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            listen: DEFAULT_LISTEN.to_string(),
            development: true,
            check_interval_secs: DEFAULT_CHECK_INTERVAL.as_secs(),
            error_page: None,
            templates: DEFAULT_TEMPLATE_PATTERNS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl RuntimeConfig {
    /// Load from `path`, or from [`default_path`](Self::default_path) when
    /// `None`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| {
            Self::default_path().unwrap_or_else(|_| PathBuf::from("~/.tplserve/config.toml"))
        });
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!(target: "config", "No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        tracing::debug!(target: "config", "Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem operation fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Platform default location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("tplserve")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".tplserve")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Recompilation options for the wrappers.
    pub fn options(&self) -> WrapperOptions {
        WrapperOptions {
            development: self.development,
            check_interval: Duration::from_secs(self.check_interval_secs),
        }
    }

    /// The configured error page, normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if `error_page` is not a valid identity.
    pub fn error_page_identity(&self) -> Result<Option<SourceIdentity>> {
        self.error_page
            .as_deref()
            .map(|page| {
                SourceIdentity::parse(page).with_context(|| format!("Invalid error_page '{page}'"))
            })
            .transpose()
    }

    /// Compiled `templates` patterns.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid pattern.
    pub fn template_patterns(&self) -> Result<Vec<glob::Pattern>> {
        self.templates
            .iter()
            .map(|p| glob::Pattern::new(p).with_context(|| format!("Invalid template pattern '{p}'")))
            .collect()
    }
}
