//! Application configuration for docenrich.
//!
//! User config lives at `~/.docenrich/docenrich.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EnrichError, Result};
use crate::types::SiteDescriptor;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docenrich.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docenrich";

// ---------------------------------------------------------------------------
// Config structs (matching docenrich.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP fetcher settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Registered sites.
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Base address for same-site fetches.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Enrichment steps to run, in order.
    #[serde(default = "default_steps")]
    pub steps: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            steps: default_steps(),
        }
    }
}

fn default_prefix() -> String {
    "http://localhost:3001".into()
}
fn default_steps() -> Vec<String> {
    ["publish-data", "schedule-time", "validate-publish-url", "site-slug"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_max_redirects() -> usize {
    5
}

/// `[[sites]]` entry: a site known to the site registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteEntry {
    /// Lookup key used on the command line.
    pub key: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub host: String,
}

impl From<&SiteEntry> for SiteDescriptor {
    fn from(entry: &SiteEntry) -> Self {
        Self {
            slug: entry.slug.clone(),
            name: entry.name.clone(),
            host: entry.host.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docenrich/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| EnrichError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docenrich/docenrich.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EnrichError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| EnrichError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EnrichError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EnrichError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EnrichError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
