//! Application configuration.
//!
//! Values come from built-in defaults, then `~/.config/switchos/config.toml`,
//! then `SWITCHOS_*` environment variables (nested keys use `__`, e.g.
//! `SWITCHOS_CATALOG__BRANCH`).

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "switchos";

const DEFAULT_CONFIG: &str = r#"# SwitchOS configuration.

# Where profiles are persisted. Defaults to the platform data directory.
# data_dir = "/home/me/.local/share/switchos"

# Where exported game lists are written. Defaults to the temp directory.
# export_dir = "/tmp"

# Where inline HTML games are written before display. Defaults to the temp directory.
# document_dir = "/tmp"

# Network identity used for web content when a game sets none.
# default_user_agent = "Mozilla/5.0"

[catalog]
owner = "timi2506"
repo = "ConceptOS-Store"
branch = "main"
api_base = "https://api.github.com"
raw_base = "https://raw.githubusercontent.com"
request_delay_ms = 0
"#;

/// Remote repository that backs the in-app store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch listed by the store.
    pub branch: String,
    /// Base URL of the tree listing API.
    pub api_base: String,
    /// Base URL serving raw file contents.
    pub raw_base: String,
    /// Pause before each catalog fetch, in milliseconds.
    pub request_delay_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            owner: "timi2506".to_string(),
            repo: "ConceptOS-Store".to_string(),
            branch: "main".to_string(),
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            request_delay_ms: 0,
        }
    }
}

impl CatalogConfig {
    /// URL of the repository tree listing.
    pub fn tree_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.branch
        )
    }

    /// URL serving the raw contents of `path`.
    pub fn raw_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.branch,
            path.trim_start_matches('/')
        )
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the key-value store holding profiles.
    pub data_dir: PathBuf,
    /// Destination of exported game lists.
    pub export_dir: PathBuf,
    /// Scratch directory for inline HTML documents.
    pub document_dir: PathBuf,
    /// User agent for web content without its own override.
    pub default_user_agent: Option<String>,
    /// Store catalog location.
    pub catalog: CatalogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(CONFIG_DIR),
            export_dir: env::temp_dir(),
            document_dir: env::temp_dir(),
            default_user_agent: None,
            catalog: CatalogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from a specific file (which may be missing) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("SWITCHOS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Directory receiving log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Path of the user's config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write a commented default config file unless one already exists.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_parses_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("switchos/config.toml");
        write_default_config(&path)?;
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.catalog, CatalogConfig::default());
        assert_eq!(config.default_user_agent, None);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"/srv/switchos\"\ndefault_user_agent = \"Agent/2\"\n[catalog]\nbranch = \"dev\"\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/srv/switchos"));
        assert_eq!(config.log_dir(), PathBuf::from("/srv/switchos/logs"));
        assert_eq!(config.default_user_agent.as_deref(), Some("Agent/2"));
        assert_eq!(config.catalog.branch, "dev");
        assert_eq!(config.catalog.owner, "timi2506");
        Ok(())
    }

    #[test]
    fn catalog_urls() {
        let catalog = CatalogConfig::default();
        assert_eq!(
            catalog.tree_url(),
            "https://api.github.com/repos/timi2506/ConceptOS-Store/git/trees/main"
        );
        assert_eq!(
            catalog.raw_url("games/chirp.json"),
            "https://raw.githubusercontent.com/timi2506/ConceptOS-Store/main/games/chirp.json"
        );
    }
}
