use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "INC9S_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub incidents: IncidentsConfig,
  #[serde(default)]
  pub status: StatusConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Sent as `X-Tenant-Id` on document calls
  #[serde(default = "default_tenant")]
  pub tenant_id: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      tenant_id: default_tenant(),
    }
  }
}

fn default_base_url() -> String {
  "http://localhost:5084".to_string()
}

fn default_tenant() -> String {
  "dev".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentsConfig {
  #[serde(default = "default_page_size")]
  pub page_size: u32,
}

impl Default for IncidentsConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
    }
  }
}

fn default_page_size() -> u32 {
  5
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
  /// Interval used when auto-refresh is switched on in the status view
  #[serde(default = "default_auto_refresh_secs")]
  pub auto_refresh_secs: u64,
}

impl Default for StatusConfig {
  fn default() -> Self {
    Self {
      auto_refresh_secs: default_auto_refresh_secs(),
    }
  }
}

fn default_auto_refresh_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./inc9s.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/inc9s/config.yaml
  ///
  /// `INC9S_API_URL` overrides the configured base URL.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      config.api.base_url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("inc9s.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("inc9s").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Reject values that would only fail later, mid-session.
  pub fn validate(&self) -> Result<()> {
    self.base_url()?;
    if self.incidents.page_size == 0 {
      return Err(eyre!("incidents.page_size must be greater than zero"));
    }
    if self.api.tenant_id.trim().is_empty() {
      return Err(eyre!("api.tenant_id must not be empty"));
    }
    Ok(())
  }

  pub fn base_url(&self) -> Result<Url> {
    let url = Url::parse(&self.api.base_url)
      .map_err(|e| eyre!("Invalid api.base_url {}: {}", self.api.base_url, e))?;
    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(eyre!("Unsupported scheme in api.base_url: {}", other)),
    }
  }
}
