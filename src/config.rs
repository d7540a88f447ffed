use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the Taskdeck API, e.g. "https://api.taskdeck.example".
  pub url: String,
  /// Upper bound on request duration, in seconds. Exceeding it is treated
  /// as a network failure.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsConfig {
  /// Mirror request failures to the diagnostic log, grouped by operation
  /// context. Intended for non-production runs; no effect on control flow.
  #[serde(default)]
  pub enabled: bool,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./taskdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/taskdeck/config.yaml
  ///
  /// Environment overrides applied afterwards: TASKDECK_API_URL and
  /// TASKDECK_DIAGNOSTICS=1.
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

    let Some(path) = path else {
      return Err(eyre!(
        "No configuration file found. Create one at ~/.config/taskdeck/config.yaml"
      ));
    };
    let mut config = Self::load_from_path(&path)?;
    config.apply_env();
    Ok(config)
  }

  /// Build a configuration directly from an API base URL. Useful for tests
  /// and embedding applications that manage their own settings.
  pub fn from_url(url: impl Into<String>) -> Self {
    Self {
      api: ApiConfig {
        url: url.into(),
        timeout_secs: default_timeout_secs(),
      },
      diagnostics: DiagnosticsConfig::default(),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("taskdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("taskdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  fn apply_env(&mut self) {
    if let Ok(url) = std::env::var("TASKDECK_API_URL") {
      self.api.url = url;
    }
    if let Ok(flag) = std::env::var("TASKDECK_DIAGNOSTICS") {
      self.diagnostics.enabled = flag == "1" || flag.eq_ignore_ascii_case("true");
    }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_yaml_with_defaults() {
    let config = Config::from_yaml(
      "api:\n  url: https://api.taskdeck.example\n",
    )
    .unwrap();

    assert_eq!(config.api.url, "https://api.taskdeck.example");
    assert_eq!(config.api.timeout_secs, 30);
    assert!(!config.diagnostics.enabled);
  }

  #[test]
  fn parses_explicit_settings() {
    let config = Config::from_yaml(
      "api:\n  url: https://api.taskdeck.example\n  timeout_secs: 5\ndiagnostics:\n  enabled: true\n",
    )
    .unwrap();

    assert_eq!(config.timeout(), Duration::from_secs(5));
    assert!(config.diagnostics.enabled);
  }
}
