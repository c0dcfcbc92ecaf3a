use std::{
  fs,
  io::{
    self,
    ErrorKind,
  },
  time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use toml::Value;
use wisp_client::{
  DEFAULT_CHAT_TIMEOUT,
  DEFAULT_COMPLETION_TIMEOUT,
  DEFAULT_RUN_TIMEOUT,
  DEFAULT_SERVER_URL,
};
use wisp_lib::{
  render::GhostStyle,
  trigger::{
    DEFAULT_MIN_CHARS,
    TriggerPolicy,
  },
};
use wisp_loader::merge_toml_values;

use crate::handlers::ghost::GhostSettings;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub completion: CompletionConfig,
  pub server:     ServerConfig,
  pub ghost:      GhostConfig,
  pub chat:       ChatConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompletionConfig {
  pub enable:           bool,
  /// Quiet period after the last edit before a completion is requested.
  pub debounce_ms:      u64,
  pub min_chars:        usize,
  /// Lowest confidence still shown, inclusive.
  pub min_confidence:   f32,
  pub require_line_end: bool,
}

impl Default for CompletionConfig {
  fn default() -> Self {
    Self {
      enable:           true,
      debounce_ms:      400,
      min_chars:        DEFAULT_MIN_CHARS,
      min_confidence:   0.2,
      require_line_end: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServerConfig {
  pub url:                   String,
  pub completion_timeout_ms: u64,
  pub run_timeout_ms:        u64,
  pub chat_timeout_ms:       u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      url:                   DEFAULT_SERVER_URL.to_owned(),
      completion_timeout_ms: DEFAULT_COMPLETION_TIMEOUT.as_millis() as u64,
      run_timeout_ms:        DEFAULT_RUN_TIMEOUT.as_millis() as u64,
      chat_timeout_ms:       DEFAULT_CHAT_TIMEOUT.as_millis() as u64,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GhostConfig {
  pub opacity:   f32,
  pub show_hint: bool,
}

impl Default for GhostConfig {
  fn default() -> Self {
    Self {
      opacity:   0.4,
      show_hint: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ChatConfig {
  /// Server-side conversation used when `wisp chat` gets no `--session`.
  pub session: String,
}

impl Default for ChatConfig {
  fn default() -> Self {
    Self {
      session: "default".to_owned(),
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
  #[error("bad config: {0}")]
  BadConfig(#[from] toml::de::Error),
  #[error(transparent)]
  Error(#[from] io::Error),
}

impl Config {
  /// Merges the workspace config over the global one. Unreadable files are
  /// skipped, malformed ones are errors.
  pub fn load(
    global: Result<String, ConfigLoadError>,
    local: Result<String, ConfigLoadError>,
  ) -> Result<Config, ConfigLoadError> {
    let global = parse_layer(global)?;
    let local = parse_layer(local)?;

    let config = match (global, local) {
      (Some(global), Some(local)) => merge_toml_values(global, local, 3).try_into()?,
      (Some(config), None) | (None, Some(config)) => config.try_into()?,
      (None, None) => Config::default(),
    };
    Ok(config)
  }

  pub fn load_user() -> Result<Config, ConfigLoadError> {
    let global = fs::read_to_string(wisp_loader::config_file()).map_err(ConfigLoadError::Error);
    let local =
      fs::read_to_string(wisp_loader::workspace_config_file()).map_err(ConfigLoadError::Error);
    Self::load(global, local)
  }

  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.completion.debounce_ms)
  }

  pub fn ghost_settings(&self) -> GhostSettings {
    GhostSettings {
      enable:         self.completion.enable,
      debounce:       self.debounce(),
      min_confidence: self.completion.min_confidence,
      trigger:        TriggerPolicy {
        min_chars:        self.completion.min_chars,
        require_line_end: self.completion.require_line_end,
      },
    }
  }

  pub fn ghost_style(&self) -> GhostStyle {
    GhostStyle {
      opacity: self.ghost.opacity,
      show_hint: self.ghost.show_hint,
      ..GhostStyle::default()
    }
  }

  pub fn completion_timeout(&self) -> Duration {
    Duration::from_millis(self.server.completion_timeout_ms)
  }

  pub fn run_timeout(&self) -> Duration {
    Duration::from_millis(self.server.run_timeout_ms)
  }

  pub fn chat_timeout(&self) -> Duration {
    Duration::from_millis(self.server.chat_timeout_ms)
  }
}

fn parse_layer(source: Result<String, ConfigLoadError>) -> Result<Option<Value>, ConfigLoadError> {
  match source {
    Ok(text) => Ok(Some(toml::from_str(&text)?)),
    Err(ConfigLoadError::BadConfig(err)) => Err(ConfigLoadError::BadConfig(err)),
    Err(ConfigLoadError::Error(err)) => {
      if err.kind() != ErrorKind::NotFound {
        log::warn!("skipping unreadable config file: {err}");
      }
      Ok(None)
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn missing() -> Result<String, ConfigLoadError> {
    Err(io::Error::from(ErrorKind::NotFound).into())
  }

  #[test]
  fn defaults_without_files() {
    let config = Config::load(missing(), missing()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.debounce(), Duration::from_millis(400));
    assert_eq!(config.server.url, "http://localhost:8000");
    assert_eq!(config.ghost_settings().trigger, TriggerPolicy::default());
  }

  #[test]
  fn local_overrides_global_per_key() {
    let global = r#"
      [completion]
      debounce-ms = 300
      min-confidence = 0.5

      [server]
      url = "http://global:9000"
    "#;
    let local = r#"
      [completion]
      debounce-ms = 500
    "#;
    let config = Config::load(Ok(global.to_owned()), Ok(local.to_owned())).unwrap();
    assert_eq!(config.completion.debounce_ms, 500);
    assert_eq!(config.completion.min_confidence, 0.5);
    assert_eq!(config.server.url, "http://global:9000");
    assert!(config.completion.require_line_end);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let err = Config::load(Ok("[completion]\ndebounce = 3".to_owned()), missing()).unwrap_err();
    assert!(matches!(err, ConfigLoadError::BadConfig(_)));
  }

  #[test]
  fn malformed_local_is_an_error() {
    let err = Config::load(Ok(String::new()), Ok("[ghost".to_owned())).unwrap_err();
    assert!(matches!(err, ConfigLoadError::BadConfig(_)));
  }

  #[test]
  fn ghost_style_from_config() {
    let config = Config::load(
      Ok("[ghost]\nopacity = 0.6\nshow-hint = false".to_owned()),
      missing(),
    )
    .unwrap();
    let style = config.ghost_style();
    assert_eq!(style.opacity, 0.6);
    assert!(!style.show_hint);
    assert_eq!(style.hint_label.as_str(), "Tab");
  }

  #[test]
  fn chat_settings() {
    let defaults = Config::default();
    assert_eq!(defaults.chat.session, "default");
    assert_eq!(defaults.chat_timeout(), DEFAULT_CHAT_TIMEOUT);

    let config = Config::load(
      Ok("[chat]\nsession = \"work\"\n[server]\nchat-timeout-ms = 30000".to_owned()),
      missing(),
    )
    .unwrap();
    assert_eq!(config.chat.session, "work");
    assert_eq!(config.chat_timeout(), Duration::from_secs(30));
  }
}
