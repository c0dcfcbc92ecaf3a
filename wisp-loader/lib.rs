//! Locations of wisp's config, cache and log files, plus TOML layering.

use std::{
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory name used below the platform config/cache dirs and inside a
/// workspace.
const APP_DIR: &str = "wisp";
const WORKSPACE_DIR: &str = ".wisp";

static CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

pub fn initialize_config_file(specified_file: Option<PathBuf>) {
  let config_file = specified_file.unwrap_or_else(default_config_file);
  ensure_parent_dir(&config_file);
  CONFIG_FILE.set(config_file).ok();
}

pub fn initialize_log_file(specified_file: Option<PathBuf>) {
  let log_file = specified_file.unwrap_or_else(default_log_file);
  ensure_parent_dir(&log_file);
  LOG_FILE.set(log_file).ok();
}

pub fn config_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("WISP_CONFIG_DIR") {
    return expand_tilde(Path::new(&dir));
  }
  let base = match choose_base_strategy() {
    Ok(strategy) => strategy.config_dir(),
    Err(err) => fallback_dir(&err),
  };
  base.join(APP_DIR)
}

pub fn cache_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("WISP_CACHE_DIR") {
    return expand_tilde(Path::new(&dir));
  }
  let base = match choose_base_strategy() {
    Ok(strategy) => strategy.cache_dir(),
    Err(err) => fallback_dir(&err),
  };
  base.join(APP_DIR)
}

pub fn config_file() -> PathBuf {
  CONFIG_FILE.get_or_init(default_config_file).clone()
}

pub fn log_file() -> PathBuf {
  LOG_FILE
    .get_or_init(|| {
      let path = default_log_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn workspace_config_file() -> PathBuf {
  find_workspace().0.join(WORKSPACE_DIR).join("config.toml")
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join("wisp.log")
}

fn default_config_file() -> PathBuf {
  config_dir().join("config.toml")
}

fn fallback_dir(err: &dyn std::fmt::Display) -> PathBuf {
  log::warn!("unable to determine home directory: {err}");
  std::env::temp_dir()
}

fn expand_tilde(path: &Path) -> PathBuf {
  match path.strip_prefix("~") {
    Ok(rest) => match etcetera::home_dir() {
      Ok(home) => home.join(rest),
      Err(_) => path.to_owned(),
    },
    Err(_) => path.to_owned(),
  }
}

/// Merge two TOML documents, merging values from `right` onto `left`.
///
/// `merge_depth` sets the nesting depth up to which tables are merged instead
/// of replaced. Arrays are always taken from `right`.
pub fn merge_toml_values(left: toml::Value, right: toml::Value, merge_depth: usize) -> toml::Value {
  use toml::Value;

  match (left, right) {
    (Value::Table(mut left_map), Value::Table(right_map)) if merge_depth > 0 => {
      for (rname, rvalue) in right_map {
        let merged = match left_map.remove(&rname) {
          Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
          None => rvalue,
        };
        left_map.insert(rname, merged);
      }
      Value::Table(left_map)
    },
    (_, value) => value,
  }
}

/// Finds the current workspace folder by walking up from the CWD to the first
/// directory containing `.git`, `.jj` or `.wisp`. Returns `(CWD, true)` when
/// none is found, `(workspace, false)` otherwise.
pub fn find_workspace() -> (PathBuf, bool) {
  match std::env::current_dir() {
    Ok(current_dir) => find_workspace_in(current_dir),
    Err(_) => (PathBuf::new(), true),
  }
}

pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists()
      || ancestor.join(".jj").exists()
      || ancestor.join(WORKSPACE_DIR).exists()
    {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent).ok();
  }
}
