use std::path::PathBuf;

use crate::consts::APP_NAME;

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  env_path("USERPROFILE").unwrap_or_else(|| PathBuf::from("C:\\"))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  env_path("HOME").unwrap_or_else(|| PathBuf::from("/"))
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  env_path("APPDATA").unwrap_or_else(home_dir).join(APP_NAME)
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  env_path("XDG_CONFIG_HOME")
    .unwrap_or_else(|| home_dir().join(".config"))
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  env_path("APPDATA").unwrap_or_else(home_dir).join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  env_path("XDG_DATA_HOME")
    .unwrap_or_else(|| home_dir().join(".local").join("share"))
    .join(APP_NAME)
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  env_path("LOCALAPPDATA")
    .unwrap_or_else(home_dir)
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  env_path("XDG_CACHE_HOME")
    .unwrap_or_else(|| home_dir().join(".cache"))
    .join(APP_NAME)
}

/// Default artifact repository location.
pub fn default_repo_dir() -> PathBuf {
  data_dir().join("repo")
}

/// Default parent directory of component checkouts.
pub fn default_src_dir() -> PathBuf {
  cache_dir().join("src")
}

/// Default scratch directory for compile work and result directories.
pub fn default_work_dir() -> PathBuf {
  cache_dir().join("work")
}

/// Default location of the optional configuration file.
pub fn default_config_file() -> PathBuf {
  config_dir().join("config.json")
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn xdg_config_home_takes_precedence() {
    temp_env::with_vars(
      [
        ("XDG_CONFIG_HOME", Some("/custom/config")),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(config_dir(), PathBuf::from("/custom/config").join(APP_NAME));
        assert_eq!(
          default_config_file(),
          PathBuf::from("/custom/config/treebuild/config.json")
        );
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_fallback_to_home_directories() {
    temp_env::with_vars(
      [
        ("XDG_CONFIG_HOME", None::<&str>),
        ("XDG_DATA_HOME", None::<&str>),
        ("XDG_CACHE_HOME", None::<&str>),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(config_dir(), PathBuf::from("/home/user/.config").join(APP_NAME));
        assert_eq!(data_dir(), PathBuf::from("/home/user/.local/share").join(APP_NAME));
        assert_eq!(cache_dir(), PathBuf::from("/home/user/.cache").join(APP_NAME));
      },
    );
  }

  #[test]
  #[serial]
  fn empty_xdg_variable_is_ignored() {
    temp_env::with_vars(
      [("XDG_CACHE_HOME", Some("")), ("HOME", Some("/home/user"))],
      || {
        assert_eq!(default_work_dir(), PathBuf::from("/home/user/.cache/treebuild/work"));
        assert_eq!(default_src_dir(), PathBuf::from("/home/user/.cache/treebuild/src"));
      },
    );
  }
}
