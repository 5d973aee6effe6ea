//! Run configuration.
//!
//! Values are resolved in this order, later sources winning:
//!
//! 1. built-in defaults (XDG data/cache directories, `ostree`, `ostbuild`)
//! 2. the JSON config file (`$XDG_CONFIG_HOME/treebuild/config.json` or `--config`)
//! 3. environment variables (`TREEBUILD_REPO`, `TREEBUILD_SRCDIR`, `TREEBUILD_WORKDIR`)
//! 4. explicit overrides from the command line
//!
//! # Config File Format
//!
//! ```json
//! {
//!   "repo": "/srv/ostree/repo",
//!   "srcdir": "/srv/src",
//!   "workdir": "/var/tmp/treebuild",
//!   "compile": { "program": "ostbuild", "args": ["chroot-compile-one"], "emulator": "setarch" },
//!   "store": { "ostree": "ostree", "commit_program": "ostbuild", "commit_args": ["commit-artifacts"] }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::ENV_PREFIX;
use crate::platform::paths::{default_config_file, default_repo_dir, default_src_dir, default_work_dir};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// How the external compile step is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileConfig {
  /// Compile driver executable.
  pub program: String,
  /// Arguments placed before the `--repo/--buildroot/--workdir/--resultdir` flags.
  pub args: Vec<String>,
  /// Wrapper run as `<emulator> <arch> <program> ...` for foreign targets.
  pub emulator: String,
}

impl Default for CompileConfig {
  fn default() -> Self {
    Self {
      program: "ostbuild".to_string(),
      args: vec!["chroot-compile-one".to_string()],
      emulator: "setarch".to_string(),
    }
  }
}

/// How the artifact store tools are invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
  /// The `ostree` executable.
  pub ostree: String,
  /// Executable that commits artifact archives.
  pub commit_program: String,
  /// Arguments placed before `--repo=` and the artifact files.
  pub commit_args: Vec<String>,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      ostree: "ostree".to_string(),
      commit_program: "ostbuild".to_string(),
      commit_args: vec!["commit-artifacts".to_string()],
    }
  }
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
  /// Artifact repository.
  pub repo: PathBuf,
  /// Parent directory of component checkouts.
  pub srcdir: PathBuf,
  /// Scratch directory for compiles and result directories.
  pub workdir: PathBuf,
  pub compile: CompileConfig,
  pub store: StoreConfig,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      repo: default_repo_dir(),
      srcdir: default_src_dir(),
      workdir: default_work_dir(),
      compile: CompileConfig::default(),
      store: StoreConfig::default(),
    }
  }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub config_file: Option<PathBuf>,
  pub repo: Option<PathBuf>,
  pub srcdir: Option<PathBuf>,
  pub workdir: Option<PathBuf>,
}

impl RunConfig {
  /// Resolve the configuration from all sources.
  ///
  /// A missing default config file is fine; a missing file named with `--config`
  /// is an error.
  pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
    let mut config = match &overrides.config_file {
      Some(path) => Self::load(path)?,
      None => Self::load_optional(&default_config_file())?.unwrap_or_default(),
    };

    config.apply_env();

    if let Some(repo) = &overrides.repo {
      config.repo = repo.clone();
    }
    if let Some(srcdir) = &overrides.srcdir {
      config.srcdir = srcdir.clone();
    }
    if let Some(workdir) = &overrides.workdir {
      config.workdir = workdir.clone();
    }

    debug!(repo = %config.repo.display(), srcdir = %config.srcdir.display(), workdir = %config.workdir.display(), "resolved configuration");
    Ok(config)
  }

  /// Load a config file that must exist.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
    match fs::metadata(path) {
      Ok(_) => Self::load(path).map(Some),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(ConfigError::Read {
        path: path.to_path_buf(),
        source,
      }),
    }
  }

  fn apply_env(&mut self) {
    let var = |name: &str| {
      std::env::var_os(format!("{}_{}", ENV_PREFIX, name))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
    };
    if let Some(repo) = var("REPO") {
      self.repo = repo;
    }
    if let Some(srcdir) = var("SRCDIR") {
      self.srcdir = srcdir;
    }
    if let Some(workdir) = var("WORKDIR") {
      self.workdir = workdir;
    }
  }
}
