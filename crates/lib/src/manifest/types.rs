//! Manifest types for treebuild.
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "name": "gnomeos-3.4",
//!   "base": "bases/yocto/gnomeos-3.4",
//!   "architectures": ["i686", "x86_64"],
//!   "components": ["glib", "gobject-introspection", "gtk3"]
//! }
//! ```
//!
//! # Component Metadata Format
//!
//! ```text
//! SRC=git:git://git.gnome.org/glib#glib-2-30
//! COMPONENT=devel
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{COMPONENT_META_EXT, META_KEY_COMPONENT, META_KEY_SRC};
use crate::fingerprint::{FingerprintError, SourceLocator};

/// Errors that can occur when loading a manifest or component metadata.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse manifest {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid manifest: {0}")]
  Invalid(String),

  #[error("{path}:{line}: expected KEY=value")]
  MalformedLine { path: PathBuf, line: usize },

  #[error("{path}: missing required key {key}")]
  MissingKey { path: PathBuf, key: &'static str },

  #[error(transparent)]
  Locator(#[from] FingerprintError),
}

/// The top-level description of a product build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
  /// Product name; composed trees are named `<name>-<arch>-<runtime|devel>`.
  pub name: String,
  /// Prefix of the base trees the composed trees are layered on.
  pub base: String,
  /// Target architectures, in build order.
  pub architectures: Vec<String>,
  /// Components, in build order.
  pub components: Vec<String>,
}

impl Manifest {
  /// Load and validate a manifest file.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    let manifest: Manifest = serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    manifest.validate()?;
    Ok(manifest)
  }

  /// Reject manifests whose names would produce unusable store references.
  pub fn validate(&self) -> Result<(), ManifestError> {
    if self.name.is_empty() {
      return Err(ManifestError::Invalid("name must not be empty".to_string()));
    }
    if self.base.is_empty() {
      return Err(ManifestError::Invalid("base must not be empty".to_string()));
    }
    for arch in &self.architectures {
      if arch.is_empty() || arch.contains('/') {
        return Err(ManifestError::Invalid(format!("bad architecture name '{}'", arch)));
      }
    }
    for component in &self.components {
      if component.is_empty() || component.contains('/') || component.starts_with('.') {
        return Err(ManifestError::Invalid(format!("bad component name '{}'", component)));
      }
    }
    Ok(())
  }

  /// Name of the buildroot tree used to compile for `arch`.
  pub fn buildroot_name(&self, arch: &str) -> String {
    format!("{}-{}-devel", self.name, arch)
  }

  /// Name of the composed tree for a `<arch>-<runtime|devel>` suffix.
  pub fn target_name(&self, suffix: &str) -> String {
    format!("{}-{}", self.name, suffix)
  }

  /// Name of the base tree a composed tree is layered on.
  pub fn base_name(&self, suffix: &str) -> String {
    format!("{}-{}", self.base, suffix)
  }
}

/// Whether a component's runtime artifacts belong in the runtime tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentClass {
  Runtime,
  Devel,
}

/// Per-component metadata loaded from `<name>.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMeta {
  pub name: String,
  pub src: SourceLocator,
  pub class: ComponentClass,
}

impl ComponentMeta {
  /// Path of the metadata file for `name` in `dir`.
  pub fn path_for(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, COMPONENT_META_EXT))
  }

  /// Load the metadata for component `name` from the manifest directory.
  pub fn load(dir: &Path, name: &str) -> Result<Self, ManifestError> {
    let path = Self::path_for(dir, name);
    let content = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
      path: path.clone(),
      source,
    })?;
    let values = parse_kv(&content, &path)?;
    Self::from_values(name, &values, &path)
  }

  fn from_values(name: &str, values: &BTreeMap<String, String>, path: &Path) -> Result<Self, ManifestError> {
    let raw_src = values.get(META_KEY_SRC).ok_or_else(|| ManifestError::MissingKey {
      path: path.to_path_buf(),
      key: META_KEY_SRC,
    })?;
    let src = SourceLocator::parse(raw_src)?;

    let class = match values.get(META_KEY_COMPONENT).map(String::as_str) {
      Some("devel") => ComponentClass::Devel,
      _ => ComponentClass::Runtime,
    };

    Ok(Self {
      name: name.to_string(),
      src,
      class,
    })
  }
}

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped; the value
/// is everything after the first `=`.
pub fn parse_kv(content: &str, path: &Path) -> Result<BTreeMap<String, String>, ManifestError> {
  let mut values = BTreeMap::new();
  for (idx, line) in content.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let (key, value) = line.split_once('=').ok_or_else(|| ManifestError::MalformedLine {
      path: path.to_path_buf(),
      line: idx + 1,
    })?;
    let key = key.trim();
    if key.is_empty() {
      return Err(ManifestError::MalformedLine {
        path: path.to_path_buf(),
        line: idx + 1,
      });
    }
    values.insert(key.to_string(), value.trim().to_string());
  }
  Ok(values)
}
