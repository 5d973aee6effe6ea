//! Source locators, artifact versions and build fingerprints.
//!
//! The store and the per-component metadata speak in strings
//! (`git:https://host/repo#branch`, `gnome-shell-3.2-gabc123`). Those strings are
//! parsed here, once, into typed values; nothing past this module handles the raw
//! forms.
//!
//! # Submodules
//!
//! - [`locator`] - `kind:uri[#branch]` source locators
//! - [`version`] - `<name>-g<revision>` artifact versions

pub mod locator;
pub mod version;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use locator::{SourceKind, SourceLocator};
pub use version::{ArtifactVersion, extract_revision};

/// Errors raised while parsing locator and version strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
  #[error("invalid source locator '{raw}': {reason}")]
  InvalidLocator { raw: String, reason: String },

  #[error("invalid artifact version '{0}'")]
  InvalidVersion(String),
}

/// The pair of revisions that decides whether a component needs rebuilding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
  pub source_revision: String,
  pub buildroot_revision: String,
}

impl Fingerprint {
  pub fn new(source_revision: impl Into<String>, buildroot_revision: impl Into<String>) -> Self {
    Self {
      source_revision: source_revision.into(),
      buildroot_revision: buildroot_revision.into(),
    }
  }
}

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "src {} / buildroot {}", self.source_revision, self.buildroot_revision)
  }
}
