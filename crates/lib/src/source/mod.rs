//! Component source checkouts.
//!
//! A [`SourceProvider`] keeps one checkout per component under a source directory
//! and reports the revision it is at. The checkout path depends only on the
//! component name.
//!
//! # Submodules
//!
//! - [`git`] - git checkouts via gix

pub mod git;

use std::path::PathBuf;

use thiserror::Error;

use crate::fingerprint::SourceLocator;

pub use git::GitSourceProvider;

/// Errors that make a component's source unavailable.
#[derive(Debug, Error)]
pub enum SourceError {
  #[error("failed to prepare checkout directory '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to clone '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("failed to open checkout at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  #[error("failed to fetch '{url}': {source}")]
  Fetch {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("'{url}' has no branch '{branch}'")]
  BranchNotFound { url: String, branch: String },

  #[error("local branch '{branch}' in '{path}' has diverged from origin")]
  Diverged { path: PathBuf, branch: String },

  #[error("failed to update checkout '{path}': {source}")]
  Update {
    path: PathBuf,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("failed to resolve HEAD of '{path}': {message}")]
  ResolveHead { path: PathBuf, message: String },

  #[error("no checkout for component '{0}'")]
  NotCheckedOut(String),
}

/// Provides component source checkouts.
pub trait SourceProvider {
  /// Make sure `name` is checked out from `locator` at the tip of its branch
  /// and return the checkout root.
  fn ensure_checkout(&self, name: &str, locator: &SourceLocator) -> Result<PathBuf, SourceError>;

  /// The commit the checkout of `name` is currently at.
  fn current_revision(&self, name: &str) -> Result<String, SourceError>;
}
