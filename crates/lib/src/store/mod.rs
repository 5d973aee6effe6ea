//! The artifact store.
//!
//! Build outputs are committed to a content-addressed repository that keeps one
//! branch per artifact (`artifacts/<buildroot>/<component>/<branch>/<type>`) and
//! records the artifact and buildroot versions in each commit's metadata. Composed
//! trees are produced by layering artifact branches on top of a base tree.
//!
//! # Submodules
//!
//! - [`ostree`] - store backed by the `ostree` command line tool

pub mod ostree;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ostree::OstreeStore;

/// A commit checksum returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitId(pub String);

impl fmt::Display for CommitId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Errors reported by the store. A missing reference is not one of them.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("`{cmd}` failed with exit code {code:?}: {stderr}")]
  Failed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("nothing to commit")]
  EmptyCommit,
}

/// Operations the orchestrator needs from the artifact store.
///
/// Lookups return `Ok(None)` when the reference or key does not exist; that is
/// the normal first-build case and never an error.
#[allow(async_fn_in_trait)]
pub trait ArtifactStore {
  /// Resolve a branch to its tip commit.
  async fn rev_parse(&self, reference: &str) -> Result<Option<CommitId>, StoreError>;

  /// Read one metadata value from a commit.
  async fn read_metadata(&self, commit: &CommitId, key: &str) -> Result<Option<String>, StoreError>;

  /// Commit a batch of artifact files in a single call.
  async fn commit(&self, files: &[PathBuf]) -> Result<(), StoreError>;

  /// Write `target` as `base` with each of `refs` layered on top, in order.
  async fn compose(&self, target: &str, base: &str, refs: &[String]) -> Result<(), StoreError>;
}
