//! Per-architecture artifact catalogs and composed trees.
//!
//! Every architecture keeps two ordered lists of artifacts: `all`, which feeds
//! the `<name>-<arch>-devel` tree, and `runtime`, which feeds the
//! `<name>-<arch>-runtime` tree. Artifacts are appended in component order and
//! the lists only ever grow during a run. Both trees are recomposed from scratch
//! after every component, so an interrupted run still leaves trees matching the
//! components processed so far.
//!
//! # Submodules
//!
//! - [`catalog`] - the per-architecture lists

pub mod catalog;

use tracing::info;

use crate::manifest::Manifest;
use crate::store::{ArtifactStore, StoreError};

pub use catalog::{ArchitectureBuildState, ArtifactCatalog};

/// The two tree flavours composed for each architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
  Devel,
  Runtime,
}

impl TreeKind {
  /// Composition order.
  pub const ALL: [TreeKind; 2] = [TreeKind::Devel, TreeKind::Runtime];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Devel => "devel",
      Self::Runtime => "runtime",
    }
  }
}

/// One composed tree: `base` with `refs` layered on top, written to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposePlan {
  pub target: String,
  pub base: String,
  pub refs: Vec<String>,
}

impl ComposePlan {
  pub fn new(manifest: &Manifest, architecture: &str, kind: TreeKind, state: &ArchitectureBuildState) -> Self {
    let suffix = format!("{}-{}", architecture, kind.as_str());
    let artifacts = match kind {
      TreeKind::Devel => state.all(),
      TreeKind::Runtime => state.runtime(),
    };
    Self {
      target: manifest.target_name(&suffix),
      base: manifest.base_name(&suffix),
      refs: artifacts.iter().map(|a| a.branch_ref()).collect(),
    }
  }
}

/// Recompose the devel and runtime trees of `architecture`.
///
/// Returns the names of the composed trees.
pub async fn compose_architecture<A: ArtifactStore>(
  store: &A,
  manifest: &Manifest,
  architecture: &str,
  state: &ArchitectureBuildState,
) -> Result<Vec<String>, StoreError> {
  let mut composed = Vec::with_capacity(TreeKind::ALL.len());
  for kind in TreeKind::ALL {
    let plan = ComposePlan::new(manifest, architecture, kind, state);
    info!(target = %plan.target, layers = plan.refs.len(), "composing");
    store.compose(&plan.target, &plan.base, &plan.refs).await?;
    composed.push(plan.target);
  }
  Ok(composed)
}
