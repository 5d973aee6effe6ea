//! Rebuild/skip decisions.
//!
//! The tip of `artifacts/<buildroot>/<component>/<branch>` records, in its commit
//! metadata, the artifact version (which embeds the source revision) and the
//! buildroot revision it was built against. Together they form the fingerprint of
//! the previous build. A component is rebuilt when there is no previous build, the
//! metadata is incomplete, or either half of the fingerprint changed.
//!
//! Deciding never writes anything.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{Artifact, ArtifactKind, BuildTarget};
use crate::consts::{META_ARTIFACT_VERSION, META_BUILDROOT_VERSION};
use crate::fingerprint::{ArtifactVersion, Fingerprint, FingerprintError};
use crate::source::{SourceError, SourceProvider};
use crate::store::{ArtifactStore, CommitId, StoreError};

#[derive(Debug, Error)]
pub enum DecideError {
  #[error(transparent)]
  Fingerprint(#[from] FingerprintError),

  #[error(transparent)]
  Source(#[from] SourceError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Why a component has to be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RebuildReason {
  NoPreviousBuild,
  MissingMetadata { key: String },
  SourceChanged { previous: String, current: String },
  BuildrootChanged { previous: String, current: String },
  BuildrootMissing,
}

impl fmt::Display for RebuildReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NoPreviousBuild => f.write_str("no previous build"),
      Self::MissingMetadata { key } => write!(f, "previous build has no '{}'", key),
      Self::SourceChanged { previous, current } => {
        write!(f, "source changed {} -> {}", previous, current)
      }
      Self::BuildrootChanged { previous, current } => {
        write!(f, "buildroot changed {} -> {}", previous, current)
      }
      Self::BuildrootMissing => f.write_str("buildroot not found in store"),
    }
  }
}

/// The previous build that is still valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviousBuild {
  pub commit: CommitId,
  pub artifact_version: ArtifactVersion,
  pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
  Rebuild(RebuildReason),
  Skip(PreviousBuild),
}

impl Decision {
  pub fn is_skip(&self) -> bool {
    matches!(self, Self::Skip(_))
  }
}

impl fmt::Display for Decision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Rebuild(reason) => write!(f, "rebuild ({})", reason),
      Self::Skip(previous) => write!(f, "skip (at {})", previous.fingerprint),
    }
  }
}

/// Decide whether `target` must be rebuilt.
///
/// The component must already be checked out.
pub async fn decide<S, A>(source: &S, store: &A, target: &BuildTarget<'_>) -> Result<Decision, DecideError>
where
  S: SourceProvider,
  A: ArtifactStore,
{
  let branch = target.decision_branch();
  let Some(commit) = store.rev_parse(&branch).await? else {
    info!(branch = %branch, "no previous build");
    return Ok(Decision::Rebuild(RebuildReason::NoPreviousBuild));
  };

  let Some(previous_version) = store.read_metadata(&commit, META_ARTIFACT_VERSION).await? else {
    return Ok(missing_metadata(&commit, META_ARTIFACT_VERSION));
  };
  let Some(previous_buildroot) = store.read_metadata(&commit, META_BUILDROOT_VERSION).await? else {
    return Ok(missing_metadata(&commit, META_BUILDROOT_VERSION));
  };
  let artifact_version: ArtifactVersion = previous_version.parse()?;
  let previous = Fingerprint::new(artifact_version.revision.clone(), previous_buildroot);

  let current_source = source.current_revision(target.component)?;
  let Some(current_buildroot) = store.rev_parse(&target.buildroot).await? else {
    info!(buildroot = %target.buildroot, "buildroot not found");
    return Ok(Decision::Rebuild(RebuildReason::BuildrootMissing));
  };
  let current = Fingerprint::new(current_source, current_buildroot.0);
  debug!(%previous, %current, "comparing fingerprints");

  if previous.source_revision != current.source_revision {
    info!(previous = %previous.source_revision, current = %current.source_revision, "source changed");
    return Ok(Decision::Rebuild(RebuildReason::SourceChanged {
      previous: previous.source_revision,
      current: current.source_revision,
    }));
  }
  if previous.buildroot_revision != current.buildroot_revision {
    info!(previous = %previous.buildroot_revision, current = %current.buildroot_revision, "buildroot changed");
    return Ok(Decision::Rebuild(RebuildReason::BuildrootChanged {
      previous: previous.buildroot_revision,
      current: current.buildroot_revision,
    }));
  }

  info!(revision = %current.source_revision, "up to date");
  Ok(Decision::Skip(PreviousBuild {
    commit,
    artifact_version,
    fingerprint: previous,
  }))
}

fn missing_metadata(commit: &CommitId, key: &str) -> Decision {
  warn!(commit = %commit, key, "previous build is missing metadata, rebuilding");
  Decision::Rebuild(RebuildReason::MissingMetadata { key: key.to_string() })
}

/// The artifacts of a skipped component, rebuilt from the store branches its
/// previous build left behind.
pub async fn previous_artifacts<A: ArtifactStore>(
  store: &A,
  target: &BuildTarget<'_>,
  previous: &PreviousBuild,
) -> Result<Vec<Artifact>, StoreError> {
  let mut artifacts = Vec::new();
  for kind in ArtifactKind::ALL {
    let branch = target.artifact_branch(kind);
    if store.rev_parse(&branch).await?.is_none() {
      debug!(branch = %branch, "no previous artifact of this type");
      continue;
    }
    artifacts.push(Artifact {
      buildroot: target.buildroot.clone(),
      buildroot_version: previous.fingerprint.buildroot_revision.clone(),
      name: target.component.to_string(),
      branch: target.locator.branch.clone(),
      version: previous.artifact_version.to_string(),
      kind,
      path: None,
    });
  }
  Ok(artifacts)
}
