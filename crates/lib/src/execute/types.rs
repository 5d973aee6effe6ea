//! Types for running a manifest: the top-level error, the step that failed and
//! the per-pair outcomes reported back to the caller.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::build::{BuildError, DecideError, Decision};
use crate::fingerprint::FingerprintError;
use crate::manifest::{ComponentClass, ManifestError};
use crate::source::SourceError;
use crate::store::StoreError;
use crate::work_lock::WorkLockError;

/// The step of processing a (component, architecture) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  /// Loading the component metadata and parsing its `SRC` locator.
  ParseSource,
  Checkout,
  Decide,
  Build,
  /// Looking up the artifacts of a skipped component.
  Reuse,
  Compose,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::ParseSource => "reading component metadata",
      Self::Checkout => "checkout",
      Self::Decide => "build decision",
      Self::Build => "build",
      Self::Reuse => "artifact lookup",
      Self::Compose => "compose",
    })
  }
}

/// The failure underneath an [`ExecuteError::Step`].
#[derive(Debug, Error)]
pub enum StepError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Source(#[from] SourceError),

  #[error(transparent)]
  Decide(#[from] DecideError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error("manifest not found: {0}")]
  ManifestNotFound(PathBuf),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Lock(#[from] WorkLockError),

  #[error("{operation} failed for component '{component}' on {architecture}: {source}")]
  Step {
    component: String,
    architecture: String,
    operation: Operation,
    #[source]
    source: StepError,
  },
}

/// Broad classes of run failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  InvalidLocator,
  InvalidVersion,
  InvalidArtifactName,
  InvalidInput,
  SourceUnavailable,
  CompileFailure,
  ArtifactCountViolation,
  StoreFailure,
  Io,
  Locked,
}

impl ExecuteError {
  /// Wrap a step failure with the pair and operation it happened in.
  pub(crate) fn step<E: Into<StepError>>(
    component: &str,
    architecture: &str,
    operation: Operation,
  ) -> impl FnOnce(E) -> Self {
    let component = component.to_string();
    let architecture = architecture.to_string();
    move |source| Self::Step {
      component,
      architecture,
      operation,
      source: source.into(),
    }
  }

  pub fn kind(&self) -> FailureKind {
    match self {
      Self::ManifestNotFound(_) => FailureKind::InvalidInput,
      Self::Manifest(e) => manifest_kind(e),
      Self::Lock(WorkLockError::Contention { .. } | WorkLockError::ContentionUnknown { .. }) => FailureKind::Locked,
      Self::Lock(_) => FailureKind::Io,
      Self::Step { source, .. } => match source {
        StepError::Manifest(e) => manifest_kind(e),
        StepError::Source(_) => FailureKind::SourceUnavailable,
        StepError::Decide(DecideError::Fingerprint(e)) => fingerprint_kind(e),
        StepError::Decide(DecideError::Source(_)) => FailureKind::SourceUnavailable,
        StepError::Decide(DecideError::Store(_)) | StepError::Store(_) => FailureKind::StoreFailure,
        StepError::Build(e) => match e {
          BuildError::Compile(_) => FailureKind::CompileFailure,
          BuildError::ArtifactCount { .. } => FailureKind::ArtifactCountViolation,
          BuildError::InvalidArtifactName(_) => FailureKind::InvalidArtifactName,
          BuildError::Commit(_) => FailureKind::StoreFailure,
          BuildError::ResultDir { .. } | BuildError::ReadResults { .. } => FailureKind::Io,
        },
      },
    }
  }
}

fn manifest_kind(e: &ManifestError) -> FailureKind {
  match e {
    ManifestError::Locator(e) => fingerprint_kind(e),
    ManifestError::Read { .. } => FailureKind::Io,
    _ => FailureKind::InvalidInput,
  }
}

fn fingerprint_kind(e: &FingerprintError) -> FailureKind {
  match e {
    FingerprintError::InvalidLocator { .. } => FailureKind::InvalidLocator,
    FingerprintError::InvalidVersion(_) => FailureKind::InvalidVersion,
  }
}

/// What happened to one (component, architecture) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairOutcome {
  pub component: String,
  pub architecture: String,
  pub class: ComponentClass,
  pub decision: Decision,
  /// Store branches of the artifacts recorded for the pair. Empty in a plan.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub artifacts: Vec<String>,
}

/// Result of a `build` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
  pub built: usize,
  pub skipped: usize,
  /// Composed trees, in first-composed order.
  pub composed: Vec<String>,
  pub pairs: Vec<PairOutcome>,
}

impl BuildSummary {
  pub(crate) fn record(&mut self, outcome: PairOutcome, composed: Vec<String>) {
    if outcome.decision.is_skip() {
      self.skipped += 1;
    } else {
      self.built += 1;
    }
    for target in composed {
      if !self.composed.contains(&target) {
        self.composed.push(target);
      }
    }
    self.pairs.push(outcome);
  }
}

/// Result of a `plan` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
  pub entries: Vec<PairOutcome>,
}

impl Plan {
  pub fn rebuild_count(&self) -> usize {
    self.entries.iter().filter(|e| !e.decision.is_skip()).count()
  }
}
