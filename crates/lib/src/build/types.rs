use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::compile::CompileError;
use crate::consts::{ARTIFACT_BRANCH_ROOT, ARTIFACT_PREFIX, ARTIFACT_SUFFIX};
use crate::fingerprint::SourceLocator;
use crate::manifest::Manifest;
use crate::store::StoreError;

/// Errors from building one component.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error("failed to reset result directory {path}: {source}")]
  ResultDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error("failed to read result directory {path}: {source}")]
  ReadResults {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("expected 1 or 2 artifacts in {dir}, found {found}")]
  ArtifactCount { dir: PathBuf, found: usize },

  #[error("invalid artifact file name '{0}'")]
  InvalidArtifactName(String),

  #[error("failed to commit artifacts: {0}")]
  Commit(#[source] StoreError),
}

/// The kind of payload an artifact carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
  Runtime,
  Devel,
}

impl ArtifactKind {
  pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Runtime, ArtifactKind::Devel];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Runtime => "runtime",
      Self::Devel => "devel",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|k| k.as_str() == s)
  }

  /// Composition order: runtime payloads first, everything else after.
  pub fn compose_rank(&self) -> u8 {
    match self {
      Self::Runtime => 0,
      _ => 1,
    }
  }
}

impl fmt::Display for ArtifactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One build output of one component.
///
/// Artifacts fresh from a build carry the archive `path`; artifacts reused from a
/// previous build exist only as store branches and have no path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
  pub buildroot: String,
  pub buildroot_version: String,
  pub name: String,
  pub branch: String,
  pub version: String,
  pub kind: ArtifactKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<PathBuf>,
}

impl Artifact {
  /// Parse an artifact archive name:
  /// `artifact-<buildroot>,<buildroot-version>,<name>,<branch>,<version>-<type>.tar.gz`.
  pub fn parse_file_name(file_name: &str) -> Result<Self, BuildError> {
    let invalid = || BuildError::InvalidArtifactName(file_name.to_string());

    let body = file_name
      .strip_prefix(ARTIFACT_PREFIX)
      .and_then(|s| s.strip_suffix(ARTIFACT_SUFFIX))
      .ok_or_else(invalid)?;
    let (fields, kind) = body.rsplit_once('-').ok_or_else(invalid)?;
    let kind = ArtifactKind::parse(kind).ok_or_else(invalid)?;

    let parts: Vec<&str> = fields.splitn(5, ',').collect();
    let [buildroot, buildroot_version, name, branch, version] = parts[..] else {
      return Err(invalid());
    };
    if parts.iter().any(|p| p.is_empty()) {
      return Err(invalid());
    }

    Ok(Self {
      buildroot: buildroot.to_string(),
      buildroot_version: buildroot_version.to_string(),
      name: name.to_string(),
      branch: branch.to_string(),
      version: version.to_string(),
      kind,
      path: None,
    })
  }

  /// Parse the artifact described by an archive in a result directory.
  pub fn from_path(path: &Path) -> Result<Self, BuildError> {
    let file_name = path
      .file_name()
      .and_then(|n| n.to_str())
      .ok_or_else(|| BuildError::InvalidArtifactName(path.display().to_string()))?;
    let mut artifact = Self::parse_file_name(file_name)?;
    artifact.path = Some(path.to_path_buf());
    Ok(artifact)
  }

  pub fn file_name(&self) -> String {
    format!(
      "{}{},{},{},{},{}-{}{}",
      ARTIFACT_PREFIX,
      self.buildroot,
      self.buildroot_version,
      self.name,
      self.branch,
      self.version,
      self.kind,
      ARTIFACT_SUFFIX
    )
  }

  /// The store branch this artifact is committed to.
  pub fn branch_ref(&self) -> String {
    artifact_branch(&self.buildroot, &self.name, &self.branch, self.kind)
  }
}

/// `artifacts/<buildroot>/<component>/<branch>`: the branch whose tip records the
/// fingerprint of a component's last build.
pub fn component_branch(buildroot: &str, component: &str, branch: &str) -> String {
  format!("{}/{}/{}/{}", ARTIFACT_BRANCH_ROOT, buildroot, component, branch)
}

/// `artifacts/<buildroot>/<component>/<branch>/<type>`.
pub fn artifact_branch(buildroot: &str, component: &str, branch: &str, kind: ArtifactKind) -> String {
  format!("{}/{}", component_branch(buildroot, component, branch), kind)
}

/// Order one component's artifacts for composition. Stable.
pub fn sort_for_compose(artifacts: &mut [Artifact]) {
  artifacts.sort_by_key(|a| a.kind.compose_rank());
}

/// One (component, architecture) pair being processed.
#[derive(Debug, Clone)]
pub struct BuildTarget<'a> {
  pub component: &'a str,
  pub architecture: &'a str,
  pub buildroot: String,
  pub locator: &'a SourceLocator,
}

impl<'a> BuildTarget<'a> {
  pub fn new(manifest: &Manifest, component: &'a str, architecture: &'a str, locator: &'a SourceLocator) -> Self {
    Self {
      component,
      architecture,
      buildroot: manifest.buildroot_name(architecture),
      locator,
    }
  }

  pub fn decision_branch(&self) -> String {
    component_branch(&self.buildroot, self.component, &self.locator.branch)
  }

  pub fn artifact_branch(&self, kind: ArtifactKind) -> String {
    artifact_branch(&self.buildroot, self.component, &self.locator.branch, kind)
  }
}
