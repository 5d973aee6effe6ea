use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::FingerprintError;

/// An artifact version string, `<name>-g<revision>`.
///
/// The revision is the source commit the artifact was built from. The name part
/// is optional: a bare `g<revision>` is also accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactVersion {
  pub name: Option<String>,
  pub revision: String,
}

impl ArtifactVersion {
  pub fn parse(raw: &str) -> Result<Self, FingerprintError> {
    // A separator at index 0 does not count; the whole string is then the suffix.
    let (name, suffix) = match raw.rfind('-') {
      Some(idx) if idx > 0 => (Some(&raw[..idx]), &raw[idx + 1..]),
      _ => (None, raw),
    };

    let revision = suffix
      .strip_prefix('g')
      .ok_or_else(|| FingerprintError::InvalidVersion(raw.to_string()))?;

    Ok(Self {
      name: name.map(str::to_string),
      revision: revision.to_string(),
    })
  }
}

impl FromStr for ArtifactVersion {
  type Err = FingerprintError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for ArtifactVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "{}-g{}", name, self.revision),
      None => write!(f, "g{}", self.revision),
    }
  }
}

/// Extract the source revision recorded in an artifact version string.
pub fn extract_revision(artifact_version: &str) -> Result<String, FingerprintError> {
  ArtifactVersion::parse(artifact_version).map(|v| v.revision)
}
