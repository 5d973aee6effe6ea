use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::FingerprintError;
use crate::consts::DEFAULT_BRANCH;

/// Version control systems a component can be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
  Git,
}

impl SourceKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Git => "git",
    }
  }
}

impl fmt::Display for SourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Parsed form of a component's `SRC` value: `kind:uri[#branch]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocator {
  pub kind: SourceKind,
  pub uri: String,
  pub branch: String,
}

impl SourceLocator {
  /// Parse a raw locator.
  ///
  /// The kind is everything before the first `:`. The branch is everything after
  /// the last `#` of the remainder, defaulting to `master` when there is no `#`.
  pub fn parse(raw: &str) -> Result<Self, FingerprintError> {
    let invalid = |reason: &str| FingerprintError::InvalidLocator {
      raw: raw.to_string(),
      reason: reason.to_string(),
    };

    let (kind, rest) = raw.split_once(':').ok_or_else(|| invalid("missing ':' after source kind"))?;

    let kind = match kind {
      "git" => SourceKind::Git,
      other => return Err(invalid(&format!("unsupported source kind '{}'", other))),
    };

    let (uri, branch) = match rest.rsplit_once('#') {
      Some((uri, branch)) => (uri, branch),
      None => (rest, DEFAULT_BRANCH),
    };

    Ok(Self {
      kind,
      uri: uri.to_string(),
      branch: branch.to_string(),
    })
  }
}

impl FromStr for SourceLocator {
  type Err = FingerprintError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for SourceLocator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}#{}", self.kind, self.uri, self.branch)
  }
}
