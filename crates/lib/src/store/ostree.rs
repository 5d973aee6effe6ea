//! [`ArtifactStore`] over the `ostree` command line tool.

use std::path::PathBuf;

use tracing::{debug, info};

use super::{ArtifactStore, CommitId, StoreError};
use crate::config::StoreConfig;
use crate::util::cmd::{self, CmdOutput, OutputMode, display_argv};

/// Prefix of the error `ostree rev-parse` reports for a missing ref file.
const MISSING_REF: &str = "Couldn't open ref";
/// Error `ostree show --print-metadata-key` reports for a missing key.
const MISSING_METADATA_KEY: &str = "No such metadata key";

pub struct OstreeStore {
  repo: PathBuf,
  config: StoreConfig,
}

impl OstreeStore {
  pub fn new(repo: PathBuf, config: StoreConfig) -> Self {
    Self { repo, config }
  }

  fn repo_arg(&self) -> String {
    format!("--repo={}", self.repo.display())
  }

  fn ostree_args(&self, rest: &[&str]) -> Vec<String> {
    let mut args = vec![self.repo_arg()];
    args.extend(rest.iter().map(|s| s.to_string()));
    args
  }

  async fn run(&self, program: &str, args: Vec<String>) -> Result<(String, CmdOutput), StoreError> {
    let line = display_argv(program, &args);
    let output = cmd::run(program, &args, None, OutputMode::Capture)
      .await
      .map_err(|source| StoreError::Spawn {
        program: program.to_string(),
        source,
      })?;
    Ok((line, output))
  }

  /// Run a lookup. A failure is `None` only when `not_found` recognizes its
  /// stderr; anything else (an unopenable repo included) is an error.
  async fn lookup(&self, args: Vec<String>, not_found: impl Fn(&str) -> bool) -> Result<Option<String>, StoreError> {
    let (line, output) = self.run(&self.config.ostree, args).await?;
    if output.success() {
      return Ok(Some(output.value().to_string()));
    }
    if not_found(&output.stderr) {
      return Ok(None);
    }
    Err(failed(line, output))
  }

  /// Run a mutation; any failure is an error.
  async fn mutate(&self, program: &str, args: Vec<String>) -> Result<(), StoreError> {
    let (line, output) = self.run(program, args).await?;
    if output.success() {
      Ok(())
    } else {
      Err(failed(line, output))
    }
  }
}

fn failed(cmd: String, output: CmdOutput) -> StoreError {
  StoreError::Failed {
    cmd,
    code: output.code,
    stderr: output.stderr.trim().to_string(),
  }
}

/// Older `ostree` fails to open the ref file, newer ones name the refspec.
fn is_missing_ref(stderr: &str, reference: &str) -> bool {
  stderr.contains(MISSING_REF) || stderr.contains(&format!("Refspec '{}' not found", reference))
}

/// Newer `ostree` prints metadata in GVariant text form, quoted.
fn unquote_variant(value: &str) -> &str {
  value
    .strip_prefix('\'')
    .and_then(|v| v.strip_suffix('\''))
    .unwrap_or(value)
}

impl ArtifactStore for OstreeStore {
  async fn rev_parse(&self, reference: &str) -> Result<Option<CommitId>, StoreError> {
    let found = self
      .lookup(self.ostree_args(&["rev-parse", reference]), |stderr| {
        is_missing_ref(stderr, reference)
      })
      .await?;
    match &found {
      Some(commit) => debug!(reference, commit = %commit, "resolved reference"),
      None => debug!(reference, "reference not found"),
    }
    Ok(found.map(CommitId))
  }

  async fn read_metadata(&self, commit: &CommitId, key: &str) -> Result<Option<String>, StoreError> {
    let key_arg = format!("--print-metadata-key={}", key);
    let value = self
      .lookup(self.ostree_args(&["show", &key_arg, &commit.0]), |stderr| {
        stderr.contains(MISSING_METADATA_KEY)
      })
      .await?;
    Ok(value.map(|v| unquote_variant(&v).to_string()).filter(|v| !v.is_empty()))
  }

  async fn commit(&self, files: &[PathBuf]) -> Result<(), StoreError> {
    if files.is_empty() {
      return Err(StoreError::EmptyCommit);
    }
    let mut args = self.config.commit_args.clone();
    args.push(self.repo_arg());
    args.extend(files.iter().map(|f| f.display().to_string()));

    info!(count = files.len(), "committing artifacts");
    self.mutate(&self.config.commit_program, args).await
  }

  async fn compose(&self, target: &str, base: &str, refs: &[String]) -> Result<(), StoreError> {
    let mut args = self.ostree_args(&["compose", "-b", target, "-s", "Compose", base]);
    args.extend(refs.iter().cloned());

    info!(target, base, layers = refs.len(), "composing tree");
    self.mutate(&self.config.ostree, args).await
  }
}
