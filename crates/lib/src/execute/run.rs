//! Entry points that run a manifest file against the configured tools.

use std::path::{Path, PathBuf};

use tracing::info;

use super::types::{BuildSummary, ExecuteError, Plan};
use super::{RunContext, run_build, run_plan};
use crate::build::CommandCompiler;
use crate::config::RunConfig;
use crate::manifest::Manifest;
use crate::source::GitSourceProvider;
use crate::store::OstreeStore;
use crate::work_lock::{LockMode, WorkLock};

/// The real collaborators built from a [`RunConfig`].
pub struct Services {
  pub source: GitSourceProvider,
  pub store: OstreeStore,
  pub compiler: CommandCompiler,
}

impl Services {
  pub fn from_config(config: &RunConfig) -> Self {
    Self {
      source: GitSourceProvider::new(&config.srcdir),
      store: OstreeStore::new(config.repo.clone(), config.store.clone()),
      compiler: CommandCompiler::new(&config.repo, config.compile.clone()),
    }
  }
}

/// Load a manifest, returning it with the directory its component metadata
/// files live in.
fn load_manifest(path: &Path) -> Result<(Manifest, PathBuf), ExecuteError> {
  let path = dunce::canonicalize(path).map_err(|_| ExecuteError::ManifestNotFound(path.to_path_buf()))?;
  let manifest = Manifest::load(&path)?;
  let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
  Ok((manifest, dir))
}

/// Build everything in the manifest at `manifest_path`.
///
/// Holds an exclusive lock on the work directory for the whole run.
pub async fn build(manifest_path: &Path, config: &RunConfig) -> Result<BuildSummary, ExecuteError> {
  let (manifest, dir) = load_manifest(manifest_path)?;
  let _lock = WorkLock::acquire(
    &config.workdir,
    LockMode::Exclusive,
    &format!("build --manifest {}", manifest_path.display()),
  )?;
  info!(manifest = %manifest_path.display(), repo = %config.repo.display(), "loaded manifest");

  let services = Services::from_config(config);
  let mut ctx = RunContext::new(&manifest, dir, &config.workdir);
  run_build(&mut ctx, &services.source, &services.store, &services.compiler).await
}

/// Decide every pair of the manifest at `manifest_path` without building.
pub async fn plan(manifest_path: &Path, config: &RunConfig) -> Result<Plan, ExecuteError> {
  let (manifest, dir) = load_manifest(manifest_path)?;
  let _lock = WorkLock::acquire(
    &config.workdir,
    LockMode::Shared,
    &format!("plan --manifest {}", manifest_path.display()),
  )?;

  let services = Services::from_config(config);
  let ctx = RunContext::new(&manifest, dir, &config.workdir);
  run_plan(&ctx, &services.source, &services.store).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::execute::FailureKind;
  use tempfile::TempDir;

  fn config(temp: &TempDir) -> RunConfig {
    RunConfig {
      repo: temp.path().join("repo"),
      srcdir: temp.path().join("src"),
      workdir: temp.path().join("work"),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn missing_manifest_is_reported() {
    let temp = TempDir::new().unwrap();
    let err = build(&temp.path().join("nope.json"), &config(&temp)).await.unwrap_err();
    assert!(matches!(err, ExecuteError::ManifestNotFound(_)));
    assert_eq!(err.kind(), FailureKind::InvalidInput);
  }

  #[tokio::test]
  async fn invalid_manifest_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("manifest.json");
    std::fs::write(&path, r#"{"name":"p"}"#).unwrap();

    let err = plan(&path, &config(&temp)).await.unwrap_err();
    assert!(matches!(err, ExecuteError::Manifest(_)));
  }

  #[tokio::test]
  async fn empty_manifest_builds_nothing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("manifest.json");
    std::fs::write(&path, r#"{"name":"p","base":"b","architectures":["x86_64"],"components":[]}"#).unwrap();

    let summary = build(&path, &config(&temp)).await.unwrap();
    assert_eq!(summary.built, 0);
    assert!(summary.composed.is_empty());
    assert!(temp.path().join("work/.lock").exists());
  }
}
