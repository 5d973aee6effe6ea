//! Building one component for one architecture.
//!
//! The result directory `<workdir>/<component>/results` is emptied before every
//! compile so that only archives from this run are collected. A compile must
//! leave one or two `artifact-*` archives behind; all of them are committed to
//! the store in one batch.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use super::compile::{CompileRequest, Compiler};
use super::types::{Artifact, BuildError, BuildTarget, sort_for_compose};
use crate::consts::ARTIFACT_PREFIX;
use crate::platform::needs_emulation;
use crate::store::ArtifactStore;

const MIN_ARTIFACTS: usize = 1;
const MAX_ARTIFACTS: usize = 2;

/// Compiles components and commits what they produce.
pub struct ComponentBuilder<'a, A, C> {
  store: &'a A,
  compiler: &'a C,
  workdir: &'a Path,
  host: &'a str,
}

impl<'a, A, C> ComponentBuilder<'a, A, C>
where
  A: ArtifactStore,
  C: Compiler,
{
  /// `host` is the machine name builds run on; other targets are emulated.
  pub fn new(store: &'a A, compiler: &'a C, workdir: &'a Path, host: &'a str) -> Self {
    Self {
      store,
      compiler,
      workdir,
      host,
    }
  }

  pub fn result_dir(&self, component: &str) -> PathBuf {
    self.workdir.join(component).join("results")
  }

  /// Compile `target` from `source_dir` and commit its artifacts.
  ///
  /// Returns the committed artifacts with runtime ones first.
  pub async fn build(&self, target: &BuildTarget<'_>, source_dir: &Path) -> Result<Vec<Artifact>, BuildError> {
    let resultdir = self.result_dir(target.component);
    reset_dir(&resultdir).await.map_err(|source| BuildError::ResultDir {
      path: resultdir.clone(),
      source,
    })?;

    let emulate = needs_emulation(self.host, target.architecture).then_some(target.architecture);
    let request = CompileRequest {
      source_dir,
      buildroot: &target.buildroot,
      workdir: self.workdir,
      resultdir: &resultdir,
      emulate,
    };
    self.compiler.compile(&request).await?;

    let files = collect_artifact_files(&resultdir).await?;
    let mut artifacts = files
      .iter()
      .map(|path| Artifact::from_path(path))
      .collect::<Result<Vec<_>, _>>()?;

    info!(count = files.len(), "committing artifacts");
    self.store.commit(&files).await.map_err(BuildError::Commit)?;

    sort_for_compose(&mut artifacts);
    Ok(artifacts)
  }
}

/// Remove `dir` if present and create it empty.
async fn reset_dir(dir: &Path) -> io::Result<()> {
  match fs::remove_dir_all(dir).await {
    Ok(()) => debug!(path = %dir.display(), "cleared result directory"),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(e),
  }
  fs::create_dir_all(dir).await
}

/// The `artifact-*` files in `dir`, sorted by name.
async fn collect_artifact_files(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
  let read_err = |source| BuildError::ReadResults {
    path: dir.to_path_buf(),
    source,
  };

  let mut files = Vec::new();
  let mut entries = fs::read_dir(dir).await.map_err(read_err)?;
  while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
    let name = entry.file_name();
    if name.to_string_lossy().starts_with(ARTIFACT_PREFIX) {
      files.push(entry.path());
    }
  }
  files.sort();

  if !(MIN_ARTIFACTS..=MAX_ARTIFACTS).contains(&files.len()) {
    return Err(BuildError::ArtifactCount {
      dir: dir.to_path_buf(),
      found: files.len(),
    });
  }
  Ok(files)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::ArtifactKind;
  use crate::fingerprint::{SourceKind, SourceLocator};
  use crate::manifest::Manifest;
  use crate::util::testutil::{FakeCompiler, FakeStore};
  use tempfile::TempDir;

  fn manifest() -> Manifest {
    Manifest {
      name: "p".to_string(),
      base: "b".to_string(),
      architectures: vec!["x86_64".to_string(), "i686".to_string()],
      components: vec!["glib".to_string()],
    }
  }

  fn locator() -> SourceLocator {
    SourceLocator {
      kind: SourceKind::Git,
      uri: "git://example.org/glib".to_string(),
      branch: "master".to_string(),
    }
  }

  async fn build(compiler: &FakeCompiler, store: &FakeStore, workdir: &Path, arch: &str) -> Result<Vec<Artifact>, BuildError> {
    let manifest = manifest();
    let locator = locator();
    let target = BuildTarget::new(&manifest, "glib", arch, &locator);
    let builder = ComponentBuilder::new(store, compiler, workdir, "x86_64");
    builder.build(&target, Path::new("/src/glib")).await
  }

  #[tokio::test]
  async fn two_artifacts_are_committed_in_one_batch() {
    let temp = TempDir::new().unwrap();
    let store = FakeStore::new();
    let compiler = FakeCompiler::new().with_kinds(&[ArtifactKind::Devel, ArtifactKind::Runtime]);

    let artifacts = build(&compiler, &store, temp.path(), "x86_64").await.unwrap();

    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0].kind, ArtifactKind::Runtime);
    assert_eq!(artifacts[1].kind, ArtifactKind::Devel);
    let commits = store.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].len(), 2);
  }

  #[tokio::test]
  async fn stale_results_are_removed_before_compiling() {
    let temp = TempDir::new().unwrap();
    let results = temp.path().join("glib/results");
    std::fs::create_dir_all(&results).unwrap();
    std::fs::write(results.join("artifact-old,x,glib,master,glib-gold-devel.tar.gz"), "").unwrap();
    let store = FakeStore::new();
    let compiler = FakeCompiler::new().with_kinds(&[ArtifactKind::Runtime]);

    let artifacts = build(&compiler, &store, temp.path(), "x86_64").await.unwrap();

    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].kind, ArtifactKind::Runtime);
  }

  #[tokio::test]
  async fn no_artifacts_is_error() {
    let temp = TempDir::new().unwrap();
    let store = FakeStore::new();
    let compiler = FakeCompiler::new().with_kinds(&[]);

    let err = build(&compiler, &store, temp.path(), "x86_64").await.unwrap_err();
    assert!(matches!(err, BuildError::ArtifactCount { found: 0, .. }));
    assert!(store.commits().is_empty());
  }

  #[tokio::test]
  async fn three_artifacts_is_error() {
    let temp = TempDir::new().unwrap();
    let store = FakeStore::new();
    let compiler = FakeCompiler::new().with_extra_files(&["artifact-extra.tar.gz"]);

    let err = build(&compiler, &store, temp.path(), "x86_64").await.unwrap_err();
    assert!(matches!(err, BuildError::ArtifactCount { found: 3, .. }));
    assert!(store.commits().is_empty());
  }

  #[tokio::test]
  async fn unrelated_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    let store = FakeStore::new();
    let compiler = FakeCompiler::new()
      .with_kinds(&[ArtifactKind::Runtime])
      .with_extra_files(&["build.log"]);

    let artifacts = build(&compiler, &store, temp.path(), "x86_64").await.unwrap();
    assert_eq!(artifacts.len(), 1);
  }

  #[tokio::test]
  async fn foreign_architecture_is_emulated() {
    let temp = TempDir::new().unwrap();
    let store = FakeStore::new();
    let compiler = FakeCompiler::new();

    build(&compiler, &store, temp.path(), "i686").await.unwrap();
    build(&compiler, &store, temp.path(), "x86_64").await.unwrap();

    let calls = compiler.calls();
    assert_eq!(calls[0].emulate.as_deref(), Some("i686"));
    assert_eq!(calls[0].buildroot, "p-i686-devel");
    assert_eq!(calls[1].emulate, None);
  }

  #[tokio::test]
  async fn compile_failure_commits_nothing() {
    let temp = TempDir::new().unwrap();
    let store = FakeStore::new();
    let compiler = FakeCompiler::new().failing();

    let err = build(&compiler, &store, temp.path(), "x86_64").await.unwrap_err();
    assert!(matches!(err, BuildError::Compile(_)));
    assert!(store.commits().is_empty());
  }
}
