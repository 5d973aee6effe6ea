//! In-memory stand-ins for the source, store and compiler.
//!
//! The fakes record every mutating call so tests can assert on exactly what
//! would have been written, and nothing touches the network or an ostree repo.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::build::{Artifact, ArtifactKind, CompileError, CompileRequest, Compiler, component_branch};
use crate::consts::{META_ARTIFACT_VERSION, META_BUILDROOT_VERSION};
use crate::fingerprint::SourceLocator;
use crate::source::{SourceError, SourceProvider};
use crate::store::{ArtifactStore, CommitId, StoreError};

/// One `compose` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCall {
  pub target: String,
  pub base: String,
  pub refs: Vec<String>,
}

#[derive(Default)]
struct StoreState {
  refs: BTreeMap<String, String>,
  metadata: HashMap<(String, String), String>,
  commits: Vec<Vec<PathBuf>>,
  composes: Vec<ComposeCall>,
  next_commit: usize,
}

/// Artifact store kept in memory.
///
/// `commit` behaves like `ostbuild commit-artifacts`: each archive becomes a
/// commit on its typed branch, and the component branch points at a commit
/// carrying the artifact and buildroot versions.
#[derive(Default)]
pub struct FakeStore {
  state: Mutex<StoreState>,
  fail_compose: bool,
}

impl FakeStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn failing_compose(mut self) -> Self {
    self.fail_compose = true;
    self
  }

  pub fn set_ref(&self, reference: &str, commit: &str) {
    let mut state = self.state.lock().unwrap();
    state.refs.insert(reference.to_string(), commit.to_string());
  }

  pub fn set_metadata(&self, commit: &str, key: &str, value: &str) {
    let mut state = self.state.lock().unwrap();
    state
      .metadata
      .insert((commit.to_string(), key.to_string()), value.to_string());
  }

  pub fn ref_target(&self, reference: &str) -> Option<String> {
    self.state.lock().unwrap().refs.get(reference).cloned()
  }

  pub fn commits(&self) -> Vec<Vec<PathBuf>> {
    self.state.lock().unwrap().commits.clone()
  }

  pub fn composes(&self) -> Vec<ComposeCall> {
    self.state.lock().unwrap().composes.clone()
  }

  pub fn clear_calls(&self) {
    let mut state = self.state.lock().unwrap();
    state.commits.clear();
    state.composes.clear();
  }
}

impl ArtifactStore for FakeStore {
  async fn rev_parse(&self, reference: &str) -> Result<Option<CommitId>, StoreError> {
    Ok(self.ref_target(reference).map(CommitId))
  }

  async fn read_metadata(&self, commit: &CommitId, key: &str) -> Result<Option<String>, StoreError> {
    let state = self.state.lock().unwrap();
    Ok(state.metadata.get(&(commit.0.clone(), key.to_string())).cloned())
  }

  async fn commit(&self, files: &[PathBuf]) -> Result<(), StoreError> {
    if files.is_empty() {
      return Err(StoreError::EmptyCommit);
    }
    let mut state = self.state.lock().unwrap();
    for file in files {
      let artifact = Artifact::from_path(file).map_err(|e| StoreError::Failed {
        cmd: "commit".to_string(),
        code: Some(1),
        stderr: e.to_string(),
      })?;
      state.next_commit += 1;
      let id = format!("commit{}", state.next_commit);
      state.refs.insert(artifact.branch_ref(), id.clone());
      state.refs.insert(
        component_branch(&artifact.buildroot, &artifact.name, &artifact.branch),
        id.clone(),
      );
      state
        .metadata
        .insert((id.clone(), META_ARTIFACT_VERSION.to_string()), artifact.version.clone());
      state.metadata.insert(
        (id, META_BUILDROOT_VERSION.to_string()),
        artifact.buildroot_version.clone(),
      );
    }
    state.commits.push(files.to_vec());
    Ok(())
  }

  async fn compose(&self, target: &str, base: &str, refs: &[String]) -> Result<(), StoreError> {
    if self.fail_compose {
      return Err(StoreError::Failed {
        cmd: format!("compose {}", target),
        code: Some(1),
        stderr: "compose failed".to_string(),
      });
    }
    let mut state = self.state.lock().unwrap();
    state.composes.push(ComposeCall {
      target: target.to_string(),
      base: base.to_string(),
      refs: refs.to_vec(),
    });
    Ok(())
  }
}

/// Source provider whose checkouts are just names with a revision.
#[derive(Default)]
pub struct FakeSource {
  revisions: Mutex<HashMap<String, String>>,
  unavailable: HashSet<String>,
  checkouts: Mutex<Vec<String>>,
}

impl FakeSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_revision(self, name: &str, revision: &str) -> Self {
    self.set_revision(name, revision);
    self
  }

  /// Make `ensure_checkout` fail for `name`.
  pub fn with_unavailable(mut self, name: &str) -> Self {
    self.unavailable.insert(name.to_string());
    self
  }

  pub fn set_revision(&self, name: &str, revision: &str) {
    self
      .revisions
      .lock()
      .unwrap()
      .insert(name.to_string(), revision.to_string());
  }

  pub fn checkouts(&self) -> Vec<String> {
    self.checkouts.lock().unwrap().clone()
  }
}

impl SourceProvider for FakeSource {
  fn ensure_checkout(&self, name: &str, locator: &SourceLocator) -> Result<PathBuf, SourceError> {
    if self.unavailable.contains(name) {
      return Err(SourceError::Clone {
        url: locator.uri.clone(),
        source: "repository not found".into(),
      });
    }
    self.checkouts.lock().unwrap().push(name.to_string());
    Ok(Path::new("/src").join(name))
  }

  fn current_revision(&self, name: &str) -> Result<String, SourceError> {
    self
      .revisions
      .lock()
      .unwrap()
      .get(name)
      .cloned()
      .ok_or_else(|| SourceError::NotCheckedOut(name.to_string()))
  }
}

/// One `compile` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCall {
  pub component: String,
  pub buildroot: String,
  pub emulate: Option<String>,
}

/// Compiler that writes empty artifact archives into the result directory.
///
/// The component name is the last element of the source directory. Archive
/// names use the configured revision and buildroot version so that a fake
/// store commit records a fingerprint the next run can match.
pub struct FakeCompiler {
  kinds: Vec<ArtifactKind>,
  extra_files: Vec<String>,
  fail: bool,
  revisions: Mutex<HashMap<String, String>>,
  buildroot_version: Mutex<String>,
  calls: Mutex<Vec<CompileCall>>,
}

impl Default for FakeCompiler {
  fn default() -> Self {
    Self {
      kinds: ArtifactKind::ALL.to_vec(),
      extra_files: Vec::new(),
      fail: false,
      revisions: Mutex::new(HashMap::new()),
      buildroot_version: Mutex::new("br1".to_string()),
      calls: Mutex::new(Vec::new()),
    }
  }
}

impl FakeCompiler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_kinds(mut self, kinds: &[ArtifactKind]) -> Self {
    self.kinds = kinds.to_vec();
    self
  }

  pub fn with_extra_files(mut self, names: &[&str]) -> Self {
    self.extra_files = names.iter().map(|n| n.to_string()).collect();
    self
  }

  pub fn failing(mut self) -> Self {
    self.fail = true;
    self
  }

  pub fn set_revision(&self, name: &str, revision: &str) {
    self
      .revisions
      .lock()
      .unwrap()
      .insert(name.to_string(), revision.to_string());
  }

  pub fn set_buildroot_version(&self, version: &str) {
    *self.buildroot_version.lock().unwrap() = version.to_string();
  }

  pub fn calls(&self) -> Vec<CompileCall> {
    self.calls.lock().unwrap().clone()
  }

  pub fn compiled_components(&self) -> Vec<String> {
    self.calls().into_iter().map(|c| c.component).collect()
  }
}

impl Compiler for FakeCompiler {
  async fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileError> {
    let component = request
      .source_dir
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    self.calls.lock().unwrap().push(CompileCall {
      component: component.clone(),
      buildroot: request.buildroot.to_string(),
      emulate: request.emulate.map(str::to_string),
    });

    if self.fail {
      return Err(CompileError::Failed {
        buildroot: request.buildroot.to_string(),
        cmd: "fake-compile".to_string(),
        code: Some(2),
      });
    }

    let revision = self
      .revisions
      .lock()
      .unwrap()
      .get(&component)
      .cloned()
      .unwrap_or_else(|| "0000".to_string());
    let buildroot_version = self.buildroot_version.lock().unwrap().clone();

    for kind in &self.kinds {
      let artifact = Artifact {
        buildroot: request.buildroot.to_string(),
        buildroot_version: buildroot_version.clone(),
        name: component.clone(),
        branch: "master".to_string(),
        version: format!("{}-g{}", component, revision),
        kind: *kind,
        path: None,
      };
      write_empty(&request.resultdir.join(artifact.file_name()));
    }
    for name in &self.extra_files {
      write_empty(&request.resultdir.join(name));
    }
    Ok(())
  }
}

fn write_empty(path: &Path) {
  std::fs::write(path, b"").unwrap();
}
