//! Git checkouts via gix.
//!
//! # Layout
//!
//! Each component is checked out at `<srcdir>/<name>/` with its `.git` directory
//! intact. Fresh clones go to `<srcdir>/<name>.tmp/` first and are renamed into
//! place once the worktree is complete, so an interrupted clone is discarded on
//! the next run instead of being mistaken for a checkout.
//!
//! # Updates
//!
//! An existing checkout is fetched from `origin` and moved to the tip of
//! `origin/<branch>`. The local branch is fast-forwarded (or created when the
//! checkout was on another branch), HEAD is pointed at it and the worktree is
//! rewritten from the new tree. Local commits ahead of origin are kept; a local
//! branch that diverged from origin is an error.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use gix::refs::transaction::{Change, PreviousValue, RefEdit};
use gix::refs::{FullName, Target};
use gix::remote::Direction;
use tracing::{debug, info};

use super::{SourceError, SourceProvider};
use crate::fingerprint::SourceLocator;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct GitSourceProvider {
  srcdir: PathBuf,
}

impl GitSourceProvider {
  pub fn new(srcdir: impl Into<PathBuf>) -> Self {
    Self { srcdir: srcdir.into() }
  }

  /// Where the checkout of `name` lives.
  pub fn checkout_path(&self, name: &str) -> PathBuf {
    self.srcdir.join(name)
  }

  fn tmp_path(&self, name: &str) -> PathBuf {
    self.srcdir.join(format!("{}.tmp", name))
  }

  fn open(path: &Path) -> Result<gix::Repository, SourceError> {
    gix::open(path).map_err(|e| SourceError::Open {
      path: path.to_path_buf(),
      source: Box::new(e),
    })
  }
}

impl SourceProvider for GitSourceProvider {
  fn ensure_checkout(&self, name: &str, locator: &SourceLocator) -> Result<PathBuf, SourceError> {
    let dest = self.checkout_path(name);
    if dest.join(".git").exists() {
      debug!(name, path = %dest.display(), "updating existing checkout");
      let repo = Self::open(&dest)?;
      fetch_updates(&repo, &locator.uri)?;
      update_branch(&repo, &dest, locator)?;
      return Ok(dest);
    }

    let tmp = self.tmp_path(name);
    if tmp.exists() {
      debug!(path = %tmp.display(), "removing stale partial clone");
      fs::remove_dir_all(&tmp).map_err(|source| SourceError::Io {
        path: tmp.clone(),
        source,
      })?;
    }
    fs::create_dir_all(&self.srcdir).map_err(|source| SourceError::Io {
      path: self.srcdir.clone(),
      source,
    })?;

    info!(name, url = %locator.uri, branch = %locator.branch, "cloning repository");
    if let Err(e) = clone_branch(&locator.uri, &locator.branch, &tmp) {
      let _ = fs::remove_dir_all(&tmp);
      return Err(e);
    }

    fs::rename(&tmp, &dest).map_err(|source| SourceError::Io {
      path: dest.clone(),
      source,
    })?;
    Ok(dest)
  }

  fn current_revision(&self, name: &str) -> Result<String, SourceError> {
    let path = self.checkout_path(name);
    if !path.join(".git").exists() {
      return Err(SourceError::NotCheckedOut(name.to_string()));
    }
    let repo = Self::open(&path)?;
    let id = repo.head_id().map_err(|e| SourceError::ResolveHead {
      path: path.clone(),
      message: e.to_string(),
    })?;
    Ok(id.to_string())
  }
}

/// Clone `url` into `dest` with `branch` checked out.
fn clone_branch(url: &str, branch: &str, dest: &Path) -> Result<gix::Repository, SourceError> {
  let clone_err = |e: BoxError| SourceError::Clone {
    url: url.to_string(),
    source: e,
  };

  let prepared = gix::prepare_clone(url, dest).map_err(|e| clone_err(Box::new(e)))?;
  let mut prepared = prepared
    .with_ref_name(Some(branch))
    .map_err(|e| clone_err(Box::new(e)))?;

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| clone_err(Box::new(e)))?;

  let (repo, _outcome) = checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| clone_err(Box::new(e)))?;

  Ok(repo)
}

/// Fetch from the default remote, updating `refs/remotes/origin/*`.
fn fetch_updates(repo: &gix::Repository, url: &str) -> Result<(), SourceError> {
  debug!(url, "fetching updates");
  let fetch_err = |e: BoxError| SourceError::Fetch {
    url: url.to_string(),
    source: e,
  };

  let remote = repo
    .find_default_remote(Direction::Fetch)
    .ok_or_else(|| fetch_err("checkout has no remote".into()))?
    .map_err(|e| fetch_err(Box::new(e)))?;

  let connection = remote
    .connect(Direction::Fetch)
    .map_err(|e| fetch_err(Box::new(e)))?;

  connection
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| fetch_err(Box::new(e)))?
    .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| fetch_err(Box::new(e)))?;

  Ok(())
}

/// Move the checkout to `locator.branch` at the tip of its remote-tracking branch.
fn update_branch(repo: &gix::Repository, path: &Path, locator: &SourceLocator) -> Result<(), SourceError> {
  let branch = &locator.branch;
  let update_err = |e: BoxError| SourceError::Update {
    path: path.to_path_buf(),
    source: e,
  };

  let upstream = resolve_ref(repo, &format!("refs/remotes/origin/{}", branch))
    .map_err(update_err)?
    .ok_or_else(|| SourceError::BranchNotFound {
      url: locator.uri.clone(),
      branch: branch.clone(),
    })?;

  let local_name = format!("refs/heads/{}", branch);
  let local = resolve_ref(repo, &local_name).map_err(update_err)?;

  let target = match local {
    None => upstream,
    Some(local) if local == upstream => local,
    Some(local) => {
      let base = repo
        .merge_base(local, upstream)
        .map_err(|e| update_err(Box::new(e)))?
        .detach();
      if base == local {
        upstream
      } else if base == upstream {
        debug!(branch = %branch, "local branch is ahead of origin");
        local
      } else {
        return Err(SourceError::Diverged {
          path: path.to_path_buf(),
          branch: branch.clone(),
        });
      }
    }
  };

  let previous_head = repo.head_id().ok().map(|id| id.detach());

  if local != Some(target) {
    repo
      .reference(local_name.as_str(), target, PreviousValue::Any, "treebuild: update branch")
      .map_err(|e| update_err(Box::new(e)))?;
  }

  let head_ref: FullName = local_name
    .as_str()
    .try_into()
    .map_err(|e: gix::validate::reference::name::Error| update_err(Box::new(e)))?;
  let current_head = repo.head_name().map_err(|e| update_err(Box::new(e)))?;
  if current_head.as_ref() != Some(&head_ref) {
    info!(path = %path.display(), branch = %branch, "switching checkout branch");
    point_head_at(repo, head_ref).map_err(update_err)?;
  }

  if previous_head != Some(target) {
    info!(path = %path.display(), revision = %target, "checking out new revision");
    checkout_commit(repo, target).map_err(update_err)?;
  }
  Ok(())
}

fn resolve_ref(repo: &gix::Repository, name: &str) -> Result<Option<gix::ObjectId>, BoxError> {
  match repo.try_find_reference(name)? {
    Some(mut reference) => Ok(Some(reference.peel_to_id()?.detach())),
    None => Ok(None),
  }
}

fn point_head_at(repo: &gix::Repository, branch: FullName) -> Result<(), BoxError> {
  repo.edit_reference(RefEdit {
    change: Change::Update {
      log: Default::default(),
      expected: PreviousValue::Any,
      new: Target::Symbolic(branch),
    },
    name: "HEAD".try_into()?,
    deref: false,
  })?;
  Ok(())
}

/// Rewrite the worktree and index from `commit`, removing files the previous
/// index tracked that the new tree no longer has.
fn checkout_commit(repo: &gix::Repository, commit: gix::ObjectId) -> Result<(), BoxError> {
  let workdir = repo.workdir().ok_or("repository has no worktree")?;
  let tree = repo.find_commit(commit)?.tree_id()?.detach();
  let previous = repo.open_index().ok();

  let mut index = repo.index_from_tree(&tree)?;
  let mut options = repo.checkout_options(gix::worktree::stack::state::attributes::Source::IdMapping)?;
  options.overwrite_existing = true;

  gix::worktree::state::checkout(
    &mut index,
    workdir,
    repo.objects.clone().into_arc()?,
    &gix::progress::Discard,
    &gix::progress::Discard,
    &gix::interrupt::IS_INTERRUPTED,
    options,
  )?;
  index.write(Default::default())?;

  if let Some(previous) = previous {
    let tracked: HashSet<_> = index.entries().iter().map(|e| e.path(&index)).collect();
    for entry in previous.entries() {
      let rela = entry.path(&previous);
      if !tracked.contains(rela) {
        let stale = workdir.join(gix::path::from_bstr(rela));
        debug!(path = %stale.display(), "removing file dropped upstream");
        let _ = fs::remove_file(stale);
      }
    }
  }
  Ok(())
}
