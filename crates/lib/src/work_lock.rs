//! Work directory locking.
//!
//! Builds write to shared result directories and recompose trees, so two runs
//! against the same work directory must not overlap. `build` takes an exclusive
//! lock on `<workdir>/.lock`; `plan` only reads and takes a shared one.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const LOCK_FILENAME: &str = ".lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
  Shared,
  Exclusive,
}

/// Written into the lock file by the exclusive holder.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
  pub version: u32,
  pub pid: u32,
  pub started_at_unix: u64,
  pub command: String,
  pub workdir: PathBuf,
}

#[derive(Debug, Error)]
pub enum WorkLockError {
  #[error(
    "work directory is locked by another process: {command} (PID {pid}, started {started_at})\n\
     If you're sure no treebuild process is running, remove the lock file:\n  {lock_path}"
  )]
  Contention {
    command: String,
    pid: u32,
    started_at: String,
    lock_path: PathBuf,
  },

  #[error(
    "work directory is locked (could not read lock metadata)\n\
     If you're sure no treebuild process is running, remove the lock file:\n  {lock_path}"
  )]
  ContentionUnknown { lock_path: PathBuf },

  #[error("failed to create work directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to open lock file: {0}")]
  OpenFile(#[source] io::Error),

  #[error("failed to write lock metadata: {0}")]
  WriteMetadata(#[source] io::Error),

  #[error("failed to acquire lock: {0}")]
  LockFailed(#[source] io::Error),
}

/// A held lock; released when dropped.
pub struct WorkLock {
  file: File,
  lock_path: PathBuf,
}

impl WorkLock {
  /// Lock `workdir`, creating it if needed. Fails immediately if another
  /// process holds a conflicting lock.
  pub fn acquire(workdir: &Path, mode: LockMode, command: &str) -> Result<Self, WorkLockError> {
    std::fs::create_dir_all(workdir).map_err(|source| WorkLockError::CreateDir {
      path: workdir.to_path_buf(),
      source,
    })?;
    let lock_path = workdir.join(LOCK_FILENAME);

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&lock_path)
      .map_err(WorkLockError::OpenFile)?;

    if let Err(err) = try_lock(&file, mode) {
      if err.kind() == io::ErrorKind::WouldBlock {
        return Err(read_contention_error(&lock_path));
      }
      return Err(WorkLockError::LockFailed(err));
    }

    if mode == LockMode::Exclusive {
      write_metadata(&file, command, workdir)?;
    }

    Ok(WorkLock { file, lock_path })
  }

  /// Read the metadata through the held handle. Opening the file again would
  /// fail on Windows while the lock is held.
  pub fn read_metadata(&self) -> io::Result<LockMetadata> {
    use std::io::{Seek, SeekFrom};

    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn lock_path(&self) -> &Path {
    &self.lock_path
  }
}

fn write_metadata(file: &File, command: &str, workdir: &Path) -> Result<(), WorkLockError> {
  let metadata = LockMetadata {
    version: 1,
    pid: std::process::id(),
    started_at_unix: SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs(),
    command: command.to_string(),
    workdir: workdir.to_path_buf(),
  };

  file.set_len(0).map_err(WorkLockError::WriteMetadata)?;
  let mut writer = io::BufWriter::new(file);
  serde_json::to_writer_pretty(&mut writer, &metadata)
    .map_err(|e| WorkLockError::WriteMetadata(io::Error::other(e)))?;
  writer.flush().map_err(WorkLockError::WriteMetadata)?;

  Ok(())
}

fn read_contention_error(lock_path: &Path) -> WorkLockError {
  if let Ok(mut file) = File::open(lock_path) {
    let mut contents = String::new();
    if file.read_to_string(&mut contents).is_ok()
      && let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents)
    {
      return WorkLockError::Contention {
        command: metadata.command,
        pid: metadata.pid,
        started_at: format!("Unix timestamp {}", metadata.started_at_unix),
        lock_path: lock_path.to_path_buf(),
      };
    }
  }

  WorkLockError::ContentionUnknown {
    lock_path: lock_path.to_path_buf(),
  }
}

#[cfg(unix)]
fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  let operation = match mode {
    LockMode::Shared => FlockOperation::NonBlockingLockShared,
    LockMode::Exclusive => FlockOperation::NonBlockingLockExclusive,
  };

  flock(file.as_fd(), operation).map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::HANDLE;
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;
  let flags = match mode {
    LockMode::Shared => LOCKFILE_FAIL_IMMEDIATELY,
    LockMode::Exclusive => LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
  };

  // SAFETY: OVERLAPPED is plain data and valid when zeroed; the handle is open.
  let result = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(handle, flags, 0, 1, 0, &mut overlapped)
  };

  if result == 0 {
    Err(io::Error::last_os_error())
  } else {
    Ok(())
  }
}
