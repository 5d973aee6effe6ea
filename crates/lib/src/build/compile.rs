//! The external compile step.
//!
//! Compilation is delegated to a driver program that builds one component inside
//! a buildroot and leaves `artifact-*.tar.gz` archives in a result directory:
//!
//! ```text
//! [<emulator> <arch>] <program> <args...> --repo=<repo> --buildroot=<buildroot>
//!     --workdir=<workdir> --resultdir=<resultdir>
//! ```
//!
//! The driver runs in the component's checkout and its output goes straight to
//! the terminal.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::CompileConfig;
use crate::util::cmd::{self, OutputMode, display_argv};

#[derive(Debug, Error)]
pub enum CompileError {
  #[error("failed to run compiler {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("compile of {buildroot} failed with exit code {code:?}: `{cmd}`")]
  Failed {
    buildroot: String,
    cmd: String,
    code: Option<i32>,
  },
}

/// Everything the compile driver needs for one component on one architecture.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
  /// Component checkout; the driver's working directory.
  pub source_dir: &'a Path,
  pub buildroot: &'a str,
  pub workdir: &'a Path,
  /// Where the driver must leave its artifacts. Exists and is empty.
  pub resultdir: &'a Path,
  /// Target architecture to emulate when it differs from the host.
  pub emulate: Option<&'a str>,
}

/// Runs the compile step.
#[allow(async_fn_in_trait)]
pub trait Compiler {
  async fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileError>;
}

/// A [`Compiler`] that runs the configured driver program.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
  repo: PathBuf,
  config: CompileConfig,
}

impl CommandCompiler {
  pub fn new(repo: impl Into<PathBuf>, config: CompileConfig) -> Self {
    Self {
      repo: repo.into(),
      config,
    }
  }

  /// The program and arguments for `request`.
  pub fn command_line(&self, request: &CompileRequest<'_>) -> (String, Vec<String>) {
    let mut args = Vec::new();
    let program = match request.emulate {
      Some(arch) => {
        args.push(arch.to_string());
        args.push(self.config.program.clone());
        self.config.emulator.clone()
      }
      None => self.config.program.clone(),
    };
    args.extend(self.config.args.iter().cloned());
    args.push(format!("--repo={}", self.repo.display()));
    args.push(format!("--buildroot={}", request.buildroot));
    args.push(format!("--workdir={}", request.workdir.display()));
    args.push(format!("--resultdir={}", request.resultdir.display()));
    (program, args)
  }
}

impl Compiler for CommandCompiler {
  async fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileError> {
    let (program, args) = self.command_line(request);
    info!(buildroot = request.buildroot, emulate = ?request.emulate, "compiling");

    let output = cmd::run(&program, &args, Some(request.source_dir), OutputMode::Inherit)
      .await
      .map_err(|source| CompileError::Spawn {
        program: program.clone(),
        source,
      })?;

    if !output.success() {
      return Err(CompileError::Failed {
        buildroot: request.buildroot.to_string(),
        cmd: display_argv(&program, &args),
        code: output.code,
      });
    }
    Ok(())
  }
}
