//! Subprocess execution.
//!
//! External tools (the artifact store CLI, the compile driver) are run through
//! here. Callers decide what a non-zero exit means: the store treats some failures
//! as "not found", the compiler treats every failure as fatal.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// How the child's stdout/stderr are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
  /// Collect both streams into the returned [`CmdOutput`].
  Capture,
  /// Let the child write to our stdout/stderr (long-running builds).
  Inherit,
}

/// Outcome of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutput {
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CmdOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// Trimmed stdout, the usual shape of a single-value answer.
  pub fn value(&self) -> &str {
    self.stdout.trim()
  }
}

/// Render an argv for log and error messages.
pub fn display_argv(program: &str, args: &[String]) -> String {
  let mut line = program.to_string();
  for arg in args {
    line.push(' ');
    line.push_str(arg);
  }
  line
}

/// Run `program` with `args` to completion.
///
/// Only a failure to spawn or wait is an `Err`; a non-zero exit is reported in
/// the returned [`CmdOutput`].
pub async fn run(program: &str, args: &[String], cwd: Option<&Path>, mode: OutputMode) -> std::io::Result<CmdOutput> {
  let mut command = Command::new(program);
  command.args(args).stdin(Stdio::null());
  if let Some(dir) = cwd {
    command.current_dir(dir);
  }

  debug!(cmd = %display_argv(program, args), cwd = ?cwd, "spawning process");

  match mode {
    OutputMode::Capture => {
      let output = command.output().await?;
      let result = CmdOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      };
      if !result.success() && !result.stderr.is_empty() {
        debug!(stderr = %result.stderr.trim(), "command stderr");
      }
      Ok(result)
    }
    OutputMode::Inherit => {
      let status = command.stdout(Stdio::inherit()).stderr(Stdio::inherit()).status().await?;
      Ok(CmdOutput {
        code: status.code(),
        stdout: String::new(),
        stderr: String::new(),
      })
    }
  }
}
