//! Implementation of the `treebuild plan` command.
//!
//! Checks out sources and reports the rebuild decision for every
//! (component, architecture) pair. Nothing is compiled, committed or composed.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use treebuild_lib::build::Decision;
use treebuild_lib::config::{ConfigOverrides, RunConfig};
use treebuild_lib::execute::{self, PairOutcome};

use crate::output::{OutputFormat, print_info, print_json, runtime, symbols, truncate_hash};

pub fn cmd_plan(manifest: &Path, overrides: &ConfigOverrides, output: OutputFormat) -> Result<()> {
  let config = RunConfig::resolve(overrides)?;
  let plan = runtime()?.block_on(execute::plan(manifest, &config))?;

  if output.is_json() {
    return print_json(&plan);
  }

  for entry in &plan.entries {
    println!("{}", format_entry(entry));
  }
  println!();
  print_info(&format!(
    "{} to rebuild, {} up to date",
    plan.rebuild_count(),
    plan.entries.len() - plan.rebuild_count()
  ));
  Ok(())
}

fn format_entry(entry: &PairOutcome) -> String {
  let pair = format!("{} ({})", entry.component, entry.architecture);
  match &entry.decision {
    Decision::Rebuild(reason) => format!(
      "  {} {} {}",
      symbols::REBUILD.if_supports_color(Stream::Stdout, |s| s.yellow()),
      pair,
      format!("rebuild: {}", reason).if_supports_color(Stream::Stdout, |s| s.dimmed())
    ),
    Decision::Skip(previous) => format!(
      "  {} {} {}",
      symbols::SKIP.if_supports_color(Stream::Stdout, |s| s.green()),
      pair,
      format!("up to date at {}", truncate_hash(&previous.fingerprint.source_revision))
        .if_supports_color(Stream::Stdout, |s| s.dimmed())
    ),
  }
}
