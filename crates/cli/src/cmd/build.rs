//! Implementation of the `treebuild build` command.
//!
//! Runs the whole manifest: every component is checked out, decided, built or
//! reused, and the devel and runtime trees of its architecture are recomposed.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;

use treebuild_lib::config::{ConfigOverrides, RunConfig};
use treebuild_lib::execute::build;

use crate::output::{OutputFormat, format_duration, print_json, print_stat, print_success, runtime};

pub fn cmd_build(manifest: &Path, overrides: &ConfigOverrides, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let config = RunConfig::resolve(overrides)?;

  let summary = runtime()?.block_on(build(manifest, &config))?;

  if output.is_json() {
    print_json(&summary)?;
  } else {
    println!();
    print_success("Build complete!");
    print_stat("Built", &summary.built.to_string());
    print_stat("Skipped", &summary.skipped.to_string());
    for target in &summary.composed {
      print_stat("Composed", target);
    }
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
