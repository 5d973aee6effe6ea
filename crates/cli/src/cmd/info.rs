use anyhow::Result;
use serde::Serialize;

use treebuild_lib::config::{ConfigOverrides, RunConfig};
use treebuild_lib::platform::{host_machine, host_triple};

use crate::output::{OutputFormat, print_json, print_stat};

#[derive(Serialize)]
struct Info {
  version: &'static str,
  machine: String,
  triple: String,
  config: RunConfig,
}

pub fn cmd_info(overrides: &ConfigOverrides, output: OutputFormat) -> Result<()> {
  let info = Info {
    version: env!("CARGO_PKG_VERSION"),
    machine: host_machine(),
    triple: host_triple(),
    config: RunConfig::resolve(overrides)?,
  };

  if output.is_json() {
    return print_json(&info);
  }

  println!("treebuild {}", info.version);
  print_stat("Machine", &info.machine);
  print_stat("Platform", &info.triple);
  print_stat("Repository", &info.config.repo.display().to_string());
  print_stat("Sources", &info.config.srcdir.display().to_string());
  print_stat("Work directory", &info.config.workdir.display().to_string());
  print_stat("Compiler", &info.config.compile.program);
  print_stat("Emulator", &info.config.compile.emulator);
  print_stat("Store tool", &info.config.store.ostree);
  Ok(())
}
