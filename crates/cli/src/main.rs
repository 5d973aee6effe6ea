mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use treebuild_lib::config::ConfigOverrides;

use crate::cmd::{cmd_build, cmd_info, cmd_plan};
use crate::output::{OutputFormat, print_error};

/// Incremental component builds composed into per-architecture trees
#[derive(Parser)]
#[command(name = "treebuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Configuration file (JSON)
  #[arg(long, global = true, value_name = "PATH")]
  config: Option<PathBuf>,

  /// Artifact repository
  #[arg(long, global = true, value_name = "PATH")]
  repo: Option<PathBuf>,

  /// Parent directory of component checkouts
  #[arg(long, global = true, value_name = "PATH")]
  srcdir: Option<PathBuf>,

  /// Scratch directory for compiles
  #[arg(long, global = true, value_name = "PATH")]
  workdir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build every component of a manifest and recompose its trees
  Build {
    /// Manifest file
    #[arg(long, value_name = "PATH")]
    manifest: PathBuf,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Show which components would be rebuilt, without building
  Plan {
    /// Manifest file
    #[arg(long, value_name = "PATH")]
    manifest: PathBuf,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Show host and configuration details
  Info {
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let overrides = ConfigOverrides {
    config_file: cli.config,
    repo: cli.repo,
    srcdir: cli.srcdir,
    workdir: cli.workdir,
  };

  let result = match cli.command {
    Commands::Build { manifest, output } => cmd_build(&manifest, &overrides, output),
    Commands::Plan { manifest, output } => cmd_plan(&manifest, &overrides, output),
    Commands::Info { output } => cmd_info(&overrides, output),
  };

  if let Err(err) = result {
    print_error(&err.to_string());
    std::process::exit(1);
  }
}
