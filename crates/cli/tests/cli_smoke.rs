//! CLI smoke tests for treebuild.
//!
//! These run the binary with an isolated home directory and a temporary work
//! directory. None of them reaches the compile or store tools.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `treebuild` command whose configuration resolves entirely inside `temp`.
fn treebuild_cmd(temp: &TempDir) -> Command {
  let mut cmd = cargo_bin_cmd!("treebuild");
  cmd
    .env("HOME", temp.path())
    .env("XDG_CONFIG_HOME", temp.path().join("config"))
    .env("XDG_DATA_HOME", temp.path().join("data"))
    .env("XDG_CACHE_HOME", temp.path().join("cache"))
    .env_remove("TREEBUILD_REPO")
    .env_remove("TREEBUILD_SRCDIR")
    .env_remove("TREEBUILD_WORKDIR")
    .env_remove("RUST_LOG");
  cmd
}

fn write_manifest(temp: &TempDir, components: &[&str]) -> std::path::PathBuf {
  let path = temp.path().join("manifest.json");
  let manifest = serde_json::json!({
    "name": "gnomeos",
    "base": "bases/yocto/gnomeos",
    "architectures": ["x86_64"],
    "components": components,
  });
  std::fs::write(&path, manifest.to_string()).unwrap();
  path
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  let temp = TempDir::new().unwrap();
  treebuild_cmd(&temp)
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  let temp = TempDir::new().unwrap();
  treebuild_cmd(&temp)
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("treebuild"));
}

#[test]
fn subcommand_help_works() {
  let temp = TempDir::new().unwrap();
  for cmd in &["build", "plan", "info"] {
    treebuild_cmd(&temp)
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// Build & Plan
// =============================================================================

#[test]
fn build_requires_manifest_flag() {
  let temp = TempDir::new().unwrap();
  treebuild_cmd(&temp)
    .arg("build")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--manifest"));
}

#[test]
fn build_missing_manifest_fails() {
  let temp = TempDir::new().unwrap();
  treebuild_cmd(&temp)
    .args(["build", "--manifest"])
    .arg(temp.path().join("missing.json"))
    .assert()
    .code(1)
    .stderr(predicate::str::contains("manifest not found"));
}

#[test]
fn build_invalid_manifest_fails() {
  let temp = TempDir::new().unwrap();
  let path = temp.path().join("manifest.json");
  std::fs::write(&path, "{ not json").unwrap();

  treebuild_cmd(&temp)
    .args(["build", "--manifest"])
    .arg(&path)
    .assert()
    .code(1)
    .stderr(predicate::str::contains("failed to parse manifest"));
}

#[test]
fn build_empty_manifest_succeeds() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(&temp, &[]);
  let workdir = temp.path().join("work");

  treebuild_cmd(&temp)
    .args(["build", "--manifest"])
    .arg(&manifest)
    .arg("--workdir")
    .arg(&workdir)
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete!"))
    .stdout(predicate::str::contains("Built: 0"));

  assert!(workdir.join(".lock").exists());
}

#[test]
fn plan_reports_bad_source_locator() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(&temp, &["glib"]);
  std::fs::write(temp.path().join("glib.txt"), "SRC=svn:svn://example.org/glib\n").unwrap();

  treebuild_cmd(&temp)
    .args(["plan", "--manifest"])
    .arg(&manifest)
    .arg("--workdir")
    .arg(temp.path().join("work"))
    .assert()
    .code(1)
    .stderr(predicate::str::contains("component 'glib' on x86_64"))
    .stderr(predicate::str::contains("svn"));
}

#[test]
fn plan_empty_manifest_as_json() {
  let temp = TempDir::new().unwrap();
  let manifest = write_manifest(&temp, &[]);

  let output = treebuild_cmd(&temp)
    .args(["plan", "--output", "json", "--manifest"])
    .arg(&manifest)
    .arg("--workdir")
    .arg(temp.path().join("work"))
    .output()
    .unwrap();

  assert!(output.status.success());
  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(plan["entries"], serde_json::json!([]));
}

// =============================================================================
// Info & Configuration
// =============================================================================

#[test]
fn info_shows_resolved_paths() {
  let temp = TempDir::new().unwrap();
  treebuild_cmd(&temp)
    .arg("info")
    .arg("--repo")
    .arg("/srv/ostree/repo")
    .assert()
    .success()
    .stdout(predicate::str::contains("Machine"))
    .stdout(predicate::str::contains("/srv/ostree/repo"));
}

#[test]
fn info_json_follows_environment() {
  let temp = TempDir::new().unwrap();
  let output = treebuild_cmd(&temp)
    .env("TREEBUILD_SRCDIR", "/env/src")
    .args(["info", "--output", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(info["config"]["srcdir"], "/env/src");
  assert_eq!(info["config"]["compile"]["program"], "ostbuild");
}

#[test]
fn missing_config_file_fails() {
  let temp = TempDir::new().unwrap();
  treebuild_cmd(&temp)
    .args(["info", "--config"])
    .arg(temp.path().join("nope.json"))
    .assert()
    .code(1)
    .stderr(predicate::str::contains("failed to read config file"));
}
