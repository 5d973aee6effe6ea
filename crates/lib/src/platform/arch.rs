//! Host machine detection and the cross-architecture build decision.

/// Returns the running kernel's machine name (`uname -m`, e.g. `x86_64`, `i686`).
///
/// This is the kernel's view, not the one this binary was compiled for: a
/// 32-bit build on an x86_64 kernel reports `x86_64`.
#[cfg(unix)]
pub fn host_machine() -> String {
  rustix::system::uname().machine().to_string_lossy().into_owned()
}

/// Returns the host machine name in `uname -m` spelling.
#[cfg(not(unix))]
pub fn host_machine() -> String {
  machine_name(std::env::consts::ARCH).to_string()
}

/// Target architectures in manifests use the kernel's machine names, which differ
/// from Rust's `std::env::consts::ARCH` for a few 32-bit targets.
#[cfg_attr(unix, allow(dead_code))]
fn machine_name(rust_arch: &'static str) -> &'static str {
  match rust_arch {
    "x86" => "i686",
    "arm" => "armv7l",
    "powerpc" => "ppc",
    "powerpc64" => "ppc64",
    other => other,
  }
}

/// Whether building for `target` on `host` has to go through an emulation wrapper.
pub fn needs_emulation(host: &str, target: &str) -> bool {
  host != target
}
