//! Host platform queries.
//!
//! - [`arch`] - host machine name and whether a target needs emulation
//! - [`paths`] - per-user configuration, data and cache directories

pub mod arch;
pub mod paths;

pub use arch::{host_machine, needs_emulation};

/// Host description in `<machine>-<os>` form (e.g. `x86_64-linux`).
pub fn host_triple() -> String {
  format!("{}-{}", host_machine(), std::env::consts::OS)
}
