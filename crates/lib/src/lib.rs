//! treebuild-lib: incremental component builds composed into per-architecture trees
//!
//! A manifest lists components and target architectures. For every pair the
//! library decides whether the previous build is still valid, compiles when it is
//! not, and recomposes a `runtime` and a `devel` tree from all artifacts so far:
//! - `fingerprint`: source locators, artifact versions and build fingerprints
//! - `build`: the rebuild decision and single component builds
//! - `compose`: per-architecture artifact catalogs and composed trees
//! - `execute`: the driver that runs a whole manifest

pub mod build;
pub mod compose;
pub mod config;
pub mod consts;
pub mod execute;
pub mod fingerprint;
pub mod manifest;
pub mod platform;
pub mod source;
pub mod store;
pub mod util;
pub mod work_lock;
