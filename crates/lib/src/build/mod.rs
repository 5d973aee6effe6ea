//! Deciding, running and collecting component builds.
//!
//! For each (component, architecture) pair the orchestrator first asks the
//! decision engine whether the previous build is still valid. A build is skipped
//! only when both the source revision and the buildroot revision recorded on the
//! previous artifact commit match the current ones. Otherwise the component
//! builder compiles into a fresh result directory, checks the artifact set and
//! commits it to the store.
//!
//! # Submodules
//!
//! - [`decide`] - rebuild/skip decision and reuse of previous artifacts
//! - [`compile`] - the external compile step
//! - [`execute`] - running one component build and collecting its artifacts

pub mod compile;
pub mod decide;
pub mod execute;
mod types;

pub use compile::{CommandCompiler, CompileError, CompileRequest, Compiler};
pub use decide::{DecideError, Decision, PreviousBuild, RebuildReason, decide, previous_artifacts};
pub use execute::ComponentBuilder;
pub use types::*;
