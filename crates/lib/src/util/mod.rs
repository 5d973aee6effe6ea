//! Shared utilities.
//!
//! Subprocess execution used by the store and compiler adapters, plus test fakes
//! for the collaborator traits.

pub mod cmd;

#[cfg(test)]
pub mod testutil;
