//! Product manifest and per-component metadata.
//!
//! A manifest names the product, its base trees, the target architectures and the
//! ordered list of components. Each component has a `<name>.txt` file next to the
//! manifest with `KEY=value` lines (`SRC` required, `COMPONENT` optional).

mod types;

pub use types::*;
