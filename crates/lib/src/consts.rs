//! Names and fixed strings shared across the crate.

pub const APP_NAME: &str = "treebuild";

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TREEBUILD";

/// Branch used when a source locator does not name one.
pub const DEFAULT_BRANCH: &str = "master";

/// Reserved prefix of build outputs in a component's result directory.
pub const ARTIFACT_PREFIX: &str = "artifact-";

/// Suffix of artifact archives.
pub const ARTIFACT_SUFFIX: &str = ".tar.gz";

/// Commit metadata key holding the artifact version (`<name>-g<revision>`).
pub const META_ARTIFACT_VERSION: &str = "ostbuild-artifact-version";

/// Commit metadata key holding the buildroot revision the artifact was built in.
pub const META_BUILDROOT_VERSION: &str = "ostbuild-buildroot-version";

/// Namespace for per-component artifact branches in the store.
pub const ARTIFACT_BRANCH_ROOT: &str = "artifacts";

/// Per-component metadata key carrying the source locator.
pub const META_KEY_SRC: &str = "SRC";

/// Per-component metadata key carrying the classification hint.
pub const META_KEY_COMPONENT: &str = "COMPONENT";

/// Extension of per-component metadata files next to the manifest.
pub const COMPONENT_META_EXT: &str = "txt";
