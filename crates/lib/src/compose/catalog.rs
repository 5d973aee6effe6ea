use std::collections::BTreeMap;

use serde::Serialize;

use crate::build::{Artifact, ArtifactKind, sort_for_compose};
use crate::manifest::ComponentClass;

/// The artifacts accumulated for one architecture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchitectureBuildState {
  runtime: Vec<Artifact>,
  all: Vec<Artifact>,
}

impl ArchitectureBuildState {
  /// Runtime artifacts of runtime-class components.
  pub fn runtime(&self) -> &[Artifact] {
    &self.runtime
  }

  /// Every artifact of every component.
  pub fn all(&self) -> &[Artifact] {
    &self.all
  }

  /// Append one component's artifacts. Devel-class components contribute to
  /// `all` only.
  fn record(&mut self, class: ComponentClass, mut artifacts: Vec<Artifact>) {
    sort_for_compose(&mut artifacts);
    if class == ComponentClass::Runtime {
      self
        .runtime
        .extend(artifacts.iter().filter(|a| a.kind == ArtifactKind::Runtime).cloned());
    }
    self.all.extend(artifacts);
  }
}

/// Build state for every architecture seen so far in a run.
#[derive(Debug, Clone, Default)]
pub struct ArtifactCatalog {
  states: BTreeMap<String, ArchitectureBuildState>,
}

impl ArtifactCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a component's artifacts for `architecture` and return the updated
  /// state.
  pub fn record(
    &mut self,
    architecture: &str,
    class: ComponentClass,
    artifacts: Vec<Artifact>,
  ) -> &ArchitectureBuildState {
    let state = self.states.entry(architecture.to_string()).or_default();
    state.record(class, artifacts);
    state
  }

  pub fn get(&self, architecture: &str) -> Option<&ArchitectureBuildState> {
    self.states.get(architecture)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &ArchitectureBuildState)> {
    self.states.iter().map(|(arch, state)| (arch.as_str(), state))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn artifact(name: &str, kind: ArtifactKind) -> Artifact {
    Artifact {
      buildroot: "p-x86_64-devel".to_string(),
      buildroot_version: "br1".to_string(),
      name: name.to_string(),
      branch: "master".to_string(),
      version: format!("{}-gabc", name),
      kind,
      path: None,
    }
  }

  fn names(list: &[Artifact]) -> Vec<String> {
    list.iter().map(|a| format!("{}/{}", a.name, a.kind)).collect()
  }

  #[test]
  fn runtime_component_feeds_both_lists() {
    let mut catalog = ArtifactCatalog::new();
    let state = catalog.record(
      "x86_64",
      ComponentClass::Runtime,
      vec![artifact("glib", ArtifactKind::Devel), artifact("glib", ArtifactKind::Runtime)],
    );
    assert_eq!(names(state.all()), vec!["glib/runtime", "glib/devel"]);
    assert_eq!(names(state.runtime()), vec!["glib/runtime"]);
  }

  #[test]
  fn devel_component_stays_out_of_runtime() {
    let mut catalog = ArtifactCatalog::new();
    let state = catalog.record(
      "x86_64",
      ComponentClass::Devel,
      vec![artifact("gtk-doc", ArtifactKind::Runtime), artifact("gtk-doc", ArtifactKind::Devel)],
    );
    assert_eq!(state.all().len(), 2);
    assert!(state.runtime().is_empty());
  }

  #[test]
  fn lists_grow_in_component_order() {
    let mut catalog = ArtifactCatalog::new();
    catalog.record("x86_64", ComponentClass::Runtime, vec![artifact("a", ArtifactKind::Runtime)]);
    catalog.record("x86_64", ComponentClass::Devel, vec![artifact("b", ArtifactKind::Devel)]);
    let state = catalog.record(
      "x86_64",
      ComponentClass::Runtime,
      vec![artifact("c", ArtifactKind::Devel), artifact("c", ArtifactKind::Runtime)],
    );
    assert_eq!(names(state.all()), vec!["a/runtime", "b/devel", "c/runtime", "c/devel"]);
    assert_eq!(names(state.runtime()), vec!["a/runtime", "c/runtime"]);
  }

  #[test]
  fn architectures_are_independent() {
    let mut catalog = ArtifactCatalog::new();
    catalog.record("x86_64", ComponentClass::Runtime, vec![artifact("a", ArtifactKind::Runtime)]);
    catalog.record("i686", ComponentClass::Runtime, vec![]);

    assert_eq!(catalog.get("x86_64").map(|s| s.all().len()), Some(1));
    assert_eq!(catalog.get("i686").map(|s| s.all().len()), Some(0));
    assert!(catalog.get("armv7l").is_none());
    let arches: Vec<_> = catalog.iter().map(|(a, _)| a).collect();
    assert_eq!(arches, vec!["i686", "x86_64"]);
  }
}
