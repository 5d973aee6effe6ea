//! Running a manifest.
//!
//! Components are processed in manifest order and, within each component,
//! architectures in manifest order. Each (component, architecture) pair is taken
//! through metadata loading, checkout, the rebuild decision, a build or a reuse of
//! the previous artifacts, the catalog update and recomposition of that
//! architecture's trees before the next pair starts. The first failure ends the
//! run.
//!
//! The driver is generic over the source provider, the artifact store and the
//! compiler; [`build`] and [`plan`] wire up the real ones from a [`RunConfig`].
//!
//! [`RunConfig`]: crate::config::RunConfig

mod run;
pub mod types;


use std::path::PathBuf;

use tracing::{info, instrument};

use crate::build::{Artifact, BuildTarget, ComponentBuilder, Compiler, Decision, decide, previous_artifacts};
use crate::compose::{ArtifactCatalog, compose_architecture};
use crate::manifest::{ComponentMeta, Manifest};
use crate::platform::host_machine;
use crate::source::SourceProvider;
use crate::store::ArtifactStore;

pub use run::{Services, build, plan};
pub use types::{BuildSummary, ExecuteError, FailureKind, Operation, PairOutcome, Plan, StepError};

/// State owned by one run and passed to every step.
pub struct RunContext<'m> {
  manifest: &'m Manifest,
  manifest_dir: PathBuf,
  workdir: PathBuf,
  host: String,
  catalog: ArtifactCatalog,
}

impl<'m> RunContext<'m> {
  /// Component metadata files are read from `manifest_dir`; compiles happen
  /// under `workdir`.
  pub fn new(manifest: &'m Manifest, manifest_dir: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
    Self {
      manifest,
      manifest_dir: manifest_dir.into(),
      workdir: workdir.into(),
      host: host_machine(),
      catalog: ArtifactCatalog::new(),
    }
  }

  /// Override the machine name builds are considered to run on.
  pub fn with_host(mut self, host: &str) -> Self {
    self.host = host.to_string();
    self
  }

  pub fn catalog(&self) -> &ArtifactCatalog {
    &self.catalog
  }

  fn load_meta(&self, component: &str, architecture: &str) -> Result<ComponentMeta, ExecuteError> {
    ComponentMeta::load(&self.manifest_dir, component).map_err(ExecuteError::step(
      component,
      architecture,
      Operation::ParseSource,
    ))
  }
}

/// Build every (component, architecture) pair of the manifest.
pub async fn run_build<S, A, C>(
  ctx: &mut RunContext<'_>,
  source: &S,
  store: &A,
  compiler: &C,
) -> Result<BuildSummary, ExecuteError>
where
  S: SourceProvider,
  A: ArtifactStore,
  C: Compiler,
{
  let manifest = ctx.manifest;
  info!(
    name = %manifest.name,
    components = manifest.components.len(),
    architectures = manifest.architectures.len(),
    "starting build"
  );

  let mut summary = BuildSummary::default();
  for component in &manifest.components {
    for architecture in &manifest.architectures {
      let (outcome, composed) = build_pair(ctx, source, store, compiler, component, architecture).await?;
      summary.record(outcome, composed);
    }
  }

  info!(built = summary.built, skipped = summary.skipped, "build finished");
  Ok(summary)
}

#[instrument(skip_all, fields(component = %component, arch = %architecture))]
async fn build_pair<S, A, C>(
  ctx: &mut RunContext<'_>,
  source: &S,
  store: &A,
  compiler: &C,
  component: &str,
  architecture: &str,
) -> Result<(PairOutcome, Vec<String>), ExecuteError>
where
  S: SourceProvider,
  A: ArtifactStore,
  C: Compiler,
{
  let meta = ctx.load_meta(component, architecture)?;
  let target = BuildTarget::new(ctx.manifest, component, architecture, &meta.src);

  let source_dir = source
    .ensure_checkout(component, &meta.src)
    .map_err(ExecuteError::step(component, architecture, Operation::Checkout))?;

  let decision = decide(source, store, &target)
    .await
    .map_err(ExecuteError::step(component, architecture, Operation::Decide))?;

  let artifacts = match &decision {
    Decision::Rebuild(reason) => {
      info!(%reason, "rebuilding");
      let builder = ComponentBuilder::new(store, compiler, &ctx.workdir, &ctx.host);
      builder
        .build(&target, &source_dir)
        .await
        .map_err(ExecuteError::step(component, architecture, Operation::Build))?
    }
    Decision::Skip(previous) => {
      info!(commit = %previous.commit, "reusing previous build");
      previous_artifacts(store, &target, previous)
        .await
        .map_err(ExecuteError::step(component, architecture, Operation::Reuse))?
    }
  };

  let branches: Vec<String> = artifacts.iter().map(Artifact::branch_ref).collect();
  let state = ctx.catalog.record(architecture, meta.class, artifacts);
  let composed = compose_architecture(store, ctx.manifest, architecture, state)
    .await
    .map_err(ExecuteError::step(component, architecture, Operation::Compose))?;

  let outcome = PairOutcome {
    component: component.to_string(),
    architecture: architecture.to_string(),
    class: meta.class,
    decision,
    artifacts: branches,
  };
  Ok((outcome, composed))
}

/// Decide every pair without compiling, committing or composing.
///
/// Missing sources are still checked out, since the decision needs their
/// current revision.
pub async fn run_plan<S, A>(ctx: &RunContext<'_>, source: &S, store: &A) -> Result<Plan, ExecuteError>
where
  S: SourceProvider,
  A: ArtifactStore,
{
  let manifest = ctx.manifest;
  let mut plan = Plan::default();
  for component in &manifest.components {
    for architecture in &manifest.architectures {
      plan.entries.push(plan_pair(ctx, source, store, component, architecture).await?);
    }
  }
  Ok(plan)
}

#[instrument(skip_all, fields(component = %component, arch = %architecture))]
async fn plan_pair<S, A>(
  ctx: &RunContext<'_>,
  source: &S,
  store: &A,
  component: &str,
  architecture: &str,
) -> Result<PairOutcome, ExecuteError>
where
  S: SourceProvider,
  A: ArtifactStore,
{
  let meta = ctx.load_meta(component, architecture)?;
  let target = BuildTarget::new(ctx.manifest, component, architecture, &meta.src);

  source
    .ensure_checkout(component, &meta.src)
    .map_err(ExecuteError::step(component, architecture, Operation::Checkout))?;
  let decision = decide(source, store, &target)
    .await
    .map_err(ExecuteError::step(component, architecture, Operation::Decide))?;

  Ok(PairOutcome {
    component: component.to_string(),
    architecture: architecture.to_string(),
    class: meta.class,
    decision,
    artifacts: Vec::new(),
  })
}
