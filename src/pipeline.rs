//! Release pipeline wiring
//!
//! Startup runs to completion before any hook: fragments are merged and
//! frozen, the run kind is decided, hooks are compiled and the shared
//! property base is assembled. Any error here aborts the whole run.

use crate::config::{ConfigLayers, EffectiveConfig, FormatRegistry};
use crate::error::ReleaseResult;
use crate::hooks::{CommandRunner, EngineOptions, HookEngine};
use crate::model::{targets, ExecutionEvent, HookSet, RunKind, Target};
use crate::props::{Environment, PropertyAssembler};

/// Everything a run needs, built once at startup
#[derive(Debug, Clone)]
pub struct ReleasePipeline {
    config: EffectiveConfig,
    run_kind: RunKind,
    hooks: HookSet,
    assembler: PropertyAssembler,
}

impl ReleasePipeline {
    /// Load and merge `layers`, then [`ReleasePipeline::prepare`]
    pub fn load(
        layers: &ConfigLayers,
        registry: &FormatRegistry,
        run_kind: Option<RunKind>,
        env: &Environment,
    ) -> ReleaseResult<Self> {
        let config = EffectiveConfig::load(layers, registry)?;
        Self::prepare(config, run_kind, env)
    }

    /// Build the hook model and property base from a merged config.
    ///
    /// `run_kind` overrides `release.kind` from the configuration.
    pub fn prepare(
        config: EffectiveConfig,
        run_kind: Option<RunKind>,
        env: &Environment,
    ) -> ReleaseResult<Self> {
        let projection = config.projection();
        let run_kind = match run_kind {
            Some(kind) => kind,
            None => RunKind::from_projection(projection)?,
        };
        let hooks = HookSet::from_projection(projection, run_kind)?;
        let assembler = PropertyAssembler::new(projection, env, run_kind);

        tracing::debug!(
            run_kind = %run_kind,
            before = hooks.before.len(),
            after = hooks.after.len(),
            "pipeline prepared"
        );

        Ok(Self {
            config,
            run_kind,
            hooks,
            assembler,
        })
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn run_kind(&self) -> RunKind {
        self.run_kind
    }

    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    /// Distributions declared in the configuration
    pub fn targets(&self) -> Vec<Target> {
        targets(self.config.projection())
    }

    /// One copy of `event` per declared target
    pub fn target_events(&self, event: &ExecutionEvent) -> Vec<ExecutionEvent> {
        self.targets().iter().map(|t| t.scope(event)).collect()
    }

    /// Engine over this pipeline's hooks
    pub fn engine<R: CommandRunner>(&self, runner: R, options: EngineOptions) -> HookEngine<R> {
        HookEngine::new(self.hooks.clone(), self.assembler.clone(), runner, options)
    }
}
