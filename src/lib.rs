//! Release hooks - configuration merging and lifecycle hook execution
//!
//! Configuration fragments from several sources are merged into one frozen
//! projection. User-defined hooks declared in that projection run around
//! release operations, with command templates resolved against a per-event
//! property context.

pub mod config;
pub mod error;
pub mod hooks;
pub mod model;
pub mod pipeline;
pub mod props;
pub mod timeout;

pub use config::{EffectiveConfig, FormatRegistry, Projection};
pub use error::{ReleaseError, ReleaseResult};
pub use hooks::{
    CommandRunner, EngineOptions, HookEngine, HookFailure, HookState, RunResult, RunStatus,
    ShellRunner,
};
pub use model::{ExecutionEvent, Hook, HookSet, Outcome, Phase, RunKind};
pub use pipeline::ReleasePipeline;
pub use props::{Environment, PropertyAssembler};
pub use release_template::MissingKeyPolicy;
