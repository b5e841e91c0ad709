//! Hook execution
//!
//! State machine, process runner, per-phase engine and run results.

mod engine;
mod executor;
mod outcome;
mod state;

pub use engine::{EngineOptions, HookEngine};
pub use executor::{CommandOutput, CommandRunner, HookExecutionError, ShellRunner};
pub use outcome::{HookError, HookFailure, HookOutcome, RunResult, RunStatus};
pub use state::{HookState, InvalidTransition, StateTrail, TerminalState};
