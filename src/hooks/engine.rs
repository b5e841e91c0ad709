//! Hook execution engine
//!
//! Hooks of one phase run strictly in declared order on the calling thread.
//! A failed hook either logs a warning and lets the phase continue
//! (`continue_on_error`) or aborts the remaining hooks of that phase. Across
//! independent targets [`HookEngine::run_targets`] runs phases concurrently,
//! each target with its own property context.

use release_template::{resolve, MissingKeyPolicy};
use std::time::{Duration, Instant};

use crate::model::{ExecutionEvent, Hook, HookSet, Phase};
use crate::props::PropertyAssembler;

use super::executor::CommandRunner;
use super::outcome::{HookError, HookFailure, HookOutcome, RunResult, RunStatus};
use super::state::HookState;

/// Caller-level engine settings
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Policy for placeholders that resolve to nothing (default: strict)
    pub missing_keys: MissingKeyPolicy,

    /// Applied to hooks that declare no timeout of their own
    pub default_timeout: Option<Duration>,
}

/// Drives the hooks of one run
#[derive(Debug)]
pub struct HookEngine<R> {
    hooks: HookSet,
    assembler: PropertyAssembler,
    runner: R,
    options: EngineOptions,
}

impl<R: CommandRunner> HookEngine<R> {
    /// Engine over loaded hooks, a property assembler and a command runner
    pub fn new(hooks: HookSet, assembler: PropertyAssembler, runner: R, options: EngineOptions) -> Self {
        Self {
            hooks,
            assembler,
            runner,
            options,
        }
    }

    /// Hooks this engine runs
    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    /// The command runner hooks are executed with
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run every hook of `phase` for `event`, in declared order.
    pub fn run(&self, phase: Phase, event: &ExecutionEvent) -> RunResult {
        let started = Instant::now();
        let event = event.clone().in_phase(phase);
        let hooks = self.hooks.hooks(phase);

        let mut outcomes: Vec<HookOutcome> = hooks.iter().map(|h| HookOutcome::pending(&h.name)).collect();
        let mut warnings = Vec::new();
        let mut failure = None;

        for (hook, outcome) in hooks.iter().zip(outcomes.iter_mut()) {
            let Some(error) = self.evaluate(hook, &event, outcome) else {
                continue;
            };
            let hook_failure = HookFailure {
                hook: hook.name.clone(),
                phase,
                event: event.name.clone(),
                target: event.target.clone(),
                cause: error,
            };

            if hook.continue_on_error {
                tracing::warn!(
                    hook = %hook.name,
                    phase = %phase,
                    event = %event.name,
                    error = %hook_failure.cause,
                    "hook failed, continuing"
                );
                warnings.push(hook_failure);
            } else {
                tracing::error!(
                    hook = %hook.name,
                    phase = %phase,
                    event = %event.name,
                    error = %hook_failure.cause,
                    "hook failed, aborting phase"
                );
                failure = Some(hook_failure);
                break;
            }
        }

        let status = match (&failure, warnings.is_empty()) {
            (Some(_), _) => RunStatus::Failed,
            (None, false) => RunStatus::CompletedWithWarnings,
            (None, true) => RunStatus::Succeeded,
        };

        RunResult {
            phase,
            event: event.name,
            target: event.target,
            outcomes,
            status,
            duration_ms: started.elapsed().as_millis() as u64,
            failure,
            warnings,
        }
    }

    /// Run `phase` once per event, one scoped thread per event.
    ///
    /// Each event is expected to carry its own `target`. A fatal failure in
    /// one target never stops another. Results keep the input order.
    pub fn run_targets(&self, phase: Phase, events: &[ExecutionEvent]) -> Vec<(String, RunResult)> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = events
                .iter()
                .map(|event| {
                    let name = event.target.clone().unwrap_or_else(|| event.name.clone());
                    (name, scope.spawn(move || self.run(phase, event)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    let result = match handle.join() {
                        Ok(result) => result,
                        Err(panic) => std::panic::resume_unwind(panic),
                    };
                    (name, result)
                })
                .collect()
        })
    }

    /// Drive one hook through its state machine. Returns the failure cause
    /// when the hook ends FAILED.
    fn evaluate(&self, hook: &Hook, event: &ExecutionEvent, outcome: &mut HookOutcome) -> Option<HookError> {
        let started = Instant::now();

        if let Some(reason) = self.filter_reason(hook, event) {
            tracing::debug!(hook = %hook.name, event = %event.name, reason, "hook filtered out");
            advance(outcome, HookState::FilteredOut);
            return None;
        }
        advance(outcome, HookState::Active);

        advance(outcome, HookState::Resolving);
        let mut props = self.assembler.full_props(event);
        props.insert("hook.name", hook.name.as_str());
        let command = match resolve(&hook.cmd, &props, self.options.missing_keys) {
            Ok(command) => command,
            Err(e) => {
                advance(outcome, HookState::Failed);
                outcome.duration_ms = started.elapsed().as_millis() as u64;
                outcome.error = Some(HookError::Template(e.clone()));
                return Some(HookError::Template(e));
            }
        };

        advance(outcome, HookState::Executing);
        tracing::info!(hook = %hook.name, phase = %event.phase, command = %command, "running hook");
        let timeout = hook.timeout.or(self.options.default_timeout);
        let result = self
            .runner
            .run(&command, timeout)
            .and_then(|output| {
                for line in output.stdout.lines() {
                    tracing::info!(hook = %hook.name, "{}", line);
                }
                output.into_result()
            });
        outcome.command = Some(command);
        outcome.duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                advance(outcome, HookState::Succeeded);
                tracing::info!(hook = %hook.name, duration_ms = outcome.duration_ms, "hook succeeded");
                outcome.output = Some(output);
                None
            }
            Err(e) => {
                advance(outcome, HookState::Failed);
                outcome.error = Some(HookError::Execution(e.clone()));
                Some(HookError::Execution(e))
            }
        }
    }

    fn filter_reason(&self, hook: &Hook, event: &ExecutionEvent) -> Option<&'static str> {
        if !hook.enabled {
            return Some("inactive for this run");
        }
        if let Some(wanted) = hook.outcome {
            if event.outcome != Some(wanted) {
                return Some("outcome does not match");
            }
        }
        if !hook.filter.evaluate(event).is_included() {
            return Some("rejected by filter");
        }
        None
    }
}

fn advance(outcome: &mut HookOutcome, next: HookState) {
    if let Err(e) = outcome.trail.transition(next) {
        debug_assert!(false, "{}", e);
        tracing::error!(hook = %outcome.name, error = %e, "hook state machine violated");
    }
}
