//! Per-hook outcomes and the aggregate result of one phase

use release_template::TemplateError;
use std::fmt;

use crate::model::Phase;

use super::executor::{CommandOutput, HookExecutionError};
use super::state::{HookState, StateTrail};

/// Cause of a failed hook
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("template resolution failed: {0}")]
    Template(#[from] TemplateError),

    #[error("execution failed: {0}")]
    Execution(#[from] HookExecutionError),
}

/// A hook failure with the hook, phase and event it happened in
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("hook '{hook}' failed in {phase} phase of '{event}'")]
pub struct HookFailure {
    pub hook: String,
    pub phase: Phase,
    pub event: String,
    pub target: Option<String>,
    #[source]
    pub cause: HookError,
}

/// What happened to one hook during a phase
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub name: String,
    pub trail: StateTrail,
    /// Resolved command line, once resolution succeeded
    pub command: Option<String>,
    pub output: Option<CommandOutput>,
    pub error: Option<HookError>,
    pub duration_ms: u64,
}

impl HookOutcome {
    pub(crate) fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            trail: StateTrail::new(),
            command: None,
            output: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn state(&self) -> HookState {
        self.trail.current()
    }
}

/// Aggregate phase status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    /// At least one failure was absorbed by `continue_on_error`
    CompletedWithWarnings,
    /// A failure escalated and aborted the rest of the phase
    Failed,
}

impl RunStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::CompletedWithWarnings => "completed with warnings",
            RunStatus::Failed => "failed",
        })
    }
}

/// Result of running one phase for one event
#[derive(Debug, Clone)]
pub struct RunResult {
    pub phase: Phase,
    pub event: String,
    pub target: Option<String>,
    /// One entry per declared hook, in declared order
    pub outcomes: Vec<HookOutcome>,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub(crate) failure: Option<HookFailure>,
    pub(crate) warnings: Vec<HookFailure>,
}

impl RunResult {
    /// The escalated failure, if the phase was aborted
    pub fn failure(&self) -> Option<&HookFailure> {
        self.failure.as_ref()
    }

    /// Failures absorbed by `continue_on_error`, in order
    pub fn warnings(&self) -> &[HookFailure] {
        &self.warnings
    }

    /// `Err` with the escalated failure when the phase failed
    pub fn ok(&self) -> Result<(), HookFailure> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    fn count(&self, state: HookState) -> usize {
        self.outcomes.iter().filter(|o| o.state() == state).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(HookState::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(HookState::Failed)
    }

    pub fn filtered_out(&self) -> usize {
        self.count(HookState::FilteredOut)
    }

    /// Hooks never evaluated because an earlier hook aborted the phase
    pub fn skipped(&self) -> usize {
        self.count(HookState::Pending)
    }

    /// Names of hooks that reached EXECUTING, in execution order
    pub fn executed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.trail.states().contains(&HookState::Executing))
            .map(|o| o.name.as_str())
            .collect()
    }

    /// One-line human-readable summary
    pub fn human_summary(&self) -> String {
        let scope = match &self.target {
            Some(target) => format!("{} phase of '{}' for '{}'", self.phase, self.event, target),
            None => format!("{} phase of '{}'", self.phase, self.event),
        };
        let total = self.outcomes.len();
        if total == 0 {
            return format!("{}: no hooks declared", scope);
        }
        let counts = format!(
            "{} succeeded, {} failed, {} filtered out, {} skipped",
            self.succeeded(),
            self.failed(),
            self.filtered_out(),
            self.skipped()
        );
        match self.status {
            RunStatus::Succeeded => format!("{} succeeded: {}", scope, counts),
            RunStatus::CompletedWithWarnings => format!(
                "{} completed with warnings ({} warning(s)): {}",
                scope,
                self.warnings.len(),
                counts
            ),
            RunStatus::Failed => format!("{} failed: {}", scope, counts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn failure() -> HookFailure {
        HookFailure {
            hook: "lint".to_string(),
            phase: Phase::Before,
            event: "release".to_string(),
            target: None,
            cause: HookError::Template(TemplateError::MissingKey {
                key: "model.nope".to_string(),
            }),
        }
    }

    #[test]
    fn test_failure_chain_names_hook_and_cause() {
        let failure = failure();
        assert_eq!(
            failure.to_string(),
            "hook 'lint' failed in before phase of 'release'"
        );
        let cause = failure.source().unwrap();
        assert!(cause.to_string().contains("template resolution failed"));
        assert!(cause.source().is_some());
    }

    #[test]
    fn test_human_summary() {
        let mut ok = HookOutcome::pending("a");
        for s in [
            HookState::Active,
            HookState::Resolving,
            HookState::Executing,
            HookState::Succeeded,
        ] {
            ok.trail.transition(s).unwrap();
        }
        let skipped = HookOutcome::pending("b");

        let result = RunResult {
            phase: Phase::Before,
            event: "release".to_string(),
            target: None,
            outcomes: vec![ok, skipped],
            status: RunStatus::Failed,
            duration_ms: 5,
            failure: Some(failure()),
            warnings: Vec::new(),
        };

        assert_eq!(
            result.human_summary(),
            "before phase of 'release' failed: 1 succeeded, 0 failed, 0 filtered out, 1 skipped"
        );
        assert_eq!(result.executed(), vec!["a"]);
        assert!(result.ok().is_err());
    }

    #[test]
    fn test_run_status_display() {
        assert_eq!(
            RunStatus::CompletedWithWarnings.to_string(),
            "completed with warnings"
        );
        assert!(RunStatus::Failed.is_failure());
    }
}
