//! Per-hook state machine
//!
//! PENDING → FILTERED_OUT
//! PENDING → ACTIVE → RESOLVING → EXECUTING → {SUCCEEDED | FAILED}
//! with RESOLVING → FAILED on template errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}

/// Hook state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookState {
    /// Not yet evaluated, or skipped after an earlier fatal failure
    Pending,
    /// Rejected by its filter, outcome guard or `active` setting
    FilteredOut,
    Active,
    /// Command template being resolved
    Resolving,
    Executing,
    Succeeded,
    Failed,
}

impl TerminalState for HookState {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            HookState::FilteredOut | HookState::Succeeded | HookState::Failed
        )
    }
}

impl HookState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: HookState) -> bool {
        matches!(
            (self, target),
            (HookState::Pending, HookState::FilteredOut)
                | (HookState::Pending, HookState::Active)
                | (HookState::Active, HookState::Resolving)
                | (HookState::Resolving, HookState::Executing)
                | (HookState::Resolving, HookState::Failed)
                | (HookState::Executing, HookState::Succeeded)
                | (HookState::Executing, HookState::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookState::Pending => "PENDING",
            HookState::FilteredOut => "FILTERED_OUT",
            HookState::Active => "ACTIVE",
            HookState::Resolving => "RESOLVING",
            HookState::Executing => "EXECUTING",
            HookState::Succeeded => "SUCCEEDED",
            HookState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors for hook state operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid hook state transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: HookState,
    pub to: HookState,
}

/// Current state plus every state visited, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTrail {
    states: Vec<HookState>,
}

impl Default for StateTrail {
    fn default() -> Self {
        Self {
            states: vec![HookState::Pending],
        }
    }
}

impl StateTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn current(&self) -> HookState {
        self.states.last().copied().unwrap_or(HookState::Pending)
    }

    /// Move to `next` if the state machine allows it
    pub fn transition(&mut self, next: HookState) -> Result<(), InvalidTransition> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(InvalidTransition {
                from: current,
                to: next,
            });
        }
        self.states.push(next);
        Ok(())
    }

    /// Visited states, starting with PENDING
    pub fn states(&self) -> &[HookState] {
        &self.states
    }
}
