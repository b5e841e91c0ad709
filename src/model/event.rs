//! Execution events that trigger hook phases

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Point relative to a guarded release operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    /// Lowercase name, also the config section under `hooks`
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(Phase::Before),
            "after" => Ok(Phase::After),
            other => Err(format!("unknown phase '{}', expected before|after", other)),
        }
    }
}

/// Result of the guarded operation, known only in the `after` phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(Outcome::Success),
            "failure" => Ok(Outcome::Failure),
            other => Err(format!(
                "unknown outcome '{}', expected success|failure",
                other
            )),
        }
    }
}

/// One occurrence of a guarded release operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Operation name, e.g. "release" or "publish"
    pub name: String,

    pub phase: Phase,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,

    /// Platform tag of the target being processed, e.g. "linux-x86_64"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Release target (distribution) name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ExecutionEvent {
    /// Event for the `before` phase of `name`
    pub fn before(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: Phase::Before,
            outcome: None,
            platform: None,
            target: None,
            timestamp: Utc::now(),
        }
    }

    /// Event for the `after` phase of `name` with the operation's outcome
    pub fn after(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            phase: Phase::After,
            outcome: Some(outcome),
            ..Self::before(name)
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Same event re-tagged with `phase`
    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_parse_and_display() {
        assert_eq!("BEFORE".parse::<Phase>(), Ok(Phase::Before));
        assert_eq!(Phase::After.to_string(), "after");
        assert!("during".parse::<Phase>().is_err());
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!("failure".parse::<Outcome>(), Ok(Outcome::Failure));
        assert!("maybe".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_event_builders() {
        let event = ExecutionEvent::after("publish", Outcome::Success)
            .with_platform("linux-x86_64")
            .with_target("app-linux");

        assert_eq!(event.phase, Phase::After);
        assert_eq!(event.outcome, Some(Outcome::Success));
        assert_eq!(event.platform.as_deref(), Some("linux-x86_64"));
        assert_eq!(event.target.as_deref(), Some("app-linux"));
        assert_eq!(ExecutionEvent::before("release").outcome, None);
    }

    #[test]
    fn test_event_serializes_lowercase() {
        let event = ExecutionEvent::before("release");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["phase"], "before");
        assert!(json.get("outcome").is_none());
    }
}
