//! Hook definitions read from the frozen projection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{Element, Projection, ProjectionView, Scalar, Shape};
use crate::timeout::{hook_timeout, TimeoutValidationError};

use super::event::{Outcome, Phase};
use super::filter::{Filter, FilterError};

/// Kind of release the current run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Release,
    Prerelease,
    Snapshot,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Release => "release",
            RunKind::Prerelease => "prerelease",
            RunKind::Snapshot => "snapshot",
        }
    }

    /// Read `release.kind`, defaulting to [`RunKind::Release`]
    pub fn from_projection(projection: &Projection) -> Result<Self, ModelError> {
        match projection.view().get_path("release.kind") {
            None => Ok(RunKind::Release),
            Some(scalar) => scalar
                .as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ModelError::InvalidField {
                    path: "release.kind".to_string(),
                    reason: format!(
                        "expected release|prerelease|snapshot, got '{}'",
                        scalar
                    ),
                }),
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "release" => Ok(RunKind::Release),
            "prerelease" => Ok(RunKind::Prerelease),
            "snapshot" => Ok(RunKind::Snapshot),
            other => Err(format!("unknown run kind '{}'", other)),
        }
    }
}

/// When a hook (or the whole hook section) is switched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Active {
    #[default]
    Always,
    Never,
    Release,
    Prerelease,
    Snapshot,
    ReleasePrerelease,
}

impl Active {
    /// Evaluate against the current run kind
    pub fn applies_to(self, kind: RunKind) -> bool {
        match self {
            Active::Always => true,
            Active::Never => false,
            Active::Release => kind == RunKind::Release,
            Active::Prerelease => kind == RunKind::Prerelease,
            Active::Snapshot => kind == RunKind::Snapshot,
            Active::ReleasePrerelease => matches!(kind, RunKind::Release | RunKind::Prerelease),
        }
    }
}

impl FromStr for Active {
    type Err = String;

    /// Accepts `always`, `ON_RELEASE`, `on-snapshot`, `release-prerelease`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        let normalized = normalized.strip_prefix("ON_").unwrap_or(&normalized);
        match normalized {
            "ALWAYS" => Ok(Active::Always),
            "NEVER" => Ok(Active::Never),
            "RELEASE" => Ok(Active::Release),
            "PRERELEASE" => Ok(Active::Prerelease),
            "SNAPSHOT" => Ok(Active::Snapshot),
            "RELEASE_PRERELEASE" => Ok(Active::ReleasePrerelease),
            _ => Err(format!(
                "unknown active value '{}', expected ALWAYS|NEVER|RELEASE|PRERELEASE|SNAPSHOT|RELEASE_PRERELEASE",
                s
            )),
        }
    }
}

/// Errors building the hook model
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("{path}: missing required field '{field}'")]
    MissingField { path: String, field: String },

    #[error("{path}: {reason}")]
    InvalidField { path: String, reason: String },

    #[error("{path}: {source}")]
    Filter {
        path: String,
        #[source]
        source: FilterError,
    },

    #[error("{path}: {source}")]
    Timeout {
        path: String,
        #[source]
        source: TimeoutValidationError,
    },
}

/// One user-defined command bound to a phase
#[derive(Debug, Clone)]
pub struct Hook {
    pub name: String,
    /// Command template, resolved only at execution time
    pub cmd: String,
    pub filter: Filter,
    pub continue_on_error: bool,
    pub active: Active,
    /// `active` of both the hook and its section evaluated against the run kind
    pub enabled: bool,
    pub timeout: Option<Duration>,
    /// Run only for events carrying this outcome
    pub outcome: Option<Outcome>,
}

impl Hook {
    /// Minimal enabled hook with no filter
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            filter: Filter::default(),
            continue_on_error: false,
            active: Active::Always,
            enabled: true,
            timeout: None,
            outcome: None,
        }
    }

    pub fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = value;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Build from a hook node at `path` (e.g. `hooks.before[0]`)
    fn from_view(
        view: ProjectionView<'_>,
        path: &str,
        section_active: Active,
        run_kind: RunKind,
    ) -> Result<Self, ModelError> {
        let cmd = required_str(view, path, "cmd")?.to_string();
        let name = optional_str(view, path, "name")?
            .map(str::to_string)
            .unwrap_or_else(|| cmd.clone());

        let active = match optional_str(view, path, "active")? {
            Some(raw) => raw.parse().map_err(|reason| ModelError::InvalidField {
                path: format!("{}.active", path),
                reason,
            })?,
            None => Active::Always,
        };

        let continue_on_error = match view.get("continue_on_error") {
            None => false,
            Some(Scalar::Bool(b)) => *b,
            Some(other) => {
                return Err(ModelError::InvalidField {
                    path: format!("{}.continue_on_error", path),
                    reason: format!("expected a boolean, got '{}'", other),
                })
            }
        };

        let timeout = match view.get("timeout") {
            None => None,
            Some(Scalar::Integer(seconds)) => {
                Some(hook_timeout(*seconds).map_err(|source| ModelError::Timeout {
                    path: format!("{}.timeout", path),
                    source,
                })?)
            }
            Some(other) => {
                return Err(ModelError::Timeout {
                    path: format!("{}.timeout", path),
                    source: TimeoutValidationError::NotAnInteger {
                        value: other.to_string(),
                    },
                })
            }
        };

        let outcome = match optional_str(view, path, "outcome")? {
            Some(raw) => Some(raw.parse().map_err(|reason| ModelError::InvalidField {
                path: format!("{}.outcome", path),
                reason,
            })?),
            None => None,
        };

        let filter_path = format!("{}.filter", path);
        expect_shape(view, &filter_path, "filter", Shape::Node)?;
        let filter = match view.child("filter") {
            Some(filter) => {
                let include = patterns(filter, &filter_path, "include")?;
                let exclude = patterns(filter, &filter_path, "exclude")?;
                Filter::new(include, exclude).map_err(|source| ModelError::Filter {
                    path: filter_path,
                    source,
                })?
            }
            None => Filter::default(),
        };

        Ok(Self {
            name,
            cmd,
            filter,
            continue_on_error,
            active,
            enabled: section_active.applies_to(run_kind) && active.applies_to(run_kind),
            timeout,
            outcome,
        })
    }
}

fn optional_str<'a>(
    view: ProjectionView<'a>,
    path: &str,
    field: &str,
) -> Result<Option<&'a str>, ModelError> {
    match view.get(field) {
        None => Ok(None),
        Some(Scalar::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ModelError::InvalidField {
            path: format!("{}.{}", path, field),
            reason: format!("expected a string, got '{}'", other),
        }),
    }
}

fn required_str<'a>(
    view: ProjectionView<'a>,
    path: &str,
    field: &str,
) -> Result<&'a str, ModelError> {
    optional_str(view, path, field)?.ok_or_else(|| ModelError::MissingField {
        path: path.to_string(),
        field: field.to_string(),
    })
}

/// Error unless `field` is absent or has the `expected` shape
fn expect_shape(
    view: ProjectionView<'_>,
    path: &str,
    field: &str,
    expected: Shape,
) -> Result<(), ModelError> {
    match view.shape(field) {
        Some(found) if found != expected => Err(ModelError::InvalidField {
            path: path.to_string(),
            reason: format!("expected a {}, got a {}", expected, found),
        }),
        _ => Ok(()),
    }
}

/// A single pattern string or a sequence of them
fn patterns(view: ProjectionView<'_>, path: &str, field: &str) -> Result<Vec<String>, ModelError> {
    let field_path = format!("{}.{}", path, field);
    if let Some(single) = view.get(field) {
        return match single {
            Scalar::String(s) => Ok(vec![s.clone()]),
            other => Err(ModelError::InvalidField {
                path: field_path,
                reason: format!("expected a pattern string, got '{}'", other),
            }),
        };
    }
    match view.shape(field) {
        None => Ok(Vec::new()),
        Some(Shape::List) => view
            .list(field)
            .into_iter()
            .flat_map(|seq| seq.items.iter())
            .enumerate()
            .map(|(index, item)| match item {
                Element::Scalar(Scalar::String(s)) => Ok(s.clone()),
                Element::Scalar(other) => Err(ModelError::InvalidField {
                    path: format!("{}[{}]", field_path, index),
                    reason: format!("expected a pattern string, got '{}'", other),
                }),
                Element::Node(_) => Err(ModelError::InvalidField {
                    path: format!("{}[{}]", field_path, index),
                    reason: "expected a pattern string, got a node".to_string(),
                }),
            })
            .collect(),
        Some(other) => Err(ModelError::InvalidField {
            path: field_path,
            reason: format!("expected a pattern string or sequence, got a {}", other),
        }),
    }
}

/// Hooks of both phases, in declared order
#[derive(Debug, Clone, Default)]
pub struct HookSet {
    pub before: Vec<Hook>,
    pub after: Vec<Hook>,
}

impl HookSet {
    /// Read `hooks.*` from the projection, compiling filters and validating
    /// timeouts. Command templates are left unresolved.
    pub fn from_projection(projection: &Projection, run_kind: RunKind) -> Result<Self, ModelError> {
        expect_shape(projection.view(), "hooks", "hooks", Shape::Node)?;
        let Some(section) = projection.view().child("hooks") else {
            return Ok(Self::default());
        };

        let section_active = match optional_str(section, "hooks", "active")? {
            Some(raw) => raw.parse().map_err(|reason| ModelError::InvalidField {
                path: "hooks.active".to_string(),
                reason,
            })?,
            None => Active::Always,
        };

        let mut set = Self::default();
        for phase in [Phase::Before, Phase::After] {
            expect_shape(section, &format!("hooks.{}", phase), phase.as_str(), Shape::List)?;
            let hooks = section
                .nodes(phase.as_str())
                .into_iter()
                .enumerate()
                .map(|(index, view)| {
                    let path = format!("hooks.{}[{}]", phase, index);
                    Hook::from_view(view, &path, section_active, run_kind)
                })
                .collect::<Result<Vec<_>, _>>()?;
            tracing::debug!(phase = %phase, count = hooks.len(), "hooks loaded");
            match phase {
                Phase::Before => set.before = hooks,
                Phase::After => set.after = hooks,
            }
        }
        Ok(set)
    }

    /// Hooks declared for `phase`
    pub fn hooks(&self, phase: Phase) -> &[Hook] {
        match phase {
            Phase::Before => &self.before,
            Phase::After => &self.after,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node_from_value;
    use serde_json::{json, Value};

    fn projection(value: Value) -> Projection {
        node_from_value(value).unwrap().freeze()
    }

    #[test]
    fn test_active_parse_aliases() {
        assert_eq!("always".parse::<Active>(), Ok(Active::Always));
        assert_eq!("ON_RELEASE".parse::<Active>(), Ok(Active::Release));
        assert_eq!("on-snapshot".parse::<Active>(), Ok(Active::Snapshot));
        assert_eq!(
            "release-prerelease".parse::<Active>(),
            Ok(Active::ReleasePrerelease)
        );
        assert!("sometimes".parse::<Active>().is_err());
    }

    #[test]
    fn test_active_applies_to() {
        assert!(Active::Always.applies_to(RunKind::Snapshot));
        assert!(!Active::Never.applies_to(RunKind::Release));
        assert!(Active::Release.applies_to(RunKind::Release));
        assert!(!Active::Release.applies_to(RunKind::Snapshot));
        assert!(Active::ReleasePrerelease.applies_to(RunKind::Prerelease));
        assert!(!Active::ReleasePrerelease.applies_to(RunKind::Snapshot));
    }

    #[test]
    fn test_run_kind_from_projection() {
        let p = projection(json!({"release": {"kind": "snapshot"}}));
        assert_eq!(RunKind::from_projection(&p).unwrap(), RunKind::Snapshot);

        let p = projection(json!({}));
        assert_eq!(RunKind::from_projection(&p).unwrap(), RunKind::Release);

        let p = projection(json!({"release": {"kind": "nightly"}}));
        assert!(RunKind::from_projection(&p).is_err());
    }

    #[test]
    fn test_hookset_from_projection() {
        let p = projection(json!({
            "hooks": {
                "before": [
                    {
                        "name": "lint",
                        "cmd": "cargo clippy",
                        "continue_on_error": true,
                        "timeout": 30,
                        "filter": {"include": ["release"], "exclude": "snapshot"}
                    },
                    {"cmd": "echo {{event.name}}"}
                ],
                "after": [
                    {"name": "notify", "cmd": "echo done", "outcome": "failure", "active": "on-snapshot"}
                ]
            }
        }));

        let set = HookSet::from_projection(&p, RunKind::Release).unwrap();
        assert_eq!(set.before.len(), 2);

        let lint = &set.before[0];
        assert_eq!(lint.name, "lint");
        assert!(lint.continue_on_error);
        assert_eq!(lint.timeout, Some(Duration::from_secs(30)));
        assert_eq!(lint.filter.include_patterns(), ["release".to_string()]);
        assert_eq!(lint.filter.exclude_patterns(), ["snapshot".to_string()]);
        assert!(lint.enabled);

        let unnamed = &set.before[1];
        assert_eq!(unnamed.name, "echo {{event.name}}");
        assert_eq!(unnamed.cmd, "echo {{event.name}}");

        let notify = &set.hooks(Phase::After)[0];
        assert_eq!(notify.outcome, Some(Outcome::Failure));
        assert_eq!(notify.active, Active::Snapshot);
        assert!(!notify.enabled);
    }

    #[test]
    fn test_section_active_disables_all_hooks() {
        let p = projection(json!({
            "hooks": {"active": "NEVER", "before": [{"name": "a", "cmd": "true"}]}
        }));
        let set = HookSet::from_projection(&p, RunKind::Release).unwrap();
        assert!(!set.before[0].enabled);
    }

    #[test]
    fn test_missing_cmd() {
        let p = projection(json!({"hooks": {"before": [{"name": "a"}]}}));
        let err = HookSet::from_projection(&p, RunKind::Release).unwrap_err();
        assert!(matches!(err, ModelError::MissingField { .. }));
        assert_eq!(err.to_string(), "hooks.before[0]: missing required field 'cmd'");
    }

    #[test]
    fn test_invalid_timeout() {
        let p = projection(json!({"hooks": {"after": [{"name": "a", "cmd": "x", "timeout": 0}]}}));
        let err = HookSet::from_projection(&p, RunKind::Release).unwrap_err();
        assert!(matches!(err, ModelError::Timeout { .. }));
        assert!(err.to_string().starts_with("hooks.after[0].timeout"));

        let p = projection(json!({"hooks": {"after": [{"name": "a", "cmd": "x", "timeout": "soon"}]}}));
        assert!(HookSet::from_projection(&p, RunKind::Release).is_err());
    }

    #[test]
    fn test_malformed_filter_fails_at_load() {
        let p = projection(json!({
            "hooks": {"before": [{"name": "a", "cmd": "x", "filter": {"include": ["[oops"]}}]}
        }));
        let err = HookSet::from_projection(&p, RunKind::Release).unwrap_err();
        assert!(matches!(err, ModelError::Filter { .. }));
    }

    #[test]
    fn test_filter_must_be_a_table() {
        let p = projection(json!({
            "hooks": {"before": [{"name": "gate", "cmd": "echo gate", "filter": "release"}]}
        }));
        let err = HookSet::from_projection(&p, RunKind::Release).unwrap_err();
        assert!(
            matches!(&err, ModelError::InvalidField { path, .. } if path == "hooks.before[0].filter")
        );
    }

    #[test]
    fn test_filter_patterns_must_be_strings() {
        let table = projection(json!({
            "hooks": {"before": [{"name": "gate", "cmd": "echo gate", "filter": {"include": {"x": "release"}}}]}
        }));
        let err = HookSet::from_projection(&table, RunKind::Release).unwrap_err();
        assert!(
            matches!(&err, ModelError::InvalidField { path, .. } if path == "hooks.before[0].filter.include")
        );

        let nested = projection(json!({
            "hooks": {"after": [{"name": "gate", "cmd": "echo gate", "filter": {"exclude": [{"x": 1}]}}]}
        }));
        let err = HookSet::from_projection(&nested, RunKind::Release).unwrap_err();
        assert!(
            matches!(&err, ModelError::InvalidField { path, .. } if path == "hooks.after[0].filter.exclude[0]")
        );

        let number = projection(json!({
            "hooks": {"before": [{"name": "gate", "cmd": "echo gate", "filter": {"include": 7}}]}
        }));
        assert!(HookSet::from_projection(&number, RunKind::Release).is_err());
    }

    #[test]
    fn test_hook_sections_must_have_expected_shape() {
        let p = projection(json!({"hooks": {"before": {"name": "a", "cmd": "x"}}}));
        let err = HookSet::from_projection(&p, RunKind::Release).unwrap_err();
        assert!(matches!(&err, ModelError::InvalidField { path, .. } if path == "hooks.before"));

        let p = projection(json!({"hooks": "echo"}));
        assert!(HookSet::from_projection(&p, RunKind::Release).is_err());
    }

    #[test]
    fn test_no_hooks_section() {
        let set = HookSet::from_projection(&projection(json!({})), RunKind::Release).unwrap();
        assert!(set.is_empty());
    }
}
