//! Property context assembly
//!
//! The shared base (`model.*`, `env.*`, `run.*`) is built once from the frozen
//! projection and a captured environment. Every call to
//! [`PropertyAssembler::full_props`] returns a fresh copy with the event
//! namespace added, so callers may insert further keys without affecting
//! anyone else.

use release_template::{Properties, PropertyContext};
use serde_json::{Map, Value};

use crate::config::Projection;
use crate::model::{ExecutionEvent, RunKind};

/// Environment variables captured at the process edge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(String, String)>,
}

impl Environment {
    /// Snapshot the current process environment. Non-UTF-8 entries are skipped.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Explicit variable list
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Value of a captured variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of captured variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True if nothing was captured
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Builds per-event property contexts on top of a shared frozen base
#[derive(Debug, Clone)]
pub struct PropertyAssembler {
    base: Properties,
}

impl PropertyAssembler {
    /// Build the shared base.
    ///
    /// The model namespace carries unredacted values so templates can use
    /// credentials; diagnostics render the projection separately.
    pub fn new(projection: &Projection, env: &Environment, run_kind: RunKind) -> Self {
        let mut ctx = PropertyContext::new();
        ctx.insert_namespace("model", projection.as_map(true).clone());

        let env_map: Map<String, Value> = env
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        ctx.insert_namespace("env", env_map);
        ctx.insert("run.kind", run_kind.as_str());

        Self { base: ctx.freeze() }
    }

    /// The shared frozen base
    pub fn base(&self) -> &Properties {
        &self.base
    }

    /// Fresh, independent context for one event
    pub fn full_props(&self, event: &ExecutionEvent) -> PropertyContext {
        let mut ctx = self.base.to_context();
        ctx.insert("event.name", event.name.as_str());
        ctx.insert("event.phase", event.phase.as_str());
        ctx.insert(
            "event.outcome",
            event.outcome.map(|o| o.as_str()).unwrap_or_default(),
        );
        ctx.insert("event.platform", event.platform.clone().unwrap_or_default());
        ctx.insert("event.target", event.target.clone().unwrap_or_default());
        ctx.insert("event.timestamp", event.timestamp.to_rfc3339());
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::node_from_value;
    use crate::model::Outcome;
    use release_template::{resolve, MissingKeyPolicy};
    use serde_json::json;

    fn assembler() -> PropertyAssembler {
        let projection = node_from_value(json!({
            "project": {"name": "app", "github_token": "ghp_secret"}
        }))
        .unwrap()
        .freeze();
        let env = Environment::from_pairs([("HOME", "/home/dev"), ("CI", "true")]);
        PropertyAssembler::new(&projection, &env, RunKind::Snapshot)
    }

    #[test]
    fn test_namespaces() {
        let event = ExecutionEvent::after("publish", Outcome::Failure).with_platform("linux-x86_64");
        let props = assembler().full_props(&event);

        assert_eq!(props.get("model.project.name"), Some(&json!("app")));
        assert_eq!(props.get("model.project.github_token"), Some(&json!("ghp_secret")));
        assert_eq!(props.get("env.HOME"), Some(&json!("/home/dev")));
        assert_eq!(props.get("run.kind"), Some(&json!("snapshot")));
        assert_eq!(props.get("event.name"), Some(&json!("publish")));
        assert_eq!(props.get("event.phase"), Some(&json!("after")));
        assert_eq!(props.get("event.outcome"), Some(&json!("failure")));
        assert_eq!(props.get("event.platform"), Some(&json!("linux-x86_64")));
        assert_eq!(props.get("event.target"), Some(&json!("")));
    }

    #[test]
    fn test_full_props_returns_independent_copies() {
        let assembler = assembler();
        let event = ExecutionEvent::before("release");

        let mut first = assembler.full_props(&event);
        first.insert("hook.name", "lint");
        first.insert("model.project.name", "changed");
        let second = assembler.full_props(&event);

        assert!(!second.contains("hook.name"));
        assert_eq!(second.get("model.project.name"), Some(&json!("app")));
        assert!(assembler.base().get("event.name").is_none());
    }

    #[test]
    fn test_resolves_templates() {
        let props = assembler().full_props(&ExecutionEvent::before("release"));
        let out = resolve(
            "{{event.name}} {{model.project.name}} on {{env.CI}}",
            &props,
            MissingKeyPolicy::Strict,
        )
        .unwrap();
        assert_eq!(out, "release app on true");
    }

    #[test]
    fn test_environment_lookup() {
        let env = Environment::from_pairs([("A", "1")]);
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("B"), None);
        assert_eq!(env.len(), 1);
    }
}
