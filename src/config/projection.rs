//! Read-only projection of the merged configuration
//!
//! Once merging completes the tree is frozen into a [`Projection`]. The
//! projection owns the tree behind an `Arc`; clones share it, and the only
//! access it hands out is [`ProjectionView`], which has no mutating methods.
//!
//! ```compile_fail
//! use release_hooks::config::{ConfigNode, Scalar};
//!
//! let projection = ConfigNode::new().with("cmd", Scalar::from("echo")).freeze();
//! projection.view().set("cmd", Scalar::from("rm -rf /"));
//! ```

use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

use super::node::{ConfigNode, Element, Field, Scalar, Sequence, Shape};

#[derive(Debug)]
struct Frozen {
    node: ConfigNode,
    full: OnceLock<Map<String, Value>>,
    redacted: OnceLock<Map<String, Value>>,
}

/// Frozen configuration tree shared by every downstream consumer
#[derive(Debug, Clone)]
pub struct Projection {
    inner: Arc<Frozen>,
}

impl Projection {
    pub(crate) fn new(node: ConfigNode) -> Self {
        Self {
            inner: Arc::new(Frozen {
                node,
                full: OnceLock::new(),
                redacted: OnceLock::new(),
            }),
        }
    }

    /// Read-only view of the root node
    pub fn view(&self) -> ProjectionView<'_> {
        ProjectionView {
            node: &self.inner.node,
        }
    }

    /// Ordered key-value rendering, computed once per flavour.
    ///
    /// With `full == false` sensitive fields read `[REDACTED]`.
    pub fn as_map(&self, full: bool) -> &Map<String, Value> {
        let cell = if full {
            &self.inner.full
        } else {
            &self.inner.redacted
        };
        cell.get_or_init(|| self.inner.node.to_map(full))
    }

    /// True if both handles share the same frozen tree
    pub fn ptr_eq(&self, other: &Projection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Deep copy as a fresh mutable tree. Edits never reach this projection.
    pub fn to_mutable(&self) -> ConfigNode {
        self.inner.node.clone()
    }
}

/// Borrowed read-only view of one node
#[derive(Debug, Clone, Copy)]
pub struct ProjectionView<'a> {
    node: &'a ConfigNode,
}

impl<'a> ProjectionView<'a> {
    /// Check whether a field is present
    pub fn contains(&self, name: &str) -> bool {
        self.node.get(name).is_some()
    }

    /// Shape of a field, if present
    pub fn shape(&self, name: &str) -> Option<Shape> {
        self.node.get(name).map(Field::shape)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &'a str> {
        self.node.fields().map(|(name, _)| name.as_str())
    }

    /// Check whether a field is marked sensitive
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.node.is_sensitive(name)
    }

    /// Scalar field by name
    pub fn get(&self, name: &str) -> Option<&'a Scalar> {
        match self.node.get(name)? {
            Field::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar by dotted path through nested nodes (`project.name`)
    pub fn get_path(&self, path: &str) -> Option<&'a Scalar> {
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        let mut current = *self;
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                current = current.child(segment)?;
            }
        }
        current.get(leaf)
    }

    /// String scalar by name
    pub fn get_str(&self, name: &str) -> Option<&'a str> {
        self.get(name).and_then(Scalar::as_str)
    }

    /// Integer scalar by name
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean scalar by name
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Nested node by name
    pub fn child(&self, name: &str) -> Option<ProjectionView<'a>> {
        match self.node.get(name)? {
            Field::Node(node) => Some(ProjectionView { node }),
            _ => None,
        }
    }

    /// Sequence field by name
    pub fn list(&self, name: &str) -> Option<&'a Sequence> {
        match self.node.get(name)? {
            Field::List(seq) => Some(seq),
            _ => None,
        }
    }

    /// Node elements of a sequence field, in order
    pub fn nodes(&self, name: &str) -> Vec<ProjectionView<'a>> {
        match self.node.get(name) {
            Some(Field::List(seq)) => seq
                .items
                .iter()
                .filter_map(|item| match item {
                    Element::Node(node) => Some(ProjectionView { node }),
                    Element::Scalar(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Scalar elements of a sequence field, in order
    pub fn scalars(&self, name: &str) -> Vec<&'a Scalar> {
        match self.node.get(name) {
            Some(Field::List(seq)) => seq
                .items
                .iter()
                .filter_map(|item| match item {
                    Element::Scalar(s) => Some(s),
                    Element::Node(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Entries of a mapping field, in order
    pub fn entries(&self, name: &str) -> Vec<(&'a str, ProjectionView<'a>)> {
        match self.node.get(name) {
            Some(Field::Map(entries)) => entries
                .iter()
                .map(|(key, node)| (key.as_str(), ProjectionView { node }))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Render this node as an ordered map
    pub fn as_map(&self, full: bool) -> Map<String, Value> {
        self.node.to_map(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn tree() -> ConfigNode {
        let mut dists = IndexMap::new();
        dists.insert(
            "app-linux".to_string(),
            ConfigNode::new().with("platform", Scalar::from("linux-x86_64")),
        );
        ConfigNode::new()
            .with(
                "project",
                ConfigNode::new()
                    .with("name", Scalar::from("app"))
                    .with("github_token", Scalar::from("ghp_secret")),
            )
            .with("retries", Scalar::from(3_i64))
            .with("dry_run", Scalar::from(false))
            .with(
                "hooks",
                Sequence::keyed(
                    "name",
                    vec![Element::Node(
                        ConfigNode::new().with("name", Scalar::from("lint")),
                    )],
                ),
            )
            .with(
                "tags",
                Sequence::new(vec![Element::Scalar(Scalar::from("stable"))]),
            )
            .with("distributions", Field::Map(dists))
    }

    #[test]
    fn test_view_accessors() {
        let projection = tree().freeze();
        let view = projection.view();

        assert_eq!(view.get_path("project.name"), Some(&Scalar::from("app")));
        assert_eq!(view.get_i64("retries"), Some(3));
        assert_eq!(view.get_bool("dry_run"), Some(false));
        assert_eq!(view.get_str("retries"), None);
        assert_eq!(view.nodes("hooks").len(), 1);
        assert_eq!(view.list("hooks").and_then(|s| s.identity.as_deref()), Some("name"));
        assert_eq!(view.nodes("hooks")[0].get_str("name"), Some("lint"));
        assert_eq!(view.scalars("tags"), vec![&Scalar::from("stable")]);
        let entries = view.entries("distributions");
        assert_eq!(entries[0].0, "app-linux");
        assert_eq!(entries[0].1.get_str("platform"), Some("linux-x86_64"));
        assert!(view.child("missing").is_none());
        assert!(view.nodes("missing").is_empty());
    }

    #[test]
    fn test_as_map_redacts_unless_full() {
        let projection = tree().freeze();

        let redacted = projection.as_map(false);
        assert_eq!(redacted["project"]["github_token"], json!("[REDACTED]"));
        assert_eq!(redacted["project"]["name"], json!("app"));

        let full = projection.as_map(true);
        assert_eq!(full["project"]["github_token"], json!("ghp_secret"));
    }

    #[test]
    fn test_as_map_is_cached() {
        let projection = tree().freeze();
        let first = projection.as_map(false) as *const Map<String, Value>;
        let second = projection.as_map(false) as *const Map<String, Value>;
        assert_eq!(first, second);
    }

    #[test]
    fn test_clones_share_tree() {
        let projection = tree().freeze();
        let other = projection.clone();
        assert!(projection.ptr_eq(&other));
        assert!(!projection.ptr_eq(&tree().freeze()));
    }

    #[test]
    fn test_mutable_copy_does_not_leak_back() {
        let projection = tree().freeze();
        let mut copy = projection.to_mutable();
        copy.set("retries", Scalar::from(99_i64));
        copy.remove("project");

        assert_eq!(projection.view().get_i64("retries"), Some(3));
        assert!(projection.view().contains("project"));
        assert_eq!(projection.as_map(true)["retries"], json!(3));
    }
}
