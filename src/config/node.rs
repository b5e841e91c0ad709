//! Mutable configuration tree
//!
//! A [`ConfigNode`] is an ordered set of named fields. The field variant
//! fixes its merge rule:
//! - `Scalar`: override-if-present
//! - `Node`: nested entity, merged field by field
//! - `List`: union-list (identity key or equality dedupe)
//! - `Map`: union-map-recursive over named sub-entities

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;
use std::fmt;

use super::projection::Projection;

/// Keys that contain secrets and are redacted from diagnostic renderings
const SECRET_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "credential",
    "passphrase",
];

/// Placeholder written in place of sensitive values
pub const REDACTED: &str = "[REDACTED]";

/// Check whether a field name looks like it holds a secret
pub fn is_sensitive_key(name: &str) -> bool {
    let lower = name.to_lowercase();
    SECRET_KEYS.iter().any(|s| lower.contains(s))
}

/// Scalar leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// Convert to a JSON value
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Integer(i) => Value::Number((*i).into()),
            Scalar::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Scalar::Bool(b) => Value::Bool(*b),
        }
    }

    /// Borrow as a string if this is a string scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{}", s),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// One element of a sequence field
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Scalar(Scalar),
    Node(ConfigNode),
}

impl Element {
    /// Value of the identity field, when this element is a node carrying it
    pub fn identity(&self, key: &str) -> Option<&Scalar> {
        match self {
            Element::Node(node) => match node.get(key) {
                Some(Field::Scalar(s)) => Some(s),
                _ => None,
            },
            Element::Scalar(_) => None,
        }
    }
}

/// Ordered sequence with an optional identity key for deduplication
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    pub items: Vec<Element>,
    pub identity: Option<String>,
}

impl Sequence {
    /// Sequence deduplicated by equality
    pub fn new(items: Vec<Element>) -> Self {
        Self {
            items,
            identity: None,
        }
    }

    /// Sequence deduplicated by the named identity field
    pub fn keyed(identity: impl Into<String>, items: Vec<Element>) -> Self {
        Self {
            items,
            identity: Some(identity.into()),
        }
    }
}

/// Shape of a field, compared when merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Node,
    List,
    Map,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Scalar => "scalar",
            Shape::Node => "node",
            Shape::List => "sequence",
            Shape::Map => "mapping",
        };
        f.write_str(name)
    }
}

/// A typed field of a [`ConfigNode`]
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Scalar(Scalar),
    Node(ConfigNode),
    List(Sequence),
    Map(IndexMap<String, ConfigNode>),
}

impl Field {
    /// The declared shape of this field
    pub fn shape(&self) -> Shape {
        match self {
            Field::Scalar(_) => Shape::Scalar,
            Field::Node(_) => Shape::Node,
            Field::List(_) => Shape::List,
            Field::Map(_) => Shape::Map,
        }
    }
}

impl From<Scalar> for Field {
    fn from(s: Scalar) -> Self {
        Field::Scalar(s)
    }
}

impl From<ConfigNode> for Field {
    fn from(node: ConfigNode) -> Self {
        Field::Node(node)
    }
}

impl From<Sequence> for Field {
    fn from(seq: Sequence) -> Self {
        Field::List(seq)
    }
}

/// Named entity holding typed fields in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigNode {
    fields: IndexMap<String, Field>,
    sensitive: BTreeSet<String>,
}

impl ConfigNode {
    /// Create an empty node
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    ///
    /// Secret-looking names are marked sensitive automatically.
    pub fn set(&mut self, name: impl Into<String>, field: impl Into<Field>) {
        let name = name.into();
        if is_sensitive_key(&name) {
            self.sensitive.insert(name.clone());
        }
        self.fields.insert(name, field.into());
    }

    /// Builder form of [`ConfigNode::set`]
    pub fn with(mut self, name: impl Into<String>, field: impl Into<Field>) -> Self {
        self.set(name, field);
        self
    }

    /// Mark a field as sensitive regardless of its name
    pub fn mark_sensitive(&mut self, name: impl Into<String>) {
        self.sensitive.insert(name.into());
    }

    /// Get a field by name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Get a mutable field by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    /// Remove a field
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.shift_remove(name)
    }

    /// Iterate fields in order
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter()
    }

    /// Names of sensitive fields
    pub fn sensitive(&self) -> &BTreeSet<String> {
        &self.sensitive
    }

    /// Check whether a field is sensitive
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.sensitive.contains(name)
    }

    /// True if the node has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn take_parts(self) -> (IndexMap<String, Field>, BTreeSet<String>) {
        (self.fields, self.sensitive)
    }

    pub(crate) fn fields_mut(&mut self) -> &mut IndexMap<String, Field> {
        &mut self.fields
    }

    pub(crate) fn absorb_sensitive(&mut self, names: BTreeSet<String>) {
        self.sensitive.extend(names);
    }

    /// Freeze into a read-only projection.
    ///
    /// Consumes the node: no mutable handle survives the call.
    pub fn freeze(self) -> Projection {
        Projection::new(self)
    }

    /// Render as an ordered JSON map; sensitive fields of any shape are
    /// redacted unless `full` is set.
    pub fn to_map(&self, full: bool) -> Map<String, Value> {
        let mut map = Map::new();
        for (name, field) in &self.fields {
            let value = if !full && self.is_sensitive(name) {
                Value::String(REDACTED.to_string())
            } else {
                field_to_value(field, full)
            };
            map.insert(name.clone(), value);
        }
        map
    }
}

fn field_to_value(field: &Field, full: bool) -> Value {
    match field {
        Field::Scalar(s) => s.to_value(),
        Field::Node(node) => Value::Object(node.to_map(full)),
        Field::List(seq) => Value::Array(
            seq.items
                .iter()
                .map(|item| match item {
                    Element::Scalar(s) => s.to_value(),
                    Element::Node(node) => Value::Object(node.to_map(full)),
                })
                .collect(),
        ),
        Field::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, node)| (k.clone(), Value::Object(node.to_map(full))))
                .collect(),
        ),
    }
}
