//! Namespaced property storage used for placeholder lookup.

use serde_json::{Map, Value};
use std::sync::Arc;

/// Read access to a property tree by dotted key path.
pub trait Lookup {
    /// Resolve `a.b.c` against the tree. Numeric segments index arrays.
    fn lookup(&self, path: &str) -> Option<&Value>;
}

fn lookup_in<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable, append-only property accumulation.
///
/// Keys are dotted paths; every segment but the last names a namespace.
/// Insertion order is preserved. Nothing is ever removed, but inserting an
/// existing path replaces its value. Cloning yields a fully independent copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyContext {
    root: Map<String, Value>,
}

impl PropertyContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value at a dotted path, creating namespaces as needed.
    ///
    /// A scalar sitting where a namespace is required is promoted to an
    /// empty namespace.
    pub fn insert(&mut self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in segments {
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return;
            };
            current = map;
        }
        current.insert(last.to_string(), value);
    }

    /// Merge a whole map under `namespace`, keeping existing sibling keys.
    ///
    /// Entry keys are taken verbatim and never split on dots.
    pub fn insert_namespace(&mut self, namespace: &str, entries: Map<String, Value>) {
        if !matches!(self.get(namespace), Some(Value::Object(_))) {
            self.insert(namespace, Value::Object(Map::new()));
        }
        let mut current = &mut self.root;
        for segment in namespace.split('.') {
            let Some(Value::Object(map)) = current.get_mut(segment) else {
                return;
            };
            current = map;
        }
        current.extend(entries);
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup_in(&self.root, path)
    }

    /// Check whether a dotted path resolves
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Number of top-level namespaces and keys
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// True if nothing has been inserted
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Flatten into `(dotted.key, rendered value)` pairs in insertion order.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        flatten_into(&self.root, String::new(), &mut out);
        out
    }

    /// Freeze into an immutable, cheaply clonable snapshot
    pub fn freeze(self) -> Properties {
        Properties {
            root: Arc::new(self.root),
        }
    }

    /// Borrow the underlying tree
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }
}

impl Lookup for PropertyContext {
    fn lookup(&self, path: &str) -> Option<&Value> {
        self.get(path)
    }
}

fn flatten_into(map: &Map<String, Value>, prefix: String, out: &mut Vec<(String, String)>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) => flatten_into(inner, path, out),
            other => out.push((path, render_value(other))),
        }
    }
}

/// Immutable property snapshot.
///
/// Clones share storage. Use [`Properties::to_context`] to obtain a private
/// mutable copy; changes to that copy are never visible here.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    root: Arc<Map<String, Value>>,
}

impl Properties {
    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup_in(&self.root, path)
    }

    /// Independent mutable copy of this snapshot
    pub fn to_context(&self) -> PropertyContext {
        PropertyContext {
            root: (*self.root).clone(),
        }
    }

    /// Borrow the underlying tree
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }
}

impl Lookup for Properties {
    fn lookup(&self, path: &str) -> Option<&Value> {
        self.get(path)
    }
}

/// Render a property value as placeholder text.
///
/// Strings are verbatim, `null` is empty, arrays of scalars are
/// comma-joined and any other composite becomes compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
