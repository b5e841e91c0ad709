//! Declared merge rules and fragment conversion
//!
//! Parsed fragments arrive as generic JSON values. The static tables below
//! decide which tables are mappings of named entities and which sequences
//! deduplicate by an identity field; everything else follows its shape.

use serde_json::{Map, Value};

use super::effective::ConfigError;
use super::merge::check_unique_identities;
use super::node::{ConfigNode, Element, Field, Scalar, Sequence};

/// Sequences deduplicated by an identity field: (schema path, key)
const KEYED_SEQUENCES: &[(&str, &str)] = &[("hooks.before", "name"), ("hooks.after", "name")];

/// Tables holding named sub-entities
const MAPPINGS: &[&str] = &["distributions"];

/// Identity key declared for the sequence at `path`
pub fn identity_key(path: &str) -> Option<&'static str> {
    KEYED_SEQUENCES
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, key)| *key)
}

/// Whether the table at `path` is a mapping of named sub-entities
pub fn is_mapping(path: &str) -> bool {
    MAPPINGS.contains(&path)
}

/// Convert a parsed fragment into a [`ConfigNode`].
///
/// The root must be a table. `null` values are treated as unset.
pub fn node_from_value(value: Value) -> Result<ConfigNode, ConfigError> {
    match value {
        Value::Object(map) => node_from_map(map, "", ""),
        Value::Null => Ok(ConfigNode::new()),
        other => Err(ConfigError::ValidationError(format!(
            "fragment root must be a table, found {}",
            kind(&other)
        ))),
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

/// `path` is the display path, `schema` the same path with mapping keys
/// replaced by `*`.
fn node_from_map(map: Map<String, Value>, path: &str, schema: &str) -> Result<ConfigNode, ConfigError> {
    let mut node = ConfigNode::new();
    for (name, value) in map {
        let field_path = join(path, &name);
        let field_schema = join(schema, &name);
        if let Some(field) = field_from_value(value, &field_path, &field_schema)? {
            node.set(name, field);
        }
    }
    Ok(node)
}

fn field_from_value(value: Value, path: &str, schema: &str) -> Result<Option<Field>, ConfigError> {
    let field = match value {
        Value::Null => return Ok(None),
        Value::Object(map) if is_mapping(schema) => {
            let entry_schema = join(schema, "*");
            let mut entries = indexmap::IndexMap::new();
            for (key, entry) in map {
                let entry_path = join(path, &key);
                let Value::Object(inner) = entry else {
                    return Err(ConfigError::ValidationError(format!(
                        "'{}' must be a table, found {}",
                        entry_path,
                        kind(&entry)
                    )));
                };
                entries.insert(key, node_from_map(inner, &entry_path, &entry_schema)?);
            }
            Field::Map(entries)
        }
        Value::Object(map) => Field::Node(node_from_map(map, path, schema)?),
        Value::Array(items) => {
            let identity = identity_key(schema);
            let mut elements = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let item_path = format!("{}[{}]", path, index);
                let element = match item {
                    Value::Object(map) => Element::Node(node_from_map(map, &item_path, schema)?),
                    Value::Array(_) => {
                        return Err(ConfigError::ValidationError(format!(
                            "nested sequences are not supported at '{}'",
                            item_path
                        )))
                    }
                    Value::Null => {
                        return Err(ConfigError::ValidationError(format!(
                            "null sequence item at '{}'",
                            item_path
                        )))
                    }
                    scalar if identity.is_some() => {
                        return Err(ConfigError::ValidationError(format!(
                            "'{}' must be a table, found {}",
                            item_path,
                            kind(&scalar)
                        )))
                    }
                    scalar => match scalar_from_value(scalar) {
                        Some(s) => Element::Scalar(s),
                        None => continue,
                    },
                };
                elements.push(element);
            }
            let sequence = Sequence {
                items: elements,
                identity: identity.map(str::to_string),
            };
            check_unique_identities(&sequence, path)?;
            Field::List(sequence)
        }
        scalar => match scalar_from_value(scalar) {
            Some(s) => Field::Scalar(s),
            None => return Ok(None),
        },
    };
    Ok(Some(field))
}

fn scalar_from_value(value: Value) -> Option<Scalar> {
    match value {
        Value::String(s) => Some(Scalar::String(s)),
        Value::Bool(b) => Some(Scalar::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Scalar::Integer(i)),
            None => n.as_f64().map(Scalar::Float),
        },
        _ => None,
    }
}
