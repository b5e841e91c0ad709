//! Configuration merge logic
//!
//! Folds priority-ordered fragments into one tree, mutating the target:
//! - Scalars: override if present in the source
//! - Nodes: merged field by field (recursive)
//! - Sequences: target order kept, novel source items appended; with an
//!   identity key, matching items are merged recursively
//! - Mappings: union of keys, shared keys merged recursively
//!
//! A field whose shape differs between target and source is an error.

use super::node::{ConfigNode, Element, Field, Sequence, Shape};

/// Merge errors. All of them abort the run before any hook executes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("cannot merge {incoming} into {target} at '{path}'")]
    ShapeMismatch {
        path: String,
        target: Shape,
        incoming: Shape,
    },

    #[error("duplicate {key} '{value}' in sequence '{path}'")]
    DuplicateIdentity {
        path: String,
        key: String,
        value: String,
    },

    #[error("sequence '{path}' is keyed by '{target}' in one fragment and '{incoming}' in another")]
    IdentityMismatch {
        path: String,
        target: String,
        incoming: String,
    },
}

/// Merge `source` into `target`, returning the merged tree.
pub fn merge(mut target: ConfigNode, source: ConfigNode) -> Result<ConfigNode, MergeError> {
    merge_into(&mut target, source)?;
    Ok(target)
}

/// Merge `source` into `target` in place.
pub fn merge_into(target: &mut ConfigNode, source: ConfigNode) -> Result<(), MergeError> {
    merge_node(target, source, "")
}

/// Reject sequences whose identity key repeats.
pub fn check_unique_identities(seq: &Sequence, path: &str) -> Result<(), MergeError> {
    let Some(key) = seq.identity.as_deref() else {
        return Ok(());
    };
    let mut seen = Vec::new();
    for item in &seq.items {
        if let Some(id) = item.identity(key) {
            if seen.contains(&id) {
                return Err(MergeError::DuplicateIdentity {
                    path: path.to_string(),
                    key: key.to_string(),
                    value: id.to_string(),
                });
            }
            seen.push(id);
        }
    }
    Ok(())
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn merge_node(target: &mut ConfigNode, source: ConfigNode, path: &str) -> Result<(), MergeError> {
    let (fields, sensitive) = source.take_parts();
    target.absorb_sensitive(sensitive);

    for (name, source_field) in fields {
        let field_path = join(path, &name);
        match target.fields_mut().get_mut(&name) {
            Some(target_field) => merge_field(target_field, source_field, &field_path)?,
            None => {
                target.fields_mut().insert(name, source_field);
            }
        }
    }
    Ok(())
}

fn merge_field(target: &mut Field, source: Field, path: &str) -> Result<(), MergeError> {
    match (target, source) {
        (Field::Scalar(t), Field::Scalar(s)) => *t = s,
        (Field::Node(t), Field::Node(s)) => merge_node(t, s, path)?,
        (Field::List(t), Field::List(s)) => merge_sequence(t, s, path)?,
        (Field::Map(t), Field::Map(s)) => {
            for (key, node) in s {
                match t.get_mut(&key) {
                    Some(existing) => merge_node(existing, node, &join(path, &key))?,
                    None => {
                        t.insert(key, node);
                    }
                }
            }
        }
        (t, s) => {
            return Err(MergeError::ShapeMismatch {
                path: path.to_string(),
                target: t.shape(),
                incoming: s.shape(),
            })
        }
    }
    Ok(())
}

fn merge_sequence(target: &mut Sequence, source: Sequence, path: &str) -> Result<(), MergeError> {
    if let (Some(t), Some(s)) = (&target.identity, &source.identity) {
        if t != s {
            return Err(MergeError::IdentityMismatch {
                path: path.to_string(),
                target: t.clone(),
                incoming: s.clone(),
            });
        }
    }
    if target.identity.is_none() {
        target.identity = source.identity.clone();
    }
    check_unique_identities(&source, path)?;

    let identity = target.identity.clone();
    for item in source.items {
        let keyed = identity
            .as_deref()
            .and_then(|key| item.identity(key).cloned().map(|id| (key, id)));

        match keyed {
            Some((key, id)) => {
                let position = target
                    .items
                    .iter()
                    .position(|existing| existing.identity(key) == Some(&id));
                match position {
                    Some(index) => {
                        if let (Element::Node(existing), Element::Node(incoming)) =
                            (&mut target.items[index], item)
                        {
                            merge_node(existing, incoming, &format!("{}[{}]", path, index))?;
                        }
                    }
                    None => target.items.push(item),
                }
            }
            None => {
                if !target.items.contains(&item) {
                    target.items.push(item);
                }
            }
        }
    }
    Ok(())
}
