//! Fragment loading and priority-ordered folding

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::effective::{ConfigError, ConfigOrigin, ConfigSource};
use super::formats::FormatRegistry;
use super::merge::{merge_into, MergeError};
use super::node::ConfigNode;
use super::schema::node_from_value;

/// Base name of the repository config file
pub const REPO_CONFIG_STEM: &str = ".release-hooks";

/// One configuration tree tagged with its source and priority
#[derive(Debug, Clone)]
pub struct Fragment {
    pub source: ConfigSource,
    /// Lower priorities are merged first; later merges override
    pub priority: i32,
    pub node: ConfigNode,
}

impl Fragment {
    /// Wrap an already-built tree
    pub fn new(source: ConfigSource, priority: i32, node: ConfigNode) -> Self {
        Self {
            source,
            priority,
            node,
        }
    }

    /// Build from a parsed generic value
    pub fn from_value(source: ConfigSource, priority: i32, value: Value) -> Result<Self, ConfigError> {
        Ok(Self::new(source, priority, node_from_value(value)?))
    }
}

/// Read, digest and parse a fragment file, choosing the format by extension.
pub fn load_fragment(
    path: &Path,
    origin: ConfigOrigin,
    priority: i32,
    registry: &FormatRegistry,
) -> Result<Fragment, ConfigError> {
    let handler = registry.for_path(path)?;
    let bytes = fs::read(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|e| {
        ConfigError::ParseError(format!("{}: invalid UTF-8: {}", path.display(), e))
    })?;
    let value = (handler.parse)(&contents)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

    let source = ConfigSource {
        origin,
        path: Some(path.to_string_lossy().to_string()),
        digest: Some(digest),
    };
    Fragment::from_value(source, priority, value)
}

/// Find `.release-hooks.<ext>` in `dir` for any registered extension
pub fn discover_repo_config(dir: &Path, registry: &FormatRegistry) -> Option<PathBuf> {
    registry
        .extensions()
        .map(|ext| dir.join(format!("{}.{}", REPO_CONFIG_STEM, ext)))
        .find(|candidate| candidate.is_file())
}

/// Fold fragments in ascending priority into one tree.
///
/// The sort is stable, so fragments with equal priority merge in listing
/// order. Returns the merged tree and the sources in merge order.
pub fn merge_fragments(
    mut fragments: Vec<Fragment>,
) -> Result<(ConfigNode, Vec<ConfigSource>), MergeError> {
    fragments.sort_by_key(|f| f.priority);

    let mut merged = ConfigNode::new();
    let mut sources = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        tracing::debug!(
            origin = ?fragment.source.origin,
            path = fragment.source.path.as_deref().unwrap_or("-"),
            priority = fragment.priority,
            "merging configuration fragment"
        );
        merge_into(&mut merged, fragment.node)?;
        sources.push(fragment.source);
    }
    Ok((merged, sources))
}
