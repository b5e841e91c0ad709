//! Effective configuration with full provenance
//!
//! The effective config captures the frozen merged tree plus information
//! about which fragments contributed to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use super::defaults::BuiltinDefaults;
use super::formats::FormatRegistry;
use super::loader::{load_fragment, merge_fragments, Fragment};
use super::merge::MergeError;
use super::projection::Projection;

/// Origin of a configuration source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Repo,
    Cli,
}

impl ConfigOrigin {
    /// Base priority of this layer; fragments of one layer add their index
    pub fn base_priority(self) -> i32 {
        match self {
            ConfigOrigin::Builtin => 0,
            ConfigOrigin::Host => 1_000,
            ConfigOrigin::Repo => 2_000,
            ConfigOrigin::Cli => 3_000,
        }
    }
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    /// Built-in defaults source
    pub fn builtin() -> Self {
        Self {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }
    }

    /// Command-line override source
    pub fn cli() -> Self {
        Self {
            origin: ConfigOrigin::Cli,
            path: None,
            digest: None,
        }
    }
}

/// Fragment files to load, each tagged with its layer
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    pub files: Vec<(ConfigOrigin, PathBuf)>,
    /// Overrides applied last, with the highest priority
    pub cli_overrides: Option<Value>,
}

/// Frozen effective configuration with provenance
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// Contributing sources in merge order
    pub sources: Vec<ConfigSource>,

    projection: Projection,
}

#[derive(Serialize)]
struct Rendered<'a> {
    created_at: DateTime<Utc>,
    sources: &'a [ConfigSource],
    config: &'a serde_json::Map<String, Value>,
}

impl EffectiveConfig {
    /// Merge fragments on top of the built-in defaults and freeze the result.
    pub fn build(mut fragments: Vec<Fragment>) -> Result<Self, ConfigError> {
        fragments.insert(
            0,
            Fragment::new(
                ConfigSource::builtin(),
                ConfigOrigin::Builtin.base_priority(),
                BuiltinDefaults::default().to_node(),
            ),
        );

        let (merged, sources) = merge_fragments(fragments)?;
        tracing::debug!(fragments = sources.len(), "configuration merged");

        Ok(Self {
            created_at: Utc::now(),
            sources,
            projection: merged.freeze(),
        })
    }

    /// Load layer files from disk, then [`EffectiveConfig::build`].
    pub fn load(layers: &ConfigLayers, registry: &FormatRegistry) -> Result<Self, ConfigError> {
        let mut fragments = Vec::with_capacity(layers.files.len() + 1);
        for (index, (origin, path)) in layers.files.iter().enumerate() {
            let priority = origin.base_priority() + index as i32 + 1;
            fragments.push(load_fragment(path, *origin, priority, registry)?);
        }
        if let Some(overrides) = &layers.cli_overrides {
            // above every file, `Cli` files included
            let priority = ConfigOrigin::Cli.base_priority() + layers.files.len() as i32 + 1;
            fragments.push(Fragment::from_value(
                ConfigSource::cli(),
                priority,
                overrides.clone(),
            )?);
        }
        Self::build(fragments)
    }

    /// The frozen merged tree
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Serialize sources and config to JSON; secrets are redacted unless `full`.
    pub fn to_json(&self, full: bool) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Rendered {
            created_at: self.created_at,
            sources: &self.sources,
            config: self.projection.as_map(full),
        })
    }

    /// Get a string config value by dotted path
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.projection.view().get_path(path).and_then(|s| s.as_str())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("unsupported format '{format}', expected one of [{supported}]")]
    UnsupportedFormat { format: String, supported: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Merge(#[from] MergeError),
}
