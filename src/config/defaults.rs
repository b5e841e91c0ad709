//! Built-in defaults (lowest-priority fragment) and the `init` write-back

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::effective::ConfigError;
use super::formats::FormatRegistry;
use super::loader::REPO_CONFIG_STEM;
use super::node::ConfigNode;
use super::schema::node_from_value;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Whole-section hook switch (default: "ALWAYS")
    pub hooks_active: String,

    /// Kind of release this run performs (default: "release")
    pub release_kind: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            hooks_active: "ALWAYS".to_string(),
            release_kind: "release".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a JSON value for rendering
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "release": {
                "kind": self.release_kind
            },
            "hooks": {
                "active": self.hooks_active,
                "before": [],
                "after": []
            }
        })
    }

    /// Convert to a tree for merging
    pub fn to_node(&self) -> ConfigNode {
        // The default value is always a well-formed table.
        node_from_value(self.to_value()).unwrap_or_default()
    }
}

/// Result of writing the default config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Written(PathBuf),
    /// The file exists and overwriting was not requested
    AlreadyExists(PathBuf),
}

/// Write the built-in defaults to `dir/.release-hooks.<ext>`.
pub fn write_defaults(
    dir: &Path,
    format: &str,
    overwrite: bool,
    registry: &FormatRegistry,
) -> Result<InitOutcome, ConfigError> {
    let handler = registry.get(format)?;
    let path = dir.join(format!(
        "{}.{}",
        REPO_CONFIG_STEM,
        handler.preferred_extension()
    ));
    let contents = (handler.render)(&BuiltinDefaults::default().to_value())?;

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let mut file = match options.open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(InitOutcome::AlreadyExists(path));
        }
        Err(e) => return Err(ConfigError::IoError(format!("{}: {}", path.display(), e))),
    };
    file.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    tracing::info!(path = %path.display(), "wrote default configuration");
    Ok(InitOutcome::Written(path))
}
