//! Configuration merge system
//!
//! Fragments are folded in ascending priority:
//! 1. Built-in defaults
//! 2. Host/user config (~/.config/release-hooks/config.<ext>)
//! 3. Repo config (.release-hooks.<ext>)
//! 4. CLI overrides
//!
//! The merged tree is frozen into a [`Projection`] before anything reads it.

mod defaults;
mod effective;
mod formats;
mod loader;
mod merge;
mod node;
mod projection;
mod schema;

pub use defaults::{write_defaults, BuiltinDefaults, InitOutcome};
pub use effective::{ConfigError, ConfigLayers, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use formats::{FormatHandler, FormatRegistry, ParseFn, RenderFn};
pub use loader::{discover_repo_config, load_fragment, merge_fragments, Fragment, REPO_CONFIG_STEM};
pub use merge::{check_unique_identities, merge, merge_into, MergeError};
pub use node::{is_sensitive_key, ConfigNode, Element, Field, Scalar, Sequence, Shape, REDACTED};
pub use projection::{Projection, ProjectionView};
pub use schema::{identity_key, is_mapping, node_from_value};
