//! Property context and placeholder resolution for release hooks.
//!
//! Hook commands carry `{{dotted.key}}` placeholders that are resolved against
//! a namespaced property tree at execution time. Resolution is a single pass
//! with a configurable policy for missing keys.

mod context;
mod resolve;

pub use context::{render_value, Lookup, Properties, PropertyContext};
pub use resolve::{placeholders, resolve, MissingKeyPolicy, TemplateError};
