//! Fragment format registry
//!
//! Maps a format id to its parse and render functions. Formats are
//! registered explicitly; [`FormatRegistry::builtin`] registers TOML, JSON
//! and YAML in that order.

use serde_json::Value;
use std::path::Path;

use super::effective::ConfigError;

/// Parse raw fragment text into a generic value
pub type ParseFn = fn(&str) -> Result<Value, ConfigError>;

/// Render a generic value as fragment text
pub type RenderFn = fn(&Value) -> Result<String, ConfigError>;

/// One registered fragment format
#[derive(Debug, Clone, Copy)]
pub struct FormatHandler {
    /// Format identifier (`toml`, `json`, `yaml`)
    pub id: &'static str,
    /// File extensions, preferred first
    pub extensions: &'static [&'static str],
    pub parse: ParseFn,
    pub render: RenderFn,
}

impl FormatHandler {
    /// Preferred file extension
    pub fn preferred_extension(&self) -> &'static str {
        self.extensions.first().copied().unwrap_or(self.id)
    }
}

/// Registry of fragment formats
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    handlers: Vec<FormatHandler>,
}

impl FormatRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in formats
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FormatHandler {
            id: "toml",
            extensions: &["toml"],
            parse: parse_toml,
            render: render_toml,
        });
        registry.register(FormatHandler {
            id: "json",
            extensions: &["json"],
            parse: parse_json,
            render: render_json,
        });
        registry.register(FormatHandler {
            id: "yaml",
            extensions: &["yml", "yaml"],
            parse: parse_yaml,
            render: render_yaml,
        });
        registry
    }

    /// Register a format, replacing any handler with the same id
    pub fn register(&mut self, handler: FormatHandler) {
        self.handlers.retain(|h| h.id != handler.id);
        self.handlers.push(handler);
    }

    /// Look up a format by id
    pub fn get(&self, id: &str) -> Result<&FormatHandler, ConfigError> {
        let id = id.to_ascii_lowercase();
        self.handlers
            .iter()
            .find(|h| h.id == id)
            .ok_or_else(|| self.unsupported(&id))
    }

    /// Look up a format by file extension
    pub fn for_path(&self, path: &Path) -> Result<&FormatHandler, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        self.handlers
            .iter()
            .find(|h| h.extensions.contains(&ext.as_str()))
            .ok_or_else(|| self.unsupported(&ext))
    }

    /// Registered format ids in registration order
    pub fn supported_formats(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.id).collect()
    }

    /// Registered handlers in registration order
    pub fn handlers(&self) -> &[FormatHandler] {
        &self.handlers
    }

    /// Every registered extension
    pub fn extensions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().flat_map(|h| h.extensions.iter().copied())
    }

    fn unsupported(&self, format: &str) -> ConfigError {
        ConfigError::UnsupportedFormat {
            format: format.to_string(),
            supported: self.supported_formats().join("|"),
        }
    }
}

fn parse_toml(contents: &str) -> Result<Value, ConfigError> {
    let value: toml::Value = toml::from_str(contents)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
    Ok(toml_to_json(value))
}

fn render_toml(value: &Value) -> Result<String, ConfigError> {
    toml::to_string_pretty(value)
        .map_err(|e| ConfigError::ParseError(format!("TOML render error: {}", e)))
}

fn parse_json(contents: &str) -> Result<Value, ConfigError> {
    serde_json::from_str(contents)
        .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))
}

fn render_json(value: &Value) -> Result<String, ConfigError> {
    serde_json::to_string_pretty(value)
        .map(|mut s| {
            s.push('\n');
            s
        })
        .map_err(|e| ConfigError::ParseError(format!("JSON render error: {}", e)))
}

fn parse_yaml(contents: &str) -> Result<Value, ConfigError> {
    serde_yaml::from_str(contents)
        .map_err(|e| ConfigError::ParseError(format!("YAML parse error: {}", e)))
}

fn render_yaml(value: &Value) -> Result<String, ConfigError> {
    serde_yaml::to_string(value)
        .map_err(|e| ConfigError::ParseError(format!("YAML render error: {}", e)))
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_order() {
        let registry = FormatRegistry::builtin();
        assert_eq!(registry.supported_formats(), vec!["toml", "json", "yaml"]);
    }

    #[test]
    fn test_lookup_by_extension() {
        let registry = FormatRegistry::builtin();
        assert_eq!(registry.for_path(Path::new("a/.release-hooks.yaml")).unwrap().id, "yaml");
        assert_eq!(registry.for_path(Path::new("x.YML")).unwrap().id, "yaml");
        assert_eq!(registry.for_path(Path::new("x.toml")).unwrap().id, "toml");

        let err = registry.for_path(Path::new("x.ini")).unwrap_err();
        assert!(err.to_string().contains("toml|json|yaml"));
    }

    #[test]
    fn test_lookup_by_id_case_insensitive() {
        let registry = FormatRegistry::builtin();
        assert_eq!(registry.get("JSON").unwrap().preferred_extension(), "json");
        assert!(registry.get("xml").is_err());
    }

    #[test]
    fn test_register_replaces_same_id() {
        fn parse_nothing(_: &str) -> Result<Value, ConfigError> {
            Ok(Value::Null)
        }
        let mut registry = FormatRegistry::builtin();
        registry.register(FormatHandler {
            id: "json",
            extensions: &["jsonc"],
            parse: parse_nothing,
            render: render_json,
        });
        assert_eq!(registry.supported_formats(), vec!["toml", "yaml", "json"]);
        assert!(registry.for_path(Path::new("x.jsonc")).is_ok());
        assert!(registry.for_path(Path::new("x.json")).is_err());
    }

    #[test]
    fn test_parse_equivalent_formats() {
        let registry = FormatRegistry::builtin();
        let toml = (registry.get("toml").unwrap().parse)(
            "[hooks]\nactive = \"ALWAYS\"\n\n[[hooks.before]]\nname = \"lint\"\ntimeout = 30\n",
        )
        .unwrap();
        let yaml = (registry.get("yaml").unwrap().parse)(
            "hooks:\n  active: ALWAYS\n  before:\n    - name: lint\n      timeout: 30\n",
        )
        .unwrap();
        let expected = json!({"hooks": {"active": "ALWAYS", "before": [{"name": "lint", "timeout": 30}]}});
        assert_eq!(toml, expected);
        assert_eq!(yaml, expected);
    }

    #[test]
    fn test_parse_errors() {
        let registry = FormatRegistry::builtin();
        let err = (registry.get("toml").unwrap().parse)("not = [valid").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_render_round_trips_through_parse() {
        let registry = FormatRegistry::builtin();
        let value = json!({"release": {"kind": "release"}, "hooks": {"active": "ALWAYS", "before": []}});
        for id in registry.supported_formats() {
            let handler = registry.get(id).unwrap();
            let text = (handler.render)(&value).unwrap();
            assert_eq!((handler.parse)(&text).unwrap(), value, "format {}", id);
        }
    }
}
