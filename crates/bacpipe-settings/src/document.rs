//! Reading settings sources into a document tree
//!
//! YAML, JSON and TOML sources all land in a `serde_yaml::Value`, whose
//! mappings keep document order.

use std::fmt;
use std::io::Read;
use std::path::Path;

use serde_yaml::Value;

use crate::error::{Result, SettingsError};

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            "toml" => Ok(Format::Toml),
            _ => Err(SettingsError::invalid_input(format!(
                "Unsupported file format: '{}'. Supported formats: yaml, yml, json, toml",
                extension
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Yaml => write!(f, "yaml"),
            Format::Json => write!(f, "json"),
            Format::Toml => write!(f, "toml"),
        }
    }
}

/// Parse source text into a document tree
pub fn parse_document(content: &str, format: Format) -> Result<Value> {
    tracing::debug!(%format, bytes = content.len(), "parsing settings document");

    let value = match format {
        Format::Yaml => serde_yaml::from_str(content)?,
        Format::Json => serde_json::from_str(content)?,
        Format::Toml => toml::from_str(content)?,
    };
    Ok(value)
}

/// Read a whole stream and parse it
pub fn read_from<R: Read>(mut reader: R, format: Format) -> Result<Value> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| SettingsError::io("<stream>", e))?;
    parse_document(&content, format)
}

/// Read a settings file, picking the parser from its extension
pub fn read_document(path: &Path) -> Result<Value> {
    let format = Format::from_path(path)?;
    tracing::debug!(path = %path.display(), "reading settings file");
    let content = std::fs::read_to_string(path).map_err(|e| SettingsError::io(path, e))?;
    parse_document(&content, format)
}

/// Short description of a value for error messages
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean `{}`", b),
        Value::Number(n) if n.is_f64() => format!("float `{}`", n),
        Value::Number(n) => format!("integer `{}`", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Sequence(_) => "sequence".to_string(),
        Value::Mapping(_) => "mapping".to_string(),
        Value::Tagged(tagged) => format!("tagged value `{}`", tagged.tag),
    }
}
