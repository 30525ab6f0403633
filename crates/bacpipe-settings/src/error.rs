//! Error types for loading bacpipe settings
//!
//! Separates unreadable input (`Io`), malformed documents (`Parse`) and
//! documents that parse but do not fit the settings schema (`Schema`).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for settings operations
#[derive(Error, Debug)]
pub enum SettingsError {
    /// File access or I/O error
    #[error("File error: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed structured data; `message` already
    /// names the position when the parser reports one
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        location: Option<Location>,
    },

    /// The document does not fit the settings schema
    #[error("Schema error: {0}")]
    Schema(SchemaErrors),

    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SettingsError {
    /// Create an I/O error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SettingsError::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error without location
    pub fn parse_error(msg: impl Into<String>) -> Self {
        SettingsError::Parse {
            message: msg.into(),
            location: None,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        SettingsError::InvalidInput(msg.into())
    }

    /// Schema violations, if this is a schema error
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            SettingsError::Schema(errors) => errors.as_slice(),
            _ => &[],
        }
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SettingsError::Io { .. }
                | SettingsError::Parse { .. }
                | SettingsError::Schema(_)
                | SettingsError::InvalidInput(_)
        )
    }
}

impl From<serde_yaml::Error> for SettingsError {
    fn from(err: serde_yaml::Error) -> Self {
        let location = err.location().map(|l| Location {
            line: l.line(),
            column: l.column(),
        });
        SettingsError::Parse {
            message: format!("YAML error: {}", err),
            location,
        }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        let location = (err.line() > 0).then(|| Location {
            line: err.line(),
            column: err.column(),
        });
        SettingsError::Parse {
            message: format!("JSON error: {}", err),
            location,
        }
    }
}

impl From<toml::de::Error> for SettingsError {
    fn from(err: toml::de::Error) -> Self {
        SettingsError::Parse {
            message: format!("TOML error: {}", err),
            location: None,
        }
    }
}

/// Line/column position in a source document (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} column {}", self.line, self.column)
    }
}

/// A single field that does not fit the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path to the offending field
    pub path: String,
    /// What is wrong with it
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Field is absent
    pub fn missing(path: impl Into<String>, expected: &str) -> Self {
        Self::new(path, format!("missing required field, expected {}", expected))
    }

    /// Parameter required by the selected variant is absent
    pub fn missing_for(path: impl Into<String>, expected: &str, variant: &str) -> Self {
        Self::new(
            path,
            format!("missing parameter required by `{}`, expected {}", variant, expected),
        )
    }

    /// Field holds a value of the wrong type or outside its allowed set
    pub fn mismatch(path: impl Into<String>, expected: &str, found: &str) -> Self {
        Self::new(path, format!("expected {}, found {}", expected, found))
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.path, self.message)
    }
}

/// Every schema violation found in one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaErrors(Vec<SchemaViolation>);

impl SchemaErrors {
    pub fn new(violations: Vec<SchemaViolation>) -> Self {
        Self(violations)
    }

    pub fn as_slice(&self) -> &[SchemaViolation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First violation at exactly this path
    pub fn at(&self, path: &str) -> Option<&SchemaViolation> {
        self.0.iter().find(|v| v.path == path)
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.0.len())?;
        for violation in &self.0 {
            write!(f, "\n  {}", violation)?;
        }
        Ok(())
    }
}

impl IntoIterator for SchemaErrors {
    type Item = SchemaViolation;
    type IntoIter = std::vec::IntoIter<SchemaViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Result type alias for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SettingsError::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "Invalid input: test error");
    }

    #[test]
    fn test_location_display() {
        let location = Location { line: 3, column: 7 };
        assert_eq!(location.to_string(), "line 3 column 7");
    }

    #[test]
    fn test_schema_errors_display_lists_each_violation() {
        let err = SettingsError::Schema(SchemaErrors::new(vec![
            SchemaViolation::mismatch("device", "one of [cpu, cuda]", "string \"tpu\""),
            SchemaViolation::missing("global_batch_size", "non-negative integer"),
        ]));
        let text = err.to_string();
        assert!(text.starts_with("Schema error: 2 violation(s)"));
        assert!(text.contains("`device`: expected one of [cpu, cuda], found string \"tpu\""));
        assert!(text.contains("`global_batch_size`: missing required field"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_is_user_error() {
        assert!(SettingsError::invalid_input("test").is_user_error());
        assert!(SettingsError::parse_error("test").is_user_error());
        assert!(!SettingsError::Serialization("test".to_string()).is_user_error());
    }

    #[test]
    fn test_yaml_error_keeps_location() {
        let err: SettingsError = serde_yaml::from_str::<serde_yaml::Value>("a: [1, 2")
            .unwrap_err()
            .into();
        match err {
            SettingsError::Parse { location, .. } => assert!(location.is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
