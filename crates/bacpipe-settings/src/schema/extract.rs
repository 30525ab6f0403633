//! Typed extraction from a document tree
//!
//! Every getter records a [`SchemaViolation`] whenever it returns `None`, so
//! a whole document can be walked before failing and all problems reported
//! together.

use serde_yaml::{Mapping, Value};

use super::Named;
use crate::document::describe;
use crate::error::{Result, SchemaErrors, SchemaViolation, SettingsError};

const NON_NEGATIVE_INTEGER: &str = "non-negative integer";

/// Join a dotted field path
pub(crate) fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Render an allowed value set for messages
pub(crate) fn one_of(names: &[&str]) -> String {
    format!("one of [{}]", names.join(", "))
}

/// Entries of `map` whose key is not in `allowed`, in document order
pub(crate) fn unrecognized(map: &Mapping, allowed: &[&str]) -> Mapping {
    map.iter()
        .filter(|(key, _)| !key.as_str().is_some_and(|k| allowed.contains(&k)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Accumulates schema violations while walking a document
#[derive(Debug, Default)]
pub(crate) struct Extractor {
    violations: Vec<SchemaViolation>,
    variant: Option<&'static str>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, violation: SchemaViolation) {
        self.violations.push(violation);
    }

    /// Run `f` with missing fields attributed to `variant`
    pub fn for_variant<T>(&mut self, variant: &'static str, f: impl FnOnce(&mut Self) -> T) -> T {
        let outer = self.variant.replace(variant);
        let value = f(self);
        self.variant = outer;
        value
    }

    /// Turn the walk into a result: any violation fails the whole document
    pub fn finish<T>(self, value: Option<T>) -> Result<T> {
        match value {
            Some(value) if self.violations.is_empty() => Ok(value),
            _ if !self.violations.is_empty() => {
                Err(SettingsError::Schema(SchemaErrors::new(self.violations)))
            }
            _ => Err(SettingsError::Schema(SchemaErrors::new(vec![SchemaViolation::new(
                "",
                "document is incomplete",
            )]))),
        }
    }

    fn required<'a>(
        &mut self,
        map: &'a Mapping,
        path: &str,
        key: &str,
        expected: &str,
    ) -> Option<&'a Value> {
        let value = map.get(key);
        if value.is_none() {
            let violation = match self.variant {
                Some(variant) => SchemaViolation::missing_for(child(path, key), expected, variant),
                None => SchemaViolation::missing(child(path, key), expected),
            };
            self.report(violation);
        }
        value
    }

    // Value-level conversions

    pub fn as_mapping<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Mapping> {
        match value {
            Value::Mapping(map) => Some(map),
            other => {
                self.report(SchemaViolation::mismatch(path, "mapping", &describe(other)));
                None
            }
        }
    }

    pub fn as_bool(&mut self, value: &Value, path: &str) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            other => {
                self.report(SchemaViolation::mismatch(path, "boolean", &describe(other)));
                None
            }
        }
    }

    pub fn as_string(&mut self, value: &Value, path: &str) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.report(SchemaViolation::mismatch(path, "string", &describe(other)));
                None
            }
        }
    }

    /// Counts, sizes and epochs: integers, zero allowed, negatives rejected
    pub fn as_count(&mut self, value: &Value, path: &str) -> Option<u64> {
        match value {
            Value::Number(n) => {
                if let Some(count) = n.as_u64() {
                    Some(count)
                } else {
                    let message = if n.is_i64() {
                        format!("expected {}, found negative integer `{}`", NON_NEGATIVE_INTEGER, n)
                    } else {
                        format!("expected {}, found {}", NON_NEGATIVE_INTEGER, describe(value))
                    };
                    self.report(SchemaViolation::new(path, message));
                    None
                }
            }
            other => {
                self.report(SchemaViolation::mismatch(
                    path,
                    NON_NEGATIVE_INTEGER,
                    &describe(other),
                ));
                None
            }
        }
    }

    /// Any number; integers are widened
    pub fn as_number(&mut self, value: &Value, path: &str) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            other => {
                self.report(SchemaViolation::mismatch(path, "number", &describe(other)));
                None
            }
        }
    }

    pub fn as_variant<T: Named>(&mut self, value: &Value, path: &str) -> Option<T> {
        match value {
            Value::String(s) => {
                let variant = T::from_name(s);
                if variant.is_none() {
                    self.report(SchemaViolation::mismatch(
                        path,
                        &one_of(T::NAMES),
                        &describe(value),
                    ));
                }
                variant
            }
            other => {
                self.report(SchemaViolation::mismatch(
                    path,
                    &one_of(T::NAMES),
                    &describe(other),
                ));
                None
            }
        }
    }

    /// Ordered list of strings; duplicates kept
    pub fn as_string_list(&mut self, value: &Value, path: &str) -> Option<Vec<String>> {
        let items = match value {
            Value::Sequence(items) => items,
            other => {
                self.report(SchemaViolation::mismatch(
                    path,
                    "sequence of strings",
                    &describe(other),
                ));
                return None;
            }
        };

        let mut strings = Vec::with_capacity(items.len());
        let mut complete = true;
        for (i, item) in items.iter().enumerate() {
            match self.as_string(item, &format!("{}[{}]", path, i)) {
                Some(s) => strings.push(s),
                None => complete = false,
            }
        }
        complete.then_some(strings)
    }

    // Mapping-level getters

    pub fn mapping<'a>(&mut self, map: &'a Mapping, path: &str, key: &str) -> Option<&'a Mapping> {
        let value = self.required(map, path, key, "mapping")?;
        self.as_mapping(value, &child(path, key))
    }

    pub fn boolean(&mut self, map: &Mapping, path: &str, key: &str) -> Option<bool> {
        let value = self.required(map, path, key, "boolean")?;
        self.as_bool(value, &child(path, key))
    }

    pub fn string(&mut self, map: &Mapping, path: &str, key: &str) -> Option<String> {
        let value = self.required(map, path, key, "string")?;
        self.as_string(value, &child(path, key))
    }

    pub fn count(&mut self, map: &Mapping, path: &str, key: &str) -> Option<u64> {
        let value = self.required(map, path, key, NON_NEGATIVE_INTEGER)?;
        self.as_count(value, &child(path, key))
    }

    pub fn number(&mut self, map: &Mapping, path: &str, key: &str) -> Option<f64> {
        let value = self.required(map, path, key, "number")?;
        self.as_number(value, &child(path, key))
    }

    pub fn string_list(&mut self, map: &Mapping, path: &str, key: &str) -> Option<Vec<String>> {
        let value = self.required(map, path, key, "sequence of strings")?;
        self.as_string_list(value, &child(path, key))
    }

    pub fn variant<T: Named>(&mut self, map: &Mapping, path: &str, key: &str) -> Option<T> {
        let value = self.required(map, path, key, &one_of(T::NAMES))?;
        self.as_variant(value, &child(path, key))
    }

    /// A mapping of user-named entries, each parsed by `parse`
    pub fn named_entries<T>(
        &mut self,
        map: &Mapping,
        path: &str,
        key: &str,
        parse: impl Fn(&mut Self, &Value, &str) -> Option<T>,
    ) -> Option<Vec<(String, T)>> {
        let entries = self.mapping(map, path, key)?;
        let path = child(path, key);

        let mut parsed = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let Some(name) = name.as_str() else {
                self.report(SchemaViolation::mismatch(
                    path.as_str(),
                    "string entry names",
                    &describe(name),
                ));
                continue;
            };
            if let Some(entry) = parse(self, value, &child(&path, name)) {
                parsed.push((name.to_string(), entry));
            }
        }
        Some(parsed)
    }
}
