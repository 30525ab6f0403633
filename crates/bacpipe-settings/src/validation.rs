//! Cross-field checks on loaded settings
//!
//! Typing problems are rejected while loading. The checks here look at
//! combinations the types cannot express (parameters that do not belong to
//! the selected algorithm, empty suffix lists, duplicated label keys) and
//! report them as [`ValidationIssue`]s. Whether an issue stops the pipeline
//! is up to the caller, see [`Strictness`].

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::error::{Result, SchemaErrors, SchemaViolation, SettingsError};
use crate::schema::{Classifier, Clusterer, Config, Named};

/// Severity levels for validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    /// Inconsistent settings that will misbehave if used
    Error,
    /// Suspicious settings worth a look
    Warning,
    /// Informational finding
    Info,
}

impl std::fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationSeverity::Error => write!(f, "error"),
            ValidationSeverity::Warning => write!(f, "warning"),
            ValidationSeverity::Info => write!(f, "info"),
        }
    }
}

/// A single cross-field finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    /// Stable code for this kind of issue
    pub code: String,
    pub message: String,
    /// Dotted path to the offending field
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: impl Into<String>, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(ValidationSeverity::Error, code, message, path)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(ValidationSeverity::Warning, code, message, path)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(ValidationSeverity::Info, code, message, path)
    }

    fn new(
        severity: ValidationSeverity,
        code: impl Into<String>,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            path: path.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion to the issue
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// How validation issues are treated by [`load_validated`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Issues are reported, loading succeeds
    #[default]
    Lenient,
    /// Errors and warnings fail the load as schema errors
    Strict,
}

/// A rule applied to loaded settings
pub trait ValidationRule: Send + Sync {
    fn check(&self, config: &Config, issues: &mut Vec<ValidationIssue>);

    fn name(&self) -> &'static str;
}

/// Runs a set of rules over a config
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Validator with the built-in rules
    pub fn new() -> Self {
        let mut validator = Self { rules: Vec::new() };
        validator.add_builtin_rules();
        validator
    }

    fn add_builtin_rules(&mut self) {
        self.rules.push(Box::new(VariantParametersRule));
        self.rules.push(Box::new(UnknownKeysRule));
        self.rules.push(Box::new(AudioSuffixesRule));
        self.rules.push(Box::new(ClassifierRule));
        self.rules.push(Box::new(LabelKeysRule));
        self.rules.push(Box::new(ClusterRule));
        self.rules.push(Box::new(ResultsPathsRule));
    }

    /// Add a custom rule after the built-in ones
    pub fn with_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Names of the rules in application order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn validate(&self, config: &Config) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for rule in &self.rules {
            rule.check(config, &mut issues);
        }
        issues
    }
}

/// Run the built-in checks; never fails
pub fn validate(config: &Config) -> Vec<ValidationIssue> {
    Validator::new().validate(config)
}

/// Load, validate, and apply `strictness` to the issues found
///
/// Every issue is logged. In strict mode any error or warning turns into a
/// [`SettingsError::Schema`]; info findings never fail a load.
pub fn load_validated(
    path: impl AsRef<Path>,
    strictness: Strictness,
) -> Result<(Config, Vec<ValidationIssue>)> {
    let config = Config::load(path)?;
    let issues = validate(&config);
    for issue in &issues {
        match issue.severity {
            ValidationSeverity::Error | ValidationSeverity::Warning => {
                tracing::warn!(code = %issue.code, path = %issue.path, "{}", issue.message)
            }
            ValidationSeverity::Info => {
                tracing::info!(code = %issue.code, path = %issue.path, "{}", issue.message)
            }
        }
    }
    escalate(&issues, strictness)?;
    Ok((config, issues))
}

/// Fail with a schema error if `strictness` does not tolerate `issues`
pub fn escalate(issues: &[ValidationIssue], strictness: Strictness) -> Result<()> {
    if strictness == Strictness::Lenient {
        return Ok(());
    }
    let violations: Vec<SchemaViolation> = issues
        .iter()
        .filter(|i| i.severity <= ValidationSeverity::Warning)
        .map(|i| SchemaViolation::new(i.path.as_str(), format!("[{}] {}", i.code, i.message)))
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SettingsError::Schema(SchemaErrors::new(violations)))
    }
}

fn key_list(keys: &Mapping) -> Vec<String> {
    keys.keys()
        .map(|k| match k.as_str() {
            Some(s) => s.to_string(),
            None => crate::document::describe(k),
        })
        .collect()
}

/// Parameters supplied to an entry that its `name` does not take
struct VariantParametersRule;

impl VariantParametersRule {
    fn report(
        issues: &mut Vec<ValidationIssue>,
        enabled: bool,
        path: &str,
        variant: &str,
        extra: &Mapping,
        legal: &[&str],
    ) {
        for key in key_list(extra) {
            let message = format!("`{}` is not a parameter of `{}`", key, variant);
            let field = format!("{}.{}", path, key);
            let issue = if enabled {
                ValidationIssue::error("V001", message, field)
            } else {
                ValidationIssue::warning("V001", message, field)
            };
            issues.push(issue.with_suggestion(format!(
                "`{}` takes: {}",
                variant,
                legal.join(", ")
            )));
        }
    }
}

impl ValidationRule for VariantParametersRule {
    fn check(&self, config: &Config, issues: &mut Vec<ValidationIssue>) {
        for (name, entry) in config.class_configs.iter() {
            let kind = entry.classifier.kind();
            Self::report(
                issues,
                entry.enabled,
                &format!("class_configs.{}", name),
                kind.name(),
                &entry.unrecognized,
                kind.parameters(),
            );
        }
        for (name, entry) in config.clust_configs.iter() {
            let kind = entry.algorithm.kind();
            let path = format!("clust_configs.{}", name);
            Self::report(
                issues,
                entry.enabled,
                &path,
                kind.name(),
                &entry.unrecognized,
                &["enabled", "name", "params"],
            );
            Self::report(
                issues,
                entry.enabled,
                &format!("{}.params", path),
                kind.name(),
                &entry.unrecognized_params,
                kind.parameters(),
            );
        }
        for (name, entry) in config.distance_configs.iter() {
            Self::report(
                issues,
                entry.enabled,
                &format!("distance_configs.{}", name),
                entry.metric.name(),
                &entry.unrecognized,
                &["enabled", "name", "method"],
            );
        }
    }

    fn name(&self) -> &'static str {
        "variant_parameters"
    }
}

struct UnknownKeysRule;

impl ValidationRule for UnknownKeysRule {
    fn check(&self, config: &Config, issues: &mut Vec<ValidationIssue>) {
        for key in config.unrecognized.keys() {
            let issue = match key.as_str() {
                Some(name) => ValidationIssue::warning(
                    "V002",
                    format!("unknown setting `{}` is ignored", name),
                    name,
                ),
                None => {
                    let described = crate::document::describe(key);
                    ValidationIssue::warning(
                        "V002",
                        format!(
                            "unknown setting with non-string key {} is ignored and is written as a string key in JSON",
                            described
                        ),
                        described,
                    )
                    .with_suggestion("quote the key or remove it")
                }
            };
            issues.push(issue);
        }
    }

    fn name(&self) -> &'static str {
        "unknown_keys"
    }
}

struct AudioSuffixesRule;

impl ValidationRule for AudioSuffixesRule {
    fn check(&self, config: &Config, issues: &mut Vec<ValidationIssue>) {
        let suffixes = &config.embedding.audio_suffixes;
        if suffixes.is_empty() {
            issues.push(
                ValidationIssue::error("V003", "no audio suffixes configured", "audio_suffixes")
                    .with_suggestion("list file endings such as .wav"),
            );
        }
        for (i, suffix) in suffixes.iter().enumerate() {
            if !suffix.starts_with('.') {
                issues.push(
                    ValidationIssue::warning(
                        "V004",
                        format!("suffix {:?} has no leading dot and matches any name ending in it", suffix),
                        format!("audio_suffixes[{}]", i),
                    )
                    .with_suggestion(format!(".{}", suffix)),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "audio_suffixes"
    }
}

struct ClassifierRule;

impl ValidationRule for ClassifierRule {
    fn check(&self, config: &Config, issues: &mut Vec<ValidationIssue>) {
        for (name, entry) in config.class_configs.enabled() {
            let path = format!("class_configs.{}", name);
            if let Classifier::Linear(linear) = &entry.classifier {
                if !(linear.learning_rate.is_finite() && linear.learning_rate > 0.0) {
                    issues.push(ValidationIssue::warning(
                        "V005",
                        format!("learning rate {} is not a positive number", linear.learning_rate),
                        format!("{}.learning_rate", path),
                    ));
                }
            }
            if entry.classifier.dataset_csv_path().as_os_str().is_empty() {
                issues.push(ValidationIssue::error(
                    "V006",
                    "dataset_csv_path is empty",
                    format!("{}.dataset_csv_path", path),
                ));
            }
        }
    }

    fn name(&self) -> &'static str {
        "classifiers"
    }
}

struct LabelKeysRule;

impl ValidationRule for LabelKeysRule {
    fn check(&self, config: &Config, issues: &mut Vec<ValidationIssue>) {
        let mut seen = HashSet::new();
        for (i, key) in config.evaluation.default_label_keys.iter().enumerate() {
            if !seen.insert(key.as_str()) {
                issues.push(ValidationIssue::warning(
                    "V007",
                    format!("label key `{}` is listed more than once", key),
                    format!("default_label_keys[{}]", i),
                ));
            }
        }
    }

    fn name(&self) -> &'static str {
        "label_keys"
    }
}

struct ClusterRule;

impl ValidationRule for ClusterRule {
    fn check(&self, config: &Config, issues: &mut Vec<ValidationIssue>) {
        for (name, entry) in config.clust_configs.iter() {
            if let Clusterer::Hdbscan {
                min_cluster_size,
                min_samples,
                ..
            } = &entry.algorithm
            {
                if min_samples > min_cluster_size {
                    issues.push(ValidationIssue::warning(
                        "V008",
                        format!(
                            "min_samples ({}) exceeds min_cluster_size ({})",
                            min_samples, min_cluster_size
                        ),
                        format!("clust_configs.{}.params.min_samples", name),
                    ));
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "clusterers"
    }
}

struct ResultsPathsRule;

impl ValidationRule for ResultsPathsRule {
    fn check(&self, config: &Config, issues: &mut Vec<ValidationIssue>) {
        for (key, dir) in config.paths.entries() {
            if dir.as_os_str().is_empty() {
                issues.push(ValidationIssue::error(
                    "V009",
                    "directory name is empty",
                    key,
                ));
            }
        }
    }

    fn name(&self) -> &'static str {
        "results_paths"
    }
}
