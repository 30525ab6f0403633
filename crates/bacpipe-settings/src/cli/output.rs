//! Output formatting for the settings CLI
//!
//! Structured output as JSON or YAML, or a human-readable table with
//! severity-based coloring.

use std::io::Write;

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SettingsError};
use crate::layout::ResultsLayout;
use crate::schema::{Config, Toggle};
use crate::validation::{ValidationIssue, ValidationSeverity};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| SettingsError::Serialization(e.to_string()))?;
    writeln!(out, "{}", json).map_err(|e| SettingsError::io("<stdout>", e))
}

fn write_yaml<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<()> {
    let yaml =
        serde_yaml::to_string(value).map_err(|e| SettingsError::Serialization(e.to_string()))?;
    write!(out, "{}", yaml).map_err(|e| SettingsError::io("<stdout>", e))
}

/// Validation report for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutput {
    /// Settings file that was checked
    pub source: String,
    /// No error-severity issues
    pub valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub issues: Vec<ValidationIssue>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ValidationOutput {
    pub fn from_issues(source: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        let count = |severity: ValidationSeverity| {
            issues.iter().filter(|i| i.severity == severity).count()
        };
        let error_count = count(ValidationSeverity::Error);
        let warning_count = count(ValidationSeverity::Warning);
        let info_count = count(ValidationSeverity::Info);

        let valid = error_count == 0;
        let summary = if valid && warning_count == 0 {
            "Settings are valid".to_string()
        } else if valid {
            format!("Settings are valid with {} warning(s)", warning_count)
        } else {
            format!(
                "Settings have {} error(s) and {} warning(s)",
                error_count, warning_count
            )
        };

        Self {
            source: source.into(),
            valid,
            error_count,
            warning_count,
            info_count,
            issues,
            summary,
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    pub fn render(&self, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
        match format {
            OutputFormat::Json => write_json(out, self),
            OutputFormat::Yaml => write_yaml(out, self),
            OutputFormat::Table => self
                .render_table(out)
                .map_err(|e| SettingsError::io("<stdout>", e)),
        }
    }

    fn render_table(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", format!("Validation Results: {}", self.source).cyan().bold())?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out)?;

        let status = if self.valid { "+".green() } else { "x".red() };
        writeln!(out, "{} {}", status, self.summary)?;

        if !self.issues.is_empty() {
            writeln!(out)?;
            writeln!(out, "{}", "Issues:".cyan().bold())?;
            writeln!(out, "{}", "-".repeat(60))?;
            for issue in &self.issues {
                render_issue(out, issue)?;
            }
        }

        if let Some(duration) = self.duration_ms {
            writeln!(out)?;
            writeln!(out, "Completed in {} ms", duration.to_string().dimmed())?;
        }
        out.flush()
    }
}

fn render_issue(out: &mut dyn Write, issue: &ValidationIssue) -> std::io::Result<()> {
    let (icon, label) = match issue.severity {
        ValidationSeverity::Error => ("x".red(), "ERROR".red().bold()),
        ValidationSeverity::Warning => ("!".yellow(), "WARNING".yellow().bold()),
        ValidationSeverity::Info => ("i".blue(), "INFO".blue().bold()),
    };

    writeln!(out)?;
    writeln!(out, "{} [{}] {} {}", icon, issue.code.dimmed(), label, issue.message)?;
    writeln!(out, "  {} {}", "Path:".dimmed(), issue.path.cyan())?;
    if let Some(suggestion) = &issue.suggestion {
        writeln!(out, "  {} {}", "Fix:".dimmed(), suggestion.green())?;
    }
    Ok(())
}

/// Render the normalized settings document
pub fn render_config(config: &Config, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, &config.to_document()),
        OutputFormat::Yaml => write_yaml(out, &config.to_document()),
        OutputFormat::Table => {
            render_config_table(config, out).map_err(|e| SettingsError::io("<stdout>", e))
        }
    }
}

fn render_config_table(config: &Config, out: &mut dyn Write) -> std::io::Result<()> {
    let embedding = &config.embedding;
    writeln!(out, "{}", "Embedding".cyan().bold())?;
    writeln!(out, "  device:            {}", embedding.device)?;
    writeln!(out, "  checkpoints:       {}", embedding.model_base_path.display())?;
    writeln!(out, "  batch size:        {}", embedding.global_batch_size)?;
    writeln!(out, "  audio suffixes:    {}", embedding.audio_suffixes.join(" "))?;
    writeln!(
        out,
        "  cleanup on ctrl+c: {}",
        embedding.rm_embedding_on_keyboard_interrupt
    )?;
    writeln!(out)?;

    let evaluation = &config.evaluation;
    writeln!(out, "{}", "Evaluation".cyan().bold())?;
    writeln!(out, "  min label count:   {}", evaluation.min_label_occurances)?;
    writeln!(out, "  filter labels:     {}", evaluation.bool_filter_labels)?;
    writeln!(out, "  label keys:        {}", evaluation.default_label_keys.join(", "))?;
    writeln!(out)?;

    writeln!(out, "{}", "Classification".cyan().bold())?;
    for (name, entry) in config.class_configs.iter() {
        writeln!(out, "  {} {}: {}", toggle_mark(entry), name, entry.classifier)?;
    }
    writeln!(out, "{}", "Clustering".cyan().bold())?;
    for (name, entry) in config.clust_configs.iter() {
        writeln!(out, "  {} {}: {}", toggle_mark(entry), name, entry.algorithm)?;
    }
    writeln!(out, "{}", "Distance".cyan().bold())?;
    for (name, entry) in config.distance_configs.iter() {
        writeln!(
            out,
            "  {} {}: {} ({})",
            toggle_mark(entry),
            name,
            crate::schema::Named::name(entry.metric),
            crate::schema::Named::name(entry.method)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "Results".cyan().bold())?;
    for (key, dir) in config.paths.entries() {
        writeln!(out, "  {:<22} {}", format!("{}:", key), dir.display())?;
    }
    out.flush()
}

fn toggle_mark(entry: &impl Toggle) -> colored::ColoredString {
    if entry.is_enabled() {
        "+".green()
    } else {
        "-".dimmed()
    }
}

/// Render a resolved results layout
pub fn render_layout(layout: &ResultsLayout, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, layout),
        OutputFormat::Yaml => write_yaml(out, layout),
        OutputFormat::Table => {
            render_layout_table(layout, out).map_err(|e| SettingsError::io("<stdout>", e))
        }
    }
}

fn render_layout_table(layout: &ResultsLayout, out: &mut dyn Write) -> std::io::Result<()> {
    let rows = [
        ("dataset", &layout.dataset_root),
        ("embeddings", &layout.embed_dir),
        ("dim. reduced", &layout.dim_reduc_dir),
        ("evaluations", &layout.evaluations_dir),
    ];
    for (label, dir) in rows {
        writeln!(out, "{:<14} {}", format!("{}:", label), dir.display())?;
    }
    out.flush()
}
