//! CLI command definitions for the settings tool
//!
//! Clap-based commands for validating a settings file, printing its
//! normalized form, resolving the results layout and listing audio inputs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};

use super::output::{render_config, render_layout, OutputFormat, ValidationOutput};
use super::ExitCode;
use crate::audio::discover_audio_files;
use crate::error::SettingsError;
use crate::schema::Config;
use crate::validation::{escalate, validate, Strictness};

/// bacpipe settings tool
///
/// Check a pipeline settings file and inspect what the pipeline derives from it.
#[derive(Parser, Debug)]
#[command(name = "bacpipe-settings")]
#[command(about = "Validate and inspect bacpipe pipeline settings", long_about = None)]
#[command(version)]
pub struct SettingsCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress command output and logs; errors are still printed
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: SettingsCommands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Load a settings file and run the cross-field checks
    Validate {
        /// Path to the settings file (yaml, json or toml)
        #[arg(short, long, default_value = "settings.yaml")]
        config: PathBuf,

        /// Output format for validation results
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Treat warnings and errors as schema errors
        #[arg(long)]
        strict: bool,
    },

    /// Print the settings in normalized form
    Show {
        #[arg(short, long, default_value = "settings.yaml")]
        config: PathBuf,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Use the test results root
        #[arg(long)]
        testing: bool,
    },

    /// Resolve the results directories for a dataset
    Paths {
        #[arg(short, long, default_value = "settings.yaml")]
        config: PathBuf,

        /// Directory holding the dataset's audio files
        #[arg(short, long)]
        audio_dir: PathBuf,

        #[arg(long)]
        testing: bool,

        /// Create the directories
        #[arg(long)]
        create: bool,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List the audio files a dataset directory contributes
    AudioFiles {
        #[arg(short, long, default_value = "settings.yaml")]
        config: PathBuf,

        #[arg(short, long)]
        audio_dir: PathBuf,
    },
}

/// Execute the validate command
pub fn execute_validate(
    config: PathBuf,
    format: OutputFormat,
    strict: bool,
    out: &mut dyn Write,
) -> Result<ExitCode, SettingsError> {
    let start = Instant::now();
    let settings = Config::load(&config)?;
    let issues = validate(&settings);
    let duration = start.elapsed().as_millis() as u64;

    let output =
        ValidationOutput::from_issues(config.display().to_string(), issues).with_duration(duration);
    output.render(format, out)?;

    if strict {
        escalate(&output.issues, Strictness::Strict)?;
    }
    Ok(ExitCode::from_validation_result(
        output.has_errors(),
        output.has_warnings(),
    ))
}

/// Execute the show command
pub fn execute_show(
    config: PathBuf,
    format: OutputFormat,
    testing: bool,
    out: &mut dyn Write,
) -> Result<ExitCode, SettingsError> {
    let settings = load(&config, testing)?;
    render_config(&settings, format, out)?;
    Ok(ExitCode::Success)
}

/// Execute the paths command
pub fn execute_paths(
    config: PathBuf,
    audio_dir: PathBuf,
    testing: bool,
    create: bool,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<ExitCode, SettingsError> {
    let settings = load(&config, testing)?;
    let layout = settings.layout(&audio_dir)?;
    if create {
        layout.create_all()?;
    }
    render_layout(&layout, format, out)?;
    Ok(ExitCode::Success)
}

/// Execute the audio-files command
pub fn execute_audio_files(
    config: PathBuf,
    audio_dir: PathBuf,
    out: &mut dyn Write,
) -> Result<ExitCode, SettingsError> {
    let settings = Config::load(&config)?;
    let files = discover_audio_files(&settings.embedding, &audio_dir)?;
    for file in &files {
        writeln!(out, "{}", file.display()).map_err(|e| SettingsError::io("<stdout>", e))?;
    }
    Ok(ExitCode::Success)
}

fn load(config: &Path, testing: bool) -> Result<Config, SettingsError> {
    let settings = Config::load(config)?;
    Ok(if testing {
        settings.for_testing()
    } else {
        settings
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::EXAMPLE;

    fn settings_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("settings.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_validate_command() {
        let cli = SettingsCli::try_parse_from([
            "bacpipe-settings",
            "validate",
            "--config",
            "s.yaml",
            "--strict",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            SettingsCommands::Validate {
                config,
                format,
                strict,
            } => {
                assert_eq!(config, PathBuf::from("s.yaml"));
                assert_eq!(format, OutputFormat::Json);
                assert!(strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_config_defaults_to_settings_yaml() {
        let cli = SettingsCli::try_parse_from(["bacpipe-settings", "-vv", "show"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            SettingsCommands::Show { config, format, .. } => {
                assert_eq!(config, PathBuf::from("settings.yaml"));
                assert_eq!(format, OutputFormat::Table);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_paths_requires_audio_dir() {
        assert!(SettingsCli::try_parse_from(["bacpipe-settings", "paths"]).is_err());
    }

    #[test]
    fn test_execute_validate_clean() {
        let tmp = tempfile::tempdir().unwrap();
        let path = settings_file(tmp.path(), EXAMPLE);
        let mut out = Vec::new();
        let code = execute_validate(path, OutputFormat::Json, false, &mut out).unwrap();
        assert_eq!(code, ExitCode::Success);
    }

    #[test]
    fn test_execute_validate_warning_exit_codes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = settings_file(tmp.path(), &format!("{}\nunused: 1\n", EXAMPLE));

        let mut out = Vec::new();
        let code = execute_validate(path.clone(), OutputFormat::Json, false, &mut out).unwrap();
        assert_eq!(code, ExitCode::ValidationWarning);

        let err = execute_validate(path, OutputFormat::Json, true, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, SettingsError::Schema(_)));
    }

    #[test]
    fn test_execute_paths_creates_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let results = tmp.path().join("out");
        let content = EXAMPLE.replace(
            "main_results_dir: results",
            &format!("main_results_dir: {}", results.display()),
        );
        let path = settings_file(tmp.path(), &content);

        let mut out = Vec::new();
        execute_paths(
            path,
            PathBuf::from("/data/birds"),
            false,
            true,
            OutputFormat::Table,
            &mut out,
        )
        .unwrap();
        assert!(results.join("birds/evaluations").is_dir());
        assert!(String::from_utf8(out).unwrap().contains("birds"));
    }

    #[test]
    fn test_execute_audio_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = settings_file(tmp.path(), EXAMPLE);
        let audio = tmp.path().join("audio");
        std::fs::create_dir_all(&audio).unwrap();
        std::fs::write(audio.join("a.wav"), b"").unwrap();

        let mut out = Vec::new();
        execute_audio_files(path, audio, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().trim_end().ends_with("a.wav"));
    }
}
