//! CLI module for the settings tool
//!
//! Validates settings files, prints their normalized form, and shows what
//! the pipeline derives from them (results layout, audio inputs).

pub mod commands;
pub mod output;

pub use commands::{SettingsCli, SettingsCommands};
pub use output::{OutputFormat, ValidationOutput};

use std::io::Write;

use crate::error::SettingsError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution, all checks passed
    Success = 0,
    /// Validation found errors
    ValidationError = 1,
    /// Validation found warnings only
    ValidationWarning = 2,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Malformed document or schema violation
    SchemaError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Determine exit code from validation result
    pub fn from_validation_result(has_errors: bool, has_warnings: bool) -> Self {
        if has_errors {
            ExitCode::ValidationError
        } else if has_warnings {
            ExitCode::ValidationWarning
        } else {
            ExitCode::Success
        }
    }

    /// Exit code for a failed command
    pub fn from_error(error: &SettingsError) -> Self {
        match error {
            SettingsError::Io { .. } => ExitCode::FileError,
            SettingsError::Parse { .. } | SettingsError::Schema(_) => ExitCode::SchemaError,
            SettingsError::InvalidInput(_) => ExitCode::InvalidInput,
            SettingsError::Serialization(_) => ExitCode::InternalError,
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
///
/// With `--quiet` nothing is written to `out`; the exit code and any error
/// remain.
pub fn run(cli: SettingsCli, out: &mut dyn Write) -> Result<ExitCode, SettingsError> {
    let mut sink = std::io::sink();
    let out: &mut dyn Write = if cli.quiet { &mut sink } else { out };
    match cli.command {
        SettingsCommands::Validate {
            config,
            format,
            strict,
        } => commands::execute_validate(config, format, strict, out),
        SettingsCommands::Show {
            config,
            format,
            testing,
        } => commands::execute_show(config, format, testing, out),
        SettingsCommands::Paths {
            config,
            audio_dir,
            testing,
            create,
            format,
        } => commands::execute_paths(config, audio_dir, testing, create, format, out),
        SettingsCommands::AudioFiles { config, audio_dir } => {
            commands::execute_audio_files(config, audio_dir, out)
        }
    }
}
