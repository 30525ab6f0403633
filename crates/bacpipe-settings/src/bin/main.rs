//! bacpipe settings CLI
//!
//! # Usage
//!
//! ```bash
//! # Check a settings file
//! bacpipe-settings validate --config settings.yaml --strict
//!
//! # Print the normalized settings as JSON
//! bacpipe-settings show --config settings.yaml --format json
//!
//! # Resolve and create the results directories of a dataset
//! bacpipe-settings paths --audio-dir /data/reef_2023 --create
//!
//! # List the audio files of a dataset
//! bacpipe-settings audio-files --audio-dir /data/reef_2023
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Validation errors
//! - 2: Validation warnings only
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Malformed document or schema violation
//! - 10: Internal error

use bacpipe_settings::{run_cli, SettingsCli};
use clap::Parser;
use tracing::Level;

fn main() {
    let cli = SettingsCli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
