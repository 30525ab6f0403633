//! bacpipe settings
//!
//! Typed, validating loader for the settings document that drives the
//! bacpipe audio-embedding generation and evaluation pipeline.
//!
//! ## Features
//!
//! - **Typed model**: device, checkpoints, batch size and audio suffixes for
//!   embedding; label handling for evaluation; classification, clustering
//!   and distance tasks as name-discriminated variants
//! - **Complete error reports**: every schema violation in a document is
//!   collected and reported with its field path
//! - **Cross-field validation**: parameters that do not belong to the
//!   selected algorithm and other inconsistencies, as non-fatal issues
//! - **Multiple formats**: YAML, JSON or TOML, picked by file extension
//! - **Results layout**: per-dataset output directories
//! - **Audio discovery**: case-sensitive suffix matching over a directory tree
//!
//! ## Architecture
//!
//! 1. **Document** (`document`): reads a source into an order-preserving tree.
//! 2. **Schema** (`schema`): turns the tree into a [`Config`].
//! 3. **Validation** (`validation`): cross-field checks on a [`Config`].
//! 4. **Layout** (`layout`) and **Audio** (`audio`): behaviour derived from
//!    the settings.
//! 5. **CLI** (`cli`): the `bacpipe-settings` command-line tool.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bacpipe_settings::{load_validated, Strictness};
//!
//! let (config, issues) = load_validated("settings.yaml", Strictness::Lenient).unwrap();
//! for issue in &issues {
//!     eprintln!("{}: {}", issue.path, issue.message);
//! }
//!
//! let layout = config.layout("/data/reef_2023").unwrap();
//! layout.create_all().unwrap();
//! for (name, task) in config.clust_configs.enabled() {
//!     println!("{name}: {}", task.algorithm);
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod document;
pub mod error;
pub mod layout;
pub mod schema;
pub mod validation;

pub use audio::discover_audio_files;
pub use document::Format;
pub use error::{Location, Result, SchemaErrors, SchemaViolation, SettingsError};
pub use layout::ResultsLayout;
pub use schema::{
    load, load_from, load_str, ClassConfig, Classifier, ClassifierKind, ClusterConfig, Clusterer,
    ClustererKind, Config, Device, DistanceConfig, DistanceMethod, DistanceMetric,
    EmbeddingSettings, EntryMap, EvaluationSettings, KnnClassifier, LinearClassifier, Named,
    PathSettings, Toggle, TESTING_RESULTS_DIR,
};
pub use validation::{
    escalate, load_validated, validate, Strictness, ValidationIssue, ValidationRule,
    ValidationSeverity, Validator,
};

pub use cli::{ExitCode, OutputFormat, SettingsCli, SettingsCommands};

/// Run the CLI, writing to stdout
///
/// ```rust,no_run
/// use clap::Parser;
/// use bacpipe_settings::{run_cli, SettingsCli};
///
/// let cli = SettingsCli::parse();
/// std::process::exit(run_cli(cli).into());
/// ```
pub fn run_cli(cli: SettingsCli) -> ExitCode {
    let mut stdout = std::io::stdout();
    match cli::run(cli, &mut stdout) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
