//! Typed settings model and loader
//!
//! The settings document is a flat top-level mapping; [`Config`] groups its
//! keys into sections and turns the `*_configs` mappings into ordered maps
//! of name-discriminated entries.
//!
//! Loading walks the whole document and collects every schema violation
//! before failing, so a single run reports all misconfigured fields.
//!
//! ```rust,no_run
//! use bacpipe_settings::{load, Device};
//!
//! let config = load("settings.yaml").unwrap();
//! assert_eq!(config.embedding.device, Device::Cpu);
//! for (name, entry) in config.class_configs.enabled() {
//!     println!("{name}: {}", entry.classifier);
//! }
//! ```

mod entries;
mod extract;
mod sections;

use std::io::Read;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::document::{self, Format};
use crate::error::{Result, SettingsError};
use crate::layout::ResultsLayout;
use extract::Extractor;

pub use entries::{
    ClassConfig, Classifier, ClassifierKind, ClusterConfig, Clusterer, ClustererKind,
    DistanceConfig, DistanceMethod, DistanceMetric, KnnClassifier, LinearClassifier,
};
pub use sections::{Device, EmbeddingSettings, EvaluationSettings, PathSettings};

/// Results root used when running the pipeline's own test suite
pub const TESTING_RESULTS_DIR: &str = "bacpipe/tests/results_files";

/// A closed set of names accepted by a discriminator field
pub trait Named: Sized + Copy {
    /// Accepted names, in display order
    const NAMES: &'static [&'static str];

    fn from_name(name: &str) -> Option<Self>;

    fn name(self) -> &'static str;
}

/// Entries carrying an `enabled` flag
pub trait Toggle {
    fn is_enabled(&self) -> bool;
}

/// User-named entries in document order
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> EntryMap<T> {
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Toggle> EntryMap<T> {
    /// Entries eligible for execution
    pub fn enabled(&self) -> impl Iterator<Item = (&str, &T)> {
        self.iter().filter(|(_, entry)| entry.is_enabled())
    }
}

impl<T> Default for EntryMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> FromIterator<(String, T)> for EntryMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The complete, validated-by-type settings
///
/// Built once at start-up and shared by reference; nothing mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub embedding: EmbeddingSettings,
    pub evaluation: EvaluationSettings,
    pub class_configs: EntryMap<ClassConfig>,
    pub clust_configs: EntryMap<ClusterConfig>,
    pub distance_configs: EntryMap<DistanceConfig>,
    pub paths: PathSettings,
    /// Top-level keys the schema does not know, in document order
    pub unrecognized: Mapping,
}

impl Config {
    const ENTRY_SECTIONS: &'static [&'static str] =
        &["class_configs", "clust_configs", "distance_configs"];

    /// Load a settings file; the extension selects the parser
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = document::read_document(path)?;
        let config = Self::from_document(&document)?;
        tracing::info!(
            path = %path.display(),
            classifiers = config.class_configs.len(),
            clusterers = config.clust_configs.len(),
            distances = config.distance_configs.len(),
            "settings loaded"
        );
        Ok(config)
    }

    /// Load from source text
    pub fn from_str_with(content: &str, format: Format) -> Result<Self> {
        Self::from_document(&document::parse_document(content, format)?)
    }

    /// Load from a stream
    pub fn from_reader<R: Read>(reader: R, format: Format) -> Result<Self> {
        Self::from_document(&document::read_from(reader, format)?)
    }

    /// Build the typed model from a parsed document
    pub fn from_document(document: &Value) -> Result<Self> {
        let root = match document {
            Value::Mapping(root) => root,
            Value::Null => return Err(SettingsError::parse_error("settings document is empty")),
            other => {
                return Err(SettingsError::parse_error(format!(
                    "settings document must be a mapping, found {}",
                    document::describe(other)
                )))
            }
        };

        let mut ex = Extractor::new();

        let embedding = EmbeddingSettings::extract(&mut ex, root);
        let evaluation = EvaluationSettings::extract(&mut ex, root);
        let class_configs = ex.named_entries(root, "", "class_configs", ClassConfig::extract);
        let clust_configs = ex.named_entries(root, "", "clust_configs", ClusterConfig::extract);
        let distance_configs =
            ex.named_entries(root, "", "distance_configs", DistanceConfig::extract);
        let paths = PathSettings::extract(&mut ex, root);

        let known: Vec<&str> = [
            EmbeddingSettings::KEYS,
            EvaluationSettings::KEYS,
            Self::ENTRY_SECTIONS,
            PathSettings::KEYS,
        ]
        .concat();

        let config = (|| {
            Some(Self {
                embedding: embedding?,
                evaluation: evaluation?,
                class_configs: class_configs?.into_iter().collect(),
                clust_configs: clust_configs?.into_iter().collect(),
                distance_configs: distance_configs?.into_iter().collect(),
                paths: paths?,
                unrecognized: extract::unrecognized(root, &known),
            })
        })();

        let config = ex.finish(config)?;
        tracing::debug!(
            device = %config.embedding.device,
            batch_size = config.embedding.global_batch_size,
            "settings document parsed"
        );
        Ok(config)
    }

    /// The flat document form; loading it yields an equal `Config`
    pub fn to_document(&self) -> Value {
        let mut root = Mapping::new();
        self.embedding.write(&mut root);
        self.evaluation.write(&mut root);
        root.insert(
            "class_configs".into(),
            entries_value(&self.class_configs, ClassConfig::to_value),
        );
        root.insert(
            "clust_configs".into(),
            entries_value(&self.clust_configs, ClusterConfig::to_value),
        );
        root.insert(
            "distance_configs".into(),
            entries_value(&self.distance_configs, DistanceConfig::to_value),
        );
        self.paths.write(&mut root);
        for (key, value) in &self.unrecognized {
            root.insert(key.clone(), value.clone());
        }
        Value::Mapping(root)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(&self.to_document())
            .map_err(|e| SettingsError::Serialization(e.to_string()))
    }

    /// JSON form of [`Config::to_document`]
    ///
    /// JSON object keys are strings, so a non-string key in
    /// [`Config::unrecognized`] (YAML `1: x`) comes back as `"1"` and the
    /// reloaded config differs. Validation reports such keys under V002.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_document())
            .map_err(|e| SettingsError::Serialization(e.to_string()))
    }

    /// Copy with `main_results_dir` replaced
    pub fn with_results_root(&self, root: impl Into<PathBuf>) -> Self {
        let mut config = self.clone();
        config.paths.main_results_dir = root.into();
        config
    }

    /// Copy whose results go to [`TESTING_RESULTS_DIR`]
    pub fn for_testing(&self) -> Self {
        self.with_results_root(TESTING_RESULTS_DIR)
    }

    /// Results directories for one dataset
    pub fn layout(&self, dataset_dir: impl AsRef<Path>) -> Result<ResultsLayout> {
        ResultsLayout::resolve(&self.paths, dataset_dir.as_ref())
    }
}

impl std::str::FromStr for Config {
    type Err = SettingsError;

    /// Parse YAML source text
    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_with(s, Format::Yaml)
    }
}

fn entries_value<T>(entries: &EntryMap<T>, to_value: fn(&T) -> Value) -> Value {
    Value::Mapping(
        entries
            .iter()
            .map(|(name, entry)| (Value::String(name.to_string()), to_value(entry)))
            .collect(),
    )
}

/// Load a settings file
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    Config::load(path)
}

/// Load settings from source text of the given format
pub fn load_str(content: &str, format: Format) -> Result<Config> {
    Config::from_str_with(content, format)
}

/// Load settings from a stream of the given format
pub fn load_from<R: Read>(reader: R, format: Format) -> Result<Config> {
    Config::from_reader(reader, format)
}
