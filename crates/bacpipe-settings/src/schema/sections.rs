//! Flat settings sections: embedding, evaluation and results paths

use std::fmt;
use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use super::extract::Extractor;
use super::Named;

/// Where the models run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Named for Device {
    const NAMES: &'static [&'static str] = &["cpu", "cuda"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "cpu" => Some(Device::Cpu),
            "cuda" => Some(Device::Cuda),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings read by the embedding generation pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSettings {
    pub device: Device,
    /// Root directory of the model checkpoints
    pub model_base_path: PathBuf,
    pub global_batch_size: u64,
    /// File endings treated as audio, matched case-sensitively; `.mp3` and
    /// `.MP3` are distinct entries and both are kept
    pub audio_suffixes: Vec<String>,
    pub rm_embedding_on_keyboard_interrupt: bool,
}

impl EmbeddingSettings {
    pub(crate) const KEYS: &'static [&'static str] = &[
        "device",
        "model_base_path",
        "global_batch_size",
        "audio_suffixes",
        "rm_embedding_on_keyboard_interrupt",
    ];

    pub(crate) fn extract(ex: &mut Extractor, root: &Mapping) -> Option<Self> {
        let device = ex.variant::<Device>(root, "", "device");
        let model_base_path = ex.string(root, "", "model_base_path");
        let global_batch_size = ex.count(root, "", "global_batch_size");
        let audio_suffixes = ex.string_list(root, "", "audio_suffixes");
        let rm_embedding_on_keyboard_interrupt =
            ex.boolean(root, "", "rm_embedding_on_keyboard_interrupt");

        Some(Self {
            device: device?,
            model_base_path: model_base_path?.into(),
            global_batch_size: global_batch_size?,
            audio_suffixes: audio_suffixes?,
            rm_embedding_on_keyboard_interrupt: rm_embedding_on_keyboard_interrupt?,
        })
    }

    pub(crate) fn write(&self, root: &mut Mapping) {
        root.insert("device".into(), self.device.name().into());
        root.insert("model_base_path".into(), path_value(&self.model_base_path));
        root.insert("global_batch_size".into(), self.global_batch_size.into());
        root.insert("audio_suffixes".into(), string_list_value(&self.audio_suffixes));
        root.insert(
            "rm_embedding_on_keyboard_interrupt".into(),
            self.rm_embedding_on_keyboard_interrupt.into(),
        );
    }
}

/// Settings read by the evaluation pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    /// Labels seen fewer times are dropped; zero means no minimum
    pub min_label_occurances: u64,
    pub bool_filter_labels: bool,
    /// Label columns in display order
    pub default_label_keys: Vec<String>,
}

impl EvaluationSettings {
    pub(crate) const KEYS: &'static [&'static str] =
        &["min_label_occurances", "bool_filter_labels", "default_label_keys"];

    pub(crate) fn extract(ex: &mut Extractor, root: &Mapping) -> Option<Self> {
        let min_label_occurances = ex.count(root, "", "min_label_occurances");
        let bool_filter_labels = ex.boolean(root, "", "bool_filter_labels");
        let default_label_keys = ex.string_list(root, "", "default_label_keys");

        Some(Self {
            min_label_occurances: min_label_occurances?,
            bool_filter_labels: bool_filter_labels?,
            default_label_keys: default_label_keys?,
        })
    }

    pub(crate) fn write(&self, root: &mut Mapping) {
        root.insert("min_label_occurances".into(), self.min_label_occurances.into());
        root.insert("bool_filter_labels".into(), self.bool_filter_labels.into());
        root.insert(
            "default_label_keys".into(),
            string_list_value(&self.default_label_keys),
        );
    }
}

/// Directory names of the results tree
///
/// `main_results_dir` is the root; the other three are joined below a
/// per-dataset folder, see [`crate::layout::ResultsLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    pub main_results_dir: PathBuf,
    pub embed_parent_dir: PathBuf,
    pub dim_reduc_parent_dir: PathBuf,
    pub evaluations_dir: PathBuf,
}

impl PathSettings {
    pub(crate) const KEYS: &'static [&'static str] = &[
        "main_results_dir",
        "embed_parent_dir",
        "dim_reduc_parent_dir",
        "evaluations_dir",
    ];

    pub(crate) fn extract(ex: &mut Extractor, root: &Mapping) -> Option<Self> {
        let main_results_dir = ex.string(root, "", "main_results_dir");
        let embed_parent_dir = ex.string(root, "", "embed_parent_dir");
        let dim_reduc_parent_dir = ex.string(root, "", "dim_reduc_parent_dir");
        let evaluations_dir = ex.string(root, "", "evaluations_dir");

        Some(Self {
            main_results_dir: main_results_dir?.into(),
            embed_parent_dir: embed_parent_dir?.into(),
            dim_reduc_parent_dir: dim_reduc_parent_dir?.into(),
            evaluations_dir: evaluations_dir?.into(),
        })
    }

    pub(crate) fn write(&self, root: &mut Mapping) {
        root.insert("main_results_dir".into(), path_value(&self.main_results_dir));
        root.insert("embed_parent_dir".into(), path_value(&self.embed_parent_dir));
        root.insert(
            "dim_reduc_parent_dir".into(),
            path_value(&self.dim_reduc_parent_dir),
        );
        root.insert("evaluations_dir".into(), path_value(&self.evaluations_dir));
    }

    /// Named directory fields, in document order
    pub fn entries(&self) -> [(&'static str, &PathBuf); 4] {
        [
            ("main_results_dir", &self.main_results_dir),
            ("embed_parent_dir", &self.embed_parent_dir),
            ("dim_reduc_parent_dir", &self.dim_reduc_parent_dir),
            ("evaluations_dir", &self.evaluations_dir),
        ]
    }
}

pub(crate) fn path_value(path: &std::path::Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

pub(crate) fn string_list_value(items: &[String]) -> Value {
    Value::Sequence(items.iter().map(|s| Value::String(s.clone())).collect())
}
