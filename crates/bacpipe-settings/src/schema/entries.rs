//! Name-discriminated task entries: classification, clustering, distance
//!
//! The `name` key of an entry selects a variant, and each variant carries
//! only its own parameters. Keys that are not legal for the selected
//! variant are kept aside in `unrecognized` and never reach a consumer.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use super::extract::{child, unrecognized, Extractor};
use super::sections::path_value;
use super::{Named, Toggle};

const ENTRY_KEYS: &[&str] = &["enabled", "name"];

// -- classification ---------------------------------------------------------

/// Classifier names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierKind {
    Linear,
    Knn,
}

impl Named for ClassifierKind {
    const NAMES: &'static [&'static str] = &["linear", "knn"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(ClassifierKind::Linear),
            "knn" => Some(ClassifierKind::Knn),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ClassifierKind::Linear => "linear",
            ClassifierKind::Knn => "knn",
        }
    }
}

impl ClassifierKind {
    /// Parameter keys legal for this classifier
    pub fn parameters(self) -> &'static [&'static str] {
        match self {
            ClassifierKind::Linear => &[
                "learning_rate",
                "batch_size",
                "num_epochs",
                "dataset_csv_path",
                "shuffle",
            ],
            ClassifierKind::Knn => &["n_neighbors", "dataset_csv_path"],
        }
    }
}

/// Linear probe trained on the embeddings
#[derive(Debug, Clone, PartialEq)]
pub struct LinearClassifier {
    pub learning_rate: f64,
    pub batch_size: u64,
    pub num_epochs: u64,
    pub dataset_csv_path: PathBuf,
    pub shuffle: bool,
}

/// k-nearest-neighbours classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnnClassifier {
    pub n_neighbors: u64,
    pub dataset_csv_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classifier {
    Linear(LinearClassifier),
    Knn(KnnClassifier),
}

impl Classifier {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::Linear(_) => ClassifierKind::Linear,
            Classifier::Knn(_) => ClassifierKind::Knn,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn dataset_csv_path(&self) -> &Path {
        match self {
            Classifier::Linear(linear) => &linear.dataset_csv_path,
            Classifier::Knn(knn) => &knn.dataset_csv_path,
        }
    }

    fn extract(ex: &mut Extractor, kind: ClassifierKind, map: &Mapping, path: &str) -> Option<Self> {
        ex.for_variant(kind.name(), |ex| match kind {
            ClassifierKind::Linear => {
                let learning_rate = ex.number(map, path, "learning_rate");
                let batch_size = ex.count(map, path, "batch_size");
                let num_epochs = ex.count(map, path, "num_epochs");
                let dataset_csv_path = ex.string(map, path, "dataset_csv_path");
                let shuffle = ex.boolean(map, path, "shuffle");
                Some(Classifier::Linear(LinearClassifier {
                    learning_rate: learning_rate?,
                    batch_size: batch_size?,
                    num_epochs: num_epochs?,
                    dataset_csv_path: dataset_csv_path?.into(),
                    shuffle: shuffle?,
                }))
            }
            ClassifierKind::Knn => {
                let n_neighbors = ex.count(map, path, "n_neighbors");
                let dataset_csv_path = ex.string(map, path, "dataset_csv_path");
                Some(Classifier::Knn(KnnClassifier {
                    n_neighbors: n_neighbors?,
                    dataset_csv_path: dataset_csv_path?.into(),
                }))
            }
        })
    }

    fn write(&self, map: &mut Mapping) {
        match self {
            Classifier::Linear(linear) => {
                map.insert("learning_rate".into(), linear.learning_rate.into());
                map.insert("batch_size".into(), linear.batch_size.into());
                map.insert("num_epochs".into(), linear.num_epochs.into());
                map.insert("dataset_csv_path".into(), path_value(&linear.dataset_csv_path));
                map.insert("shuffle".into(), linear.shuffle.into());
            }
            Classifier::Knn(knn) => {
                map.insert("n_neighbors".into(), knn.n_neighbors.into());
                map.insert("dataset_csv_path".into(), path_value(&knn.dataset_csv_path));
            }
        }
    }
}

/// One entry of `class_configs`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassConfig {
    pub enabled: bool,
    pub classifier: Classifier,
    /// Keys not legal for the classifier, with their values
    pub unrecognized: Mapping,
}

impl ClassConfig {
    pub(crate) fn extract(ex: &mut Extractor, value: &Value, path: &str) -> Option<Self> {
        let map = ex.as_mapping(value, path)?;
        let enabled = ex.boolean(map, path, "enabled");
        let kind = ex.variant::<ClassifierKind>(map, path, "name")?;
        let classifier = Classifier::extract(ex, kind, map, path);

        Some(Self {
            enabled: enabled?,
            classifier: classifier?,
            unrecognized: unrecognized(map, &[ENTRY_KEYS, kind.parameters()].concat()),
        })
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert("enabled".into(), self.enabled.into());
        map.insert("name".into(), self.classifier.name().into());
        self.classifier.write(&mut map);
        extend(&mut map, &self.unrecognized);
        Value::Mapping(map)
    }
}

impl Toggle for ClassConfig {
    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// -- clustering -------------------------------------------------------------

/// Clustering algorithm names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClustererKind {
    KMeans,
    Hdbscan,
}

impl Named for ClustererKind {
    const NAMES: &'static [&'static str] = &["kmeans", "hdbscan"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "kmeans" => Some(ClustererKind::KMeans),
            "hdbscan" => Some(ClustererKind::Hdbscan),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ClustererKind::KMeans => "kmeans",
            ClustererKind::Hdbscan => "hdbscan",
        }
    }
}

impl ClustererKind {
    /// Keys legal inside `params` for this algorithm
    pub fn parameters(self) -> &'static [&'static str] {
        match self {
            ClustererKind::KMeans => &["n_clusters"],
            ClustererKind::Hdbscan => &["min_cluster_size", "min_samples", "metric"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clusterer {
    KMeans {
        n_clusters: u64,
    },
    Hdbscan {
        min_cluster_size: u64,
        min_samples: u64,
        metric: String,
    },
}

impl Clusterer {
    pub fn kind(&self) -> ClustererKind {
        match self {
            Clusterer::KMeans { .. } => ClustererKind::KMeans,
            Clusterer::Hdbscan { .. } => ClustererKind::Hdbscan,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn extract(ex: &mut Extractor, kind: ClustererKind, params: &Mapping, path: &str) -> Option<Self> {
        ex.for_variant(kind.name(), |ex| match kind {
            ClustererKind::KMeans => {
                let n_clusters = ex.count(params, path, "n_clusters");
                Some(Clusterer::KMeans {
                    n_clusters: n_clusters?,
                })
            }
            ClustererKind::Hdbscan => {
                let min_cluster_size = ex.count(params, path, "min_cluster_size");
                let min_samples = ex.count(params, path, "min_samples");
                let metric = ex.string(params, path, "metric");
                Some(Clusterer::Hdbscan {
                    min_cluster_size: min_cluster_size?,
                    min_samples: min_samples?,
                    metric: metric?,
                })
            }
        })
    }

    fn params(&self) -> Mapping {
        let mut params = Mapping::new();
        match self {
            Clusterer::KMeans { n_clusters } => {
                params.insert("n_clusters".into(), (*n_clusters).into());
            }
            Clusterer::Hdbscan {
                min_cluster_size,
                min_samples,
                metric,
            } => {
                params.insert("min_cluster_size".into(), (*min_cluster_size).into());
                params.insert("min_samples".into(), (*min_samples).into());
                params.insert("metric".into(), metric.as_str().into());
            }
        }
        params
    }
}

/// One entry of `clust_configs`; parameters live in a nested `params` mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    pub enabled: bool,
    pub algorithm: Clusterer,
    /// Entry-level keys other than `enabled`, `name` and `params`
    pub unrecognized: Mapping,
    /// Keys inside `params` not legal for the algorithm
    pub unrecognized_params: Mapping,
}

impl ClusterConfig {
    const KEYS: &'static [&'static str] = &["enabled", "name", "params"];

    pub(crate) fn extract(ex: &mut Extractor, value: &Value, path: &str) -> Option<Self> {
        let map = ex.as_mapping(value, path)?;
        let enabled = ex.boolean(map, path, "enabled");
        let kind = ex.variant::<ClustererKind>(map, path, "name");
        let params = ex.mapping(map, path, "params");

        let (kind, params) = (kind?, params?);
        let algorithm = Clusterer::extract(ex, kind, params, &child(path, "params"));

        Some(Self {
            enabled: enabled?,
            algorithm: algorithm?,
            unrecognized: unrecognized(map, Self::KEYS),
            unrecognized_params: unrecognized(params, kind.parameters()),
        })
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut params = self.algorithm.params();
        extend(&mut params, &self.unrecognized_params);

        let mut map = Mapping::new();
        map.insert("enabled".into(), self.enabled.into());
        map.insert("name".into(), self.algorithm.name().into());
        map.insert("params".into(), Value::Mapping(params));
        extend(&mut map, &self.unrecognized);
        Value::Mapping(map)
    }
}

impl Toggle for ClusterConfig {
    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// -- distance ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceMetric {
    Euclidean,
}

impl Named for DistanceMetric {
    const NAMES: &'static [&'static str] = &["euclidean"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "euclidean" => Some(DistanceMetric::Euclidean),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
        }
    }
}

/// How distances are aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistanceMethod {
    /// Intra-label against inter-label distances
    IntraVsInter,
}

impl Named for DistanceMethod {
    const NAMES: &'static [&'static str] = &["intra_vs_inter"];

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "intra_vs_inter" => Some(DistanceMethod::IntraVsInter),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            DistanceMethod::IntraVsInter => "intra_vs_inter",
        }
    }
}

/// One entry of `distance_configs`
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceConfig {
    pub enabled: bool,
    pub metric: DistanceMetric,
    pub method: DistanceMethod,
    pub unrecognized: Mapping,
}

impl DistanceConfig {
    const KEYS: &'static [&'static str] = &["enabled", "name", "method"];

    pub(crate) fn extract(ex: &mut Extractor, value: &Value, path: &str) -> Option<Self> {
        let map = ex.as_mapping(value, path)?;
        let enabled = ex.boolean(map, path, "enabled");
        let metric = ex.variant::<DistanceMetric>(map, path, "name");
        let method = ex.variant::<DistanceMethod>(map, path, "method");

        Some(Self {
            enabled: enabled?,
            metric: metric?,
            method: method?,
            unrecognized: unrecognized(map, Self::KEYS),
        })
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert("enabled".into(), self.enabled.into());
        map.insert("name".into(), self.metric.name().into());
        map.insert("method".into(), self.method.name().into());
        extend(&mut map, &self.unrecognized);
        Value::Mapping(map)
    }
}

impl Toggle for DistanceConfig {
    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classifier::Linear(l) => write!(
                f,
                "linear (lr={}, batch_size={}, epochs={}, shuffle={})",
                l.learning_rate, l.batch_size, l.num_epochs, l.shuffle
            ),
            Classifier::Knn(k) => write!(f, "knn (n_neighbors={})", k.n_neighbors),
        }
    }
}

impl fmt::Display for Clusterer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clusterer::KMeans { n_clusters } => write!(f, "kmeans (n_clusters={})", n_clusters),
            Clusterer::Hdbscan {
                min_cluster_size,
                min_samples,
                metric,
            } => write!(
                f,
                "hdbscan (min_cluster_size={}, min_samples={}, metric={})",
                min_cluster_size, min_samples, metric
            ),
        }
    }
}

fn extend(map: &mut Mapping, extra: &Mapping) {
    for (key, value) in extra {
        map.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract<T>(yaml: &str, f: fn(&mut Extractor, &Value, &str) -> Option<T>) -> crate::error::Result<T> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        let mut ex = Extractor::new();
        let parsed = f(&mut ex, &value, "entry");
        ex.finish(parsed)
    }

    #[test]
    fn test_linear_classifier() {
        let entry = extract(
            "enabled: true\nname: linear\nlearning_rate: 0.001\nbatch_size: 64\nnum_epochs: 30\ndataset_csv_path: a.csv\nshuffle: false",
            ClassConfig::extract,
        )
        .unwrap();
        assert!(entry.enabled);
        assert_eq!(entry.classifier.kind(), ClassifierKind::Linear);
        match &entry.classifier {
            Classifier::Linear(linear) => {
                assert_eq!(linear.learning_rate, 0.001);
                assert_eq!(linear.num_epochs, 30);
                assert!(!linear.shuffle);
            }
            other => panic!("unexpected classifier: {other:?}"),
        }
        assert!(entry.unrecognized.is_empty());
    }

    #[test]
    fn test_knn_with_linear_parameter_keeps_it_aside() {
        let entry = extract(
            "enabled: true\nname: knn\nn_neighbors: 5\ndataset_csv_path: a.csv\nlearning_rate: 0.1",
            ClassConfig::extract,
        )
        .unwrap();
        assert_eq!(entry.classifier.name(), "knn");
        assert_eq!(entry.unrecognized.len(), 1);
        assert!(entry.unrecognized.contains_key("learning_rate"));
    }

    #[test]
    fn test_knn_missing_n_neighbors_is_schema_error() {
        let err = extract(
            "enabled: true\nname: knn\nlearning_rate: 0.1\ndataset_csv_path: a.csv",
            ClassConfig::extract,
        )
        .unwrap_err();
        let violation = &err.violations()[0];
        assert_eq!(violation.path, "entry.n_neighbors");
        assert!(violation.message.contains("required by `knn`"));
    }

    #[test]
    fn test_unknown_classifier_name() {
        let err = extract("enabled: true\nname: svm", ClassConfig::extract).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].path, "entry.name");
        assert!(err.violations()[0].message.contains("[linear, knn]"));
    }

    #[test]
    fn test_cluster_params_are_nested() {
        let entry = extract(
            "enabled: false\nname: hdbscan\nparams:\n  min_cluster_size: 5\n  min_samples: 3\n  metric: cosine\n  n_clusters: 4",
            ClusterConfig::extract,
        )
        .unwrap();
        assert!(!entry.enabled);
        assert_eq!(
            entry.algorithm,
            Clusterer::Hdbscan {
                min_cluster_size: 5,
                min_samples: 3,
                metric: "cosine".to_string()
            }
        );
        assert!(entry.unrecognized_params.contains_key("n_clusters"));
    }

    #[test]
    fn test_cluster_missing_params() {
        let err = extract("enabled: true\nname: kmeans", ClusterConfig::extract).unwrap_err();
        assert_eq!(err.violations()[0].path, "entry.params");
    }

    #[test]
    fn test_cluster_negative_parameter_path() {
        let err = extract(
            "enabled: true\nname: kmeans\nparams:\n  n_clusters: -1",
            ClusterConfig::extract,
        )
        .unwrap_err();
        assert_eq!(err.violations()[0].path, "entry.params.n_clusters");
    }

    #[test]
    fn test_distance_entry_accumulates_errors() {
        let err = extract(
            "enabled: yes please\nname: manhattan\nmethod: pairwise",
            DistanceConfig::extract,
        )
        .unwrap_err();
        let paths: Vec<&str> = err.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["entry.enabled", "entry.name", "entry.method"]);
    }

    #[test]
    fn test_to_value_keeps_unrecognized() {
        let entry = extract(
            "enabled: true\nname: kmeans\nparams:\n  n_clusters: 18\n  seed: 3\nnote: keep",
            ClusterConfig::extract,
        )
        .unwrap();
        let value = entry.to_value();
        assert_eq!(value["params"]["seed"].as_u64(), Some(3));
        assert_eq!(value["note"].as_str(), Some("keep"));
        assert_eq!(value["params"]["n_clusters"].as_u64(), Some(18));
    }
}
