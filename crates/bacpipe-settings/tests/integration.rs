//! Integration tests for the settings loader
//!
//! Exercises the public API against files on disk:
//! - Loading the shipped settings file
//! - Schema violations and cross-field issues
//! - YAML, JSON and TOML sources
//! - Strict and lenient loading
//! - Results layout and audio discovery

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use bacpipe_settings::{
    discover_audio_files, load, load_str, load_validated, ClassConfig, Classifier, ClusterConfig,
    Clusterer, Config, Device, DistanceConfig, DistanceMethod, DistanceMetric, EmbeddingSettings,
    EntryMap, EvaluationSettings, Format, KnnClassifier, LinearClassifier, PathSettings,
    SettingsError, Strictness, ValidationSeverity, TESTING_RESULTS_DIR,
};
use proptest::prelude::*;
use serde_yaml::{Mapping, Value};

fn shipped_settings() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("settings.yaml")
}

fn shipped_source() -> String {
    fs::read_to_string(shipped_settings()).unwrap()
}

fn write_settings(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_shipped_settings() {
    let config = load(shipped_settings()).unwrap();

    assert_eq!(config.embedding.device, Device::Cpu);
    assert_eq!(config.embedding.global_batch_size, 16);
    assert_eq!(
        config.embedding.model_base_path,
        PathBuf::from("bacpipe/model_checkpoints")
    );
    assert!(config.embedding.rm_embedding_on_keyboard_interrupt);
    assert_eq!(
        config.evaluation.default_label_keys,
        vec!["species", "call_type", "time_of_day"]
    );

    let classifiers: Vec<&str> = config.class_configs.enabled().map(|(n, _)| n).collect();
    assert_eq!(classifiers, vec!["config_1", "config_2"]);
    match &config.class_configs.get("config_2").unwrap().classifier {
        Classifier::Knn(knn) => assert_eq!(knn.n_neighbors, 15),
        other => panic!("unexpected classifier: {other:?}"),
    }

    let clusterers: Vec<&Clusterer> = config.clust_configs.enabled().map(|(_, e)| &e.algorithm).collect();
    assert_eq!(clusterers, vec![&Clusterer::KMeans { n_clusters: 18 }]);

    let distance = config.distance_configs.get("config_1").unwrap();
    assert_eq!(distance.method, DistanceMethod::IntraVsInter);
    assert_eq!(config.distance_configs.enabled().count(), 0);
}

#[test]
fn test_missing_file_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = load(tmp.path().join("absent.yaml")).unwrap_err();
    match err {
        SettingsError::Io { path, source } => {
            assert!(path.ends_with("absent.yaml"));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_malformed_yaml_is_parse_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), "settings.yaml", "device: [cpu\n");
    let err = load(path).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }));
    assert!(err.is_user_error());
}

#[test]
fn test_every_violation_is_reported_with_its_path() {
    let tmp = tempfile::tempdir().unwrap();
    let content = shipped_source()
        .replace("device: cpu", "device: tpu")
        .replace("global_batch_size: 16", "global_batch_size: -4")
        .replace("    n_neighbors: 15\n", "");
    let path = write_settings(tmp.path(), "settings.yaml", &content);

    let err = load(path).unwrap_err();
    let paths: Vec<&str> = err.violations().iter().map(|v| v.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "device",
            "global_batch_size",
            "class_configs.config_2.n_neighbors"
        ]
    );
    assert!(err.violations()[2].message.contains("`knn`"));
    assert!(err.to_string().contains("3 violation(s)"));
}

#[test]
fn test_learning_rate_on_knn_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let content = shipped_source().replace(
        "    n_neighbors: 15\n",
        "    n_neighbors: 15\n    learning_rate: 0.01\n",
    );
    let path = write_settings(tmp.path(), "settings.yaml", &content);

    let (config, issues) = load_validated(&path, Strictness::Lenient).unwrap();
    assert!(matches!(
        config.class_configs.get("config_2").unwrap().classifier,
        Classifier::Knn(_)
    ));
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].code, "V001");
    assert_eq!(issues[0].severity, ValidationSeverity::Error);
    assert_eq!(issues[0].path, "class_configs.config_2.learning_rate");

    let err = load_validated(&path, Strictness::Strict).unwrap_err();
    assert_eq!(
        err.violations()[0].path,
        "class_configs.config_2.learning_rate"
    );
}

#[test]
fn test_strict_load_of_clean_settings() {
    let (config, issues) = load_validated(shipped_settings(), Strictness::Strict).unwrap();
    assert!(issues.is_empty());
    assert_eq!(config, load(shipped_settings()).unwrap());
}

#[test]
fn test_json_settings_file() {
    let tmp = tempfile::tempdir().unwrap();
    let yaml = load(shipped_settings()).unwrap();
    let path = write_settings(tmp.path(), "settings.json", &yaml.to_json_string().unwrap());

    let json = load(path).unwrap();
    assert_eq!(json, yaml);
}

#[test]
fn test_toml_settings_file() {
    let content = r#"
device = "cuda"
model_base_path = "/models"
global_batch_size = 8
audio_suffixes = [".wav", ".flac"]
rm_embedding_on_keyboard_interrupt = false
min_label_occurances = 0
bool_filter_labels = false
default_label_keys = ["species"]
main_results_dir = "out"
embed_parent_dir = "emb"
dim_reduc_parent_dir = "dim"
evaluations_dir = "eval"

[class_configs.probe]
enabled = true
name = "linear"
learning_rate = 0.01
batch_size = 32
num_epochs = 5
dataset_csv_path = "labels.csv"
shuffle = false

[clust_configs.hdb]
enabled = true
name = "hdbscan"

[clust_configs.hdb.params]
min_cluster_size = 10
min_samples = 3
metric = "cosine"

[distance_configs]
"#;
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), "settings.toml", content);

    let config = load(path).unwrap();
    assert_eq!(config.embedding.device, Device::Cuda);
    assert_eq!(config.evaluation.min_label_occurances, 0);
    assert_eq!(
        config.clust_configs.get("hdb").unwrap().algorithm,
        Clusterer::Hdbscan {
            min_cluster_size: 10,
            min_samples: 3,
            metric: "cosine".to_string(),
        }
    );
    assert!(config.distance_configs.is_empty());
}

#[test]
fn test_unknown_extension_is_invalid_input() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_settings(tmp.path(), "settings.ini", "device = cpu");
    assert!(matches!(load(path), Err(SettingsError::InvalidInput(_))));
}

#[test]
fn test_results_layout_and_discovery() {
    let tmp = tempfile::tempdir().unwrap();
    let dataset = tmp.path().join("reef_2023");
    fs::create_dir_all(dataset.join("night")).unwrap();
    for name in ["b.wav", "a.WAV", "night/c.flac", "notes.txt", "d.Wav"] {
        fs::write(dataset.join(name), b"").unwrap();
    }

    let config = load(shipped_settings())
        .unwrap()
        .with_results_root(tmp.path().join("results"));
    let layout = config.layout(&dataset).unwrap();
    layout.create_all().unwrap();
    assert!(tmp.path().join("results/reef_2023/embeddings").is_dir());
    assert!(tmp.path().join("results/reef_2023/dim_reduced_embeddings").is_dir());
    assert!(tmp.path().join("results/reef_2023/evaluations").is_dir());

    let files = discover_audio_files(&config.embedding, &dataset).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|f| f.strip_prefix(&dataset).unwrap().display().to_string())
        .collect();
    assert_eq!(names, vec!["a.WAV", "b.wav", "night/c.flac"]);
}

#[test]
fn test_testing_results_root() {
    let config = load(shipped_settings()).unwrap().for_testing();
    let layout = config.layout("/data/birds").unwrap();
    assert_eq!(
        layout.embed_dir,
        Path::new(TESTING_RESULTS_DIR).join("birds").join("embeddings")
    );
}

fn with_list(source: &str, key: &str, items: &[String]) -> String {
    let mut out = String::new();
    let mut skipping = false;
    for line in source.lines() {
        if skipping {
            if line.starts_with("  - ") {
                continue;
            }
            skipping = false;
        }
        if line == format!("{}:", key) {
            if items.is_empty() {
                out.push_str(&format!("{}: []\n", key));
                skipping = true;
                continue;
            }
            out.push_str(line);
            out.push('\n');
            for item in items {
                out.push_str(&format!("  - \"{}\"\n", item));
            }
            skipping = true;
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

proptest! {
    #[test]
    fn prop_list_order_is_preserved(
        keys in prop::collection::vec("[a-z][a-z_]{0,11}", 0..6),
        suffixes in prop::collection::vec("\\.[a-zA-Z][a-zA-Z0-9]{0,4}", 1..6),
    ) {
        let source = with_list(&shipped_source(), "default_label_keys", &keys);
        let source = with_list(&source, "audio_suffixes", &suffixes);

        let config: Config = source.parse().unwrap();
        prop_assert_eq!(&config.evaluation.default_label_keys, &keys);
        prop_assert_eq!(&config.embedding.audio_suffixes, &suffixes);
    }

    #[test]
    fn prop_generated_config_round_trips(config in config_strategy()) {
        let yaml = config.to_yaml_string().unwrap();
        let reloaded: Config = yaml.parse().unwrap();
        prop_assert_eq!(&reloaded, &config);
        prop_assert_eq!(reloaded.to_yaml_string().unwrap(), yaml);

        let finite = config.class_configs.iter().all(|(_, entry)| match &entry.classifier {
            Classifier::Linear(linear) => linear.learning_rate.is_finite(),
            Classifier::Knn(_) => true,
        });
        if finite {
            let json = load_str(&config.to_json_string().unwrap(), Format::Json).unwrap();
            prop_assert_eq!(json, config);
        }
    }
}

// Strings that a YAML reader would take for another scalar type if unquoted
fn tricky_string() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "yes", "no", "on", "~", "null", "true", "False", "0x10", "0o17", "1e3", "-4", "3.5",
            ".inf", ".nan", "",
        ])
        .prop_map(String::from),
        "[a-z_][a-z0-9_./]{0,11}",
    ]
}

fn path_strategy() -> impl Strategy<Value = PathBuf> {
    tricky_string().prop_map(PathBuf::from)
}

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        tricky_string().prop_map(Value::String),
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
    ]
}

fn extra_keys(prefix: &'static str) -> impl Strategy<Value = Mapping> {
    prop::collection::vec(("[a-z]{1,6}", scalar_value()), 0..3).prop_map(move |pairs| {
        pairs
            .into_iter()
            .map(|(key, value)| (Value::String(format!("{}{}", prefix, key)), value))
            .collect()
    })
}

fn learning_rate() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0e6f64..1.0e6,
        Just(0.0),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

fn classifier() -> impl Strategy<Value = Classifier> {
    prop_oneof![
        (learning_rate(), any::<u64>(), any::<u64>(), path_strategy(), any::<bool>()).prop_map(
            |(learning_rate, batch_size, num_epochs, dataset_csv_path, shuffle)| {
                Classifier::Linear(LinearClassifier {
                    learning_rate,
                    batch_size,
                    num_epochs,
                    dataset_csv_path,
                    shuffle,
                })
            }
        ),
        (any::<u64>(), path_strategy()).prop_map(|(n_neighbors, dataset_csv_path)| {
            Classifier::Knn(KnnClassifier {
                n_neighbors,
                dataset_csv_path,
            })
        }),
    ]
}

fn clusterer() -> impl Strategy<Value = Clusterer> {
    prop_oneof![
        any::<u64>().prop_map(|n_clusters| Clusterer::KMeans { n_clusters }),
        (any::<u64>(), any::<u64>(), tricky_string()).prop_map(
            |(min_cluster_size, min_samples, metric)| Clusterer::Hdbscan {
                min_cluster_size,
                min_samples,
                metric,
            }
        ),
    ]
}

fn class_config() -> impl Strategy<Value = ClassConfig> {
    (any::<bool>(), classifier(), extra_keys("x_")).prop_map(|(enabled, classifier, unrecognized)| {
        ClassConfig {
            enabled,
            classifier,
            unrecognized,
        }
    })
}

fn cluster_config() -> impl Strategy<Value = ClusterConfig> {
    (any::<bool>(), clusterer(), extra_keys("x_"), extra_keys("x_")).prop_map(
        |(enabled, algorithm, unrecognized, unrecognized_params)| ClusterConfig {
            enabled,
            algorithm,
            unrecognized,
            unrecognized_params,
        },
    )
}

fn distance_config() -> impl Strategy<Value = DistanceConfig> {
    (any::<bool>(), extra_keys("x_")).prop_map(|(enabled, unrecognized)| DistanceConfig {
        enabled,
        metric: DistanceMetric::Euclidean,
        method: DistanceMethod::IntraVsInter,
        unrecognized,
    })
}

// User-named entries in generated order, names unique
fn entries<T: std::fmt::Debug>(
    entry: impl Strategy<Value = T>,
) -> impl Strategy<Value = EntryMap<T>> {
    prop::collection::vec((tricky_string(), entry), 0..4).prop_map(|entries| {
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect()
    })
}

fn config_strategy() -> impl Strategy<Value = Config> {
    let embedding = (
        prop_oneof![Just(Device::Cpu), Just(Device::Cuda)],
        path_strategy(),
        any::<u64>(),
        prop::collection::vec(tricky_string(), 0..5),
        any::<bool>(),
    )
        .prop_map(
            |(device, model_base_path, global_batch_size, audio_suffixes, rm)| EmbeddingSettings {
                device,
                model_base_path,
                global_batch_size,
                audio_suffixes,
                rm_embedding_on_keyboard_interrupt: rm,
            },
        );
    let evaluation = (
        any::<u64>(),
        any::<bool>(),
        prop::collection::vec(tricky_string(), 0..5),
    )
        .prop_map(
            |(min_label_occurances, bool_filter_labels, default_label_keys)| EvaluationSettings {
                min_label_occurances,
                bool_filter_labels,
                default_label_keys,
            },
        );
    let paths = (path_strategy(), path_strategy(), path_strategy(), path_strategy()).prop_map(
        |(main_results_dir, embed_parent_dir, dim_reduc_parent_dir, evaluations_dir)| PathSettings {
            main_results_dir,
            embed_parent_dir,
            dim_reduc_parent_dir,
            evaluations_dir,
        },
    );

    (
        embedding,
        evaluation,
        entries(class_config()),
        entries(cluster_config()),
        entries(distance_config()),
        paths,
        extra_keys("zz_"),
    )
        .prop_map(
            |(embedding, evaluation, class_configs, clust_configs, distance_configs, paths, unrecognized)| {
                Config {
                    embedding,
                    evaluation,
                    class_configs,
                    clust_configs,
                    distance_configs,
                    paths,
                    unrecognized,
                }
            },
        )
}
