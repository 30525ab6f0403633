//! Per-dataset results directory layout
//!
//! Results for a dataset live under `main_results_dir/<dataset name>/`,
//! where the dataset name is the file stem of the audio directory, so
//! `/data/reef.2023` writes to `main_results_dir/reef/`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, SettingsError};
use crate::schema::PathSettings;

/// Resolved results directories for one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsLayout {
    /// `main_results_dir/<dataset name>`
    pub dataset_root: PathBuf,
    pub embed_dir: PathBuf,
    pub dim_reduc_dir: PathBuf,
    pub evaluations_dir: PathBuf,
}

impl ResultsLayout {
    pub fn resolve(paths: &PathSettings, dataset_dir: &Path) -> Result<Self> {
        let dataset = dataset_dir.file_stem().ok_or_else(|| {
            SettingsError::invalid_input(format!(
                "cannot derive a dataset name from '{}'",
                dataset_dir.display()
            ))
        })?;

        let dataset_root = paths.main_results_dir.join(dataset);
        Ok(Self {
            embed_dir: dataset_root.join(&paths.embed_parent_dir),
            dim_reduc_dir: dataset_root.join(&paths.dim_reduc_parent_dir),
            evaluations_dir: dataset_root.join(&paths.evaluations_dir),
            dataset_root,
        })
    }

    /// The three output directories
    pub fn dirs(&self) -> [&Path; 3] {
        [&self.embed_dir, &self.dim_reduc_dir, &self.evaluations_dir]
    }

    /// Create every output directory, parents included
    pub fn create_all(&self) -> Result<()> {
        for dir in self.dirs() {
            std::fs::create_dir_all(dir).map_err(|e| SettingsError::io(dir, e))?;
            tracing::debug!(dir = %dir.display(), "results directory ready");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tests::example;

    #[test]
    fn test_resolve_uses_dataset_name() {
        let config = example();
        let layout = config.layout("/data/recordings/reef_2023").unwrap();
        assert_eq!(layout.dataset_root, PathBuf::from("results/reef_2023"));
        assert_eq!(layout.embed_dir, PathBuf::from("results/reef_2023/embeddings"));
        assert_eq!(
            layout.dim_reduc_dir,
            PathBuf::from("results/reef_2023/dim_reduced_embeddings")
        );
        assert_eq!(layout.evaluations_dir, PathBuf::from("results/reef_2023/evaluations"));
    }

    #[test]
    fn test_trailing_separator_is_ignored() {
        let layout = example().layout("audio/birds/").unwrap();
        assert_eq!(layout.dataset_root, PathBuf::from("results/birds"));
    }

    #[test]
    fn test_dotted_directory_uses_stem() {
        let layout = example().layout("/data/reef.2023").unwrap();
        assert_eq!(layout.dataset_root, PathBuf::from("results/reef"));
        assert_eq!(layout.embed_dir, PathBuf::from("results/reef/embeddings"));
    }

    #[test]
    fn test_root_has_no_dataset_name() {
        let err = example().layout("/").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidInput(_)));
    }

    #[test]
    fn test_testing_root() {
        let layout = example().for_testing().layout("birds").unwrap();
        assert_eq!(
            layout.embed_dir,
            PathBuf::from("bacpipe/tests/results_files/birds/embeddings")
        );
    }

    #[test]
    fn test_create_all() {
        let tmp = tempfile::tempdir().unwrap();
        let config = example().with_results_root(tmp.path());
        let layout = config.layout("birds").unwrap();
        layout.create_all().unwrap();
        for dir in layout.dirs() {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }
        // idempotent
        layout.create_all().unwrap();
    }

    #[test]
    fn test_create_all_reports_failing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let config = example().with_results_root(&blocker);
        let err = config.layout("birds").unwrap().create_all().unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
        assert!(err.to_string().contains("blocker"));
    }
}
