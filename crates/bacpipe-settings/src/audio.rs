//! Audio file discovery driven by `audio_suffixes`

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, SettingsError};
use crate::schema::EmbeddingSettings;

impl EmbeddingSettings {
    /// True if the file name ends with one of the configured suffixes.
    /// Matching is case-sensitive.
    pub fn is_audio_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.audio_suffixes
            .iter()
            .any(|suffix| !suffix.is_empty() && name.ends_with(suffix.as_str()))
    }
}

/// All audio files below `dir`, sorted by path string, each listed once
pub fn discover_audio_files(settings: &EmbeddingSettings, dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SettingsError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "audio directory not found"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            SettingsError::io(path, std::io::Error::other(e.to_string()))
        })?;
        if entry.file_type().is_file() && settings.is_audio_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    // whole-path string order, not per-component
    files.sort_by_cached_key(|f| f.to_string_lossy().into_owned());
    files.dedup();

    if files.is_empty() {
        return Err(SettingsError::invalid_input(format!(
            "no audio files found in '{}' (suffixes: {})",
            dir.display(),
            settings.audio_suffixes.join(", ")
        )));
    }

    tracing::debug!(dir = %dir.display(), count = files.len(), "discovered audio files");
    Ok(files)
}
