use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::settings::types::PreviewSettings;

/// Settings persistence errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Persistent settings store backed by a JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<PreviewSettings>,
}

impl SettingsStore {
    /// Create a new store, loading from disk if the file exists.
    ///
    /// An unreadable or invalid file is logged and replaced by defaults.
    pub fn new(path: PathBuf) -> Self {
        let data = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings from {}: {e}", path.display());
            PreviewSettings::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    /// Load settings from a JSON file, returning default on missing file.
    pub fn load(path: &Path) -> Result<PreviewSettings> {
        if !path.exists() {
            return Ok(PreviewSettings::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save current settings to disk atomically (write .tmp then rename).
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().clone();
        let json = serde_json::to_string_pretty(&data)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings.
    pub fn get(&self) -> PreviewSettings {
        self.data.lock().clone()
    }

    /// Write the current settings out if no settings file exists yet, so
    /// the defaults in use can be edited.
    pub fn persist_if_missing(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::types::CaptureConfig;
    use tempfile::TempDir;

    /// Helper: create a store backed by a temp directory.
    fn temp_store() -> (SettingsStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depth-preview.json");
        let store = SettingsStore::new(path);
        (store, dir)
    }

    #[test]
    fn load_returns_default_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.json");
        let result = SettingsStore::load(&path).unwrap();
        assert_eq!(result, PreviewSettings::default());
    }

    #[test]
    fn load_parses_valid_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depth-preview.json");
        let json = r#"{"capture":{"depthFps":12.0,"depthFiltering":false},"dummyCamera":true}"#;
        std::fs::write(&path, json).unwrap();

        let result = SettingsStore::load(&path).unwrap();
        assert_eq!(result.capture.depth_fps, 12.0);
        assert!(!result.capture.depth_filtering);
        assert!(result.dummy_camera);
    }

    #[test]
    fn load_returns_parse_error_for_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depth-preview.json");
        std::fs::write(&path, "not valid json!!!").unwrap();

        let result = SettingsStore::load(&path);
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[test]
    fn new_falls_back_to_defaults_for_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depth-preview.json");
        std::fs::write(&path, "{").unwrap();

        let store = SettingsStore::new(path);
        assert_eq!(store.get(), PreviewSettings::default());
    }

    #[test]
    fn save_writes_valid_json() {
        let (store, dir) = temp_store();
        store.save().unwrap();

        let contents = std::fs::read_to_string(dir.path().join("depth-preview.json")).unwrap();
        let parsed: PreviewSettings = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, PreviewSettings::default());
    }

    #[test]
    fn persist_if_missing_writes_defaults_once() {
        let (store, dir) = temp_store();
        let path = dir.path().join("depth-preview.json");
        assert!(store.persist_if_missing().unwrap());
        assert_eq!(SettingsStore::load(&path).unwrap(), PreviewSettings::default());

        assert!(!store.persist_if_missing().unwrap());
    }

    #[test]
    fn persist_if_missing_leaves_existing_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depth-preview.json");
        std::fs::write(&path, r#"{"dummyCamera":true}"#).unwrap();

        let store = SettingsStore::new(path.clone());
        assert!(!store.persist_if_missing().unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"dummyCamera":true}"#
        );
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("depth-preview.json");
        let store = SettingsStore::new(path.clone());
        store.save().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn save_is_atomic() {
        let (store, dir) = temp_store();
        store.save().unwrap();

        // After a successful save, no .tmp file should remain
        let tmp_path = dir.path().join("depth-preview.json.tmp");
        assert!(
            !tmp_path.exists(),
            ".tmp file should be cleaned up after rename"
        );
    }

    #[test]
    fn new_loads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depth-preview.json");
        let file = PreviewSettings {
            capture: CaptureConfig {
                depth_width: 160,
                depth_height: 120,
                ..CaptureConfig::default()
            },
            dummy_camera: false,
        };
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let store = SettingsStore::new(path);
        assert_eq!(store.get(), file);
    }
}
