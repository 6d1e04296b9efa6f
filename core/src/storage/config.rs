use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory (under the data dir) holding imported files and folder directories.
pub const FILES_DIR_NAME: &str = "app_files";

/// File name of the structure document (under the data dir).
pub const STRUCTURE_FILENAME: &str = "file_structure.json";

/// Display name given to the root folder on first initialization.
pub const DEFAULT_ROOT_NAME: &str = "내 파일";

/// Where a [`TreeStore`](super::TreeStore) keeps its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Physical storage root. Files land here as `<id>.<ext>`, folders as `<id>/`.
    pub files_dir: PathBuf,
    /// Path of the structure document.
    pub metadata_path: PathBuf,
    /// Name of the root folder written at first initialization.
    pub root_name: String,
}

impl StoreConfig {
    /// Default layout under a single data directory.
    pub fn in_dir(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        StoreConfig {
            files_dir: base.join(FILES_DIR_NAME),
            metadata_path: base.join(STRUCTURE_FILENAME),
            root_name: DEFAULT_ROOT_NAME.to_string(),
        }
    }

    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = StoreConfig::in_dir("/data");
        assert_eq!(config.files_dir, PathBuf::from("/data/app_files"));
        assert_eq!(config.metadata_path, PathBuf::from("/data/file_structure.json"));
        assert_eq!(config.root_name, DEFAULT_ROOT_NAME);

        let renamed = config.with_root_name("Home");
        assert_eq!(renamed.root_name, "Home");
    }
}
