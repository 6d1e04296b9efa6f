use std::path::PathBuf;
use std::sync::Arc;

use filebox_core::storage::{StoreConfig, TreeStore};

pub mod cli;
pub mod commands;

/// Data directory used when neither `--data-dir` nor `FILEBOX_DATA_DIR` is given.
pub const DEFAULT_DATA_DIR: &str = ".filebox";

pub struct AppContext {
    pub store: Arc<TreeStore>,
}

impl AppContext {
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        AppContext {
            store: Arc::new(TreeStore::new(StoreConfig::in_dir(data_dir))),
        }
    }
}
