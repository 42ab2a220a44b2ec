use std::path::{Path, PathBuf};

const APP_DIR: &str = "planti";
const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_path: PathBuf,
}

impl Config {
    pub fn new<P: AsRef<Path>>(storage_path: P) -> Self {
        Self {
            storage_path: storage_path.as_ref().to_path_buf(),
        }
    }

    /// Uses `path` when given, else the per-user data directory.
    pub fn resolve(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::new(path),
            None => Self::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        match dirs::data_dir() {
            Some(dir) => Self::new(dir.join(APP_DIR).join(STORAGE_FILE)),
            None => Self::new(format!("{APP_DIR}-{STORAGE_FILE}")),
        }
    }
}
