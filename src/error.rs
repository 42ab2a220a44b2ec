use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage file {0} could not be loaded, refusing to overwrite it")]
    ReadOnly(String),
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Invalid backup file format: {0}")]
    InvalidFormat(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("Photo file not found: {0}")]
    NotFound(String),
    #[error("Please select an image file (got {0})")]
    NotAnImage(String),
}
