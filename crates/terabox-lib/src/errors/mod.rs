use std::path::PathBuf;
use thiserror::Error;

use crate::output::Formatter;

#[derive(Error, Debug)]
pub enum TeraboxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Keyfile already exists: {path}")]
    KeyfileExists { path: PathBuf },

    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("File {path} is already encrypted; staged copy at {staged}")]
    AlreadyEncrypted { path: PathBuf, staged: PathBuf },

    #[error("File is not encrypted: {path}")]
    NotEncrypted { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, TeraboxError>;

/// Maps a `TeraboxError` to classified console output.
///
/// Severity and subject follow the variant: encryption and decryption
/// failures are errors under their own subjects, while a staged
/// already-encrypted file is only a warning because the copy is usable
/// as-is.
pub fn report(formatter: &Formatter, err: &TeraboxError) {
    match err {
        TeraboxError::Config(msg) => formatter.error("settings", msg),
        TeraboxError::Io(e) => formatter.error("files", &e.to_string()),
        TeraboxError::Json(e) => formatter.error("settings", &e.to_string()),
        TeraboxError::FileNotFound { path } => {
            formatter.error("files", &format!("{} does not exist", path.display()));
        }
        TeraboxError::KeyfileExists { path } => {
            formatter.error(
                "keyfile",
                &format!("{} already exists, not overwriting", path.display()),
            );
        }
        TeraboxError::KeyGeneration(msg) => formatter.error("keyfile", msg),
        TeraboxError::Encryption(msg) => formatter.error("encryption", msg),
        TeraboxError::Decryption(msg) => formatter.error("decryption", msg),
        TeraboxError::AlreadyEncrypted { path, staged } => {
            formatter.warning(
                "encryption",
                &format!(
                    "{} is already encrypted, reusing {}",
                    path.display(),
                    staged.display()
                ),
            );
        }
        TeraboxError::NotEncrypted { path } => {
            formatter.error(
                "decryption",
                &format!("{} is not encrypted", path.display()),
            );
        }
    }
}
