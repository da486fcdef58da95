//! JSON settings shared by the uploader binaries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TeraboxError};

/// User settings, stored as pretty-printed JSON with camelCase keys.
///
/// [`Settings::load_or_default`] falls back to defaults with a logged
/// warning instead of failing, so a corrupt settings file never blocks
/// an upload run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Prefix every console line with the current local time.
    pub timestamps: bool,
    /// Encrypt files before staging them for upload.
    #[serde(rename = "encryptFiles")]
    pub encrypt_files: bool,
    /// Keyfile consulted for encryption and decryption.
    #[serde(rename = "keyFile")]
    pub key_file: PathBuf,
    /// Staging directory for encrypted and decrypted copies.
    #[serde(rename = "tempDir")]
    pub temp_dir: PathBuf,
    /// Streaming chunk size for encryption, in bytes.
    #[serde(rename = "chunkSize")]
    pub chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timestamps: false,
            encrypt_files: false,
            key_file: PathBuf::from("keyfile.key"),
            temp_dir: PathBuf::from(crate::crypto::DEFAULT_TEMP_DIR),
            chunk_size: crate::crypto::DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Settings {
    /// Default location: `~/.terabox-uploader/settings.json`.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"));
        home.join(".terabox-uploader").join("settings.json")
    }

    /// Read settings from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            TeraboxError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Read settings from `path`, falling back to defaults when the file
    /// is missing, unreadable, or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    "Failed to load settings from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Write settings to `path` as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TeraboxError::Config(format!("Failed to create settings dir: {e}"))
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| TeraboxError::Config(format!("Failed to write settings file: {e}")))?;

        Ok(())
    }
}
