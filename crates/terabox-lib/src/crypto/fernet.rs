//! Fernet scheme: whole-file tokens built from raw keyfile secrets.
//!
//! The keyfile bytes are URL-safe base64 encoded before they are handed
//! to the `fernet` crate, so any 32-byte secret works as key material.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use fernet::Fernet;

use crate::errors::{Result, TeraboxError};

/// Encrypt a whole plaintext into one Fernet token.
pub(super) fn encrypt(raw_key: &[u8], plaintext: &[u8]) -> Result<String> {
    let fernet = Fernet::new(&URL_SAFE.encode(raw_key)).ok_or_else(|| {
        TeraboxError::Encryption("keyfile is not valid Fernet key material".into())
    })?;
    Ok(fernet.encrypt(plaintext))
}

/// Decrypt a Fernet token body back into the plaintext.
pub(super) fn decrypt(raw_key: &[u8], body: &[u8]) -> Result<Vec<u8>> {
    let fernet = Fernet::new(&URL_SAFE.encode(raw_key)).ok_or_else(|| {
        TeraboxError::Decryption("keyfile is not valid Fernet key material".into())
    })?;
    let token = std::str::from_utf8(body)
        .map_err(|_| TeraboxError::Decryption("invalid key or file".into()))?;
    fernet
        .decrypt(token)
        .map_err(|_| TeraboxError::Decryption("invalid key or file".into()))
}
