//! File encryption for upload staging.
//!
//! Key derivation is PBKDF2-HMAC-SHA256 via `ring`; AES-256-CBC comes from
//! the RustCrypto `aes` and `cbc` crates, Fernet tokens from the `fernet`
//! crate. A keyfile whose contents URL-safe-base64-decode to exactly 32
//! bytes selects AES, anything else is used as raw Fernet key material.

mod aes;
mod fernet;

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::distr::Alphanumeric;
use rand::Rng;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use crate::config::Settings;
use crate::errors::{Result, TeraboxError};
use crate::output::Formatter;

/// Header line marking an AES-encrypted file.
const MAGIC_AES: &[u8] = b"ENC-TERABOXUPLOADERCLI-AES";
/// Header line marking a Fernet-encrypted file. This is also a prefix of
/// [`MAGIC_AES`], so sniffing must test the AES header first.
const MAGIC_FERNET: &[u8] = b"ENC-TERABOXUPLOADERCLI";

/// PBKDF2 rounds for password-derived keys.
const PBKDF2_ITERATIONS: u32 = 100_000;
/// Bytes of random salt fed to the derivation.
const SALT_LEN: usize = 16;
/// Characters in a generated fallback password.
const PASSWORD_LEN: usize = 16;
/// Decoded key length that selects AES-256.
const AES_KEY_LEN: usize = 32;

/// Default derived key length, in bytes.
pub const DEFAULT_KEY_SIZE: usize = 32;
/// Default streaming chunk size, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
/// Default staging directory for encrypted and decrypted copies.
pub const DEFAULT_TEMP_DIR: &str = "./temp";

/// Scheme implied by a keyfile's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Aes,
    Fernet,
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyType::Aes => write!(f, "AES"),
            KeyType::Fernet => write!(f, "Fernet"),
        }
    }
}

/// Key bytes ready for one of the two schemes.
enum KeyMaterial {
    Aes(Vec<u8>),
    Fernet(Vec<u8>),
}

impl KeyMaterial {
    fn kind(&self) -> KeyType {
        match self {
            KeyMaterial::Aes(_) => KeyType::Aes,
            KeyMaterial::Fernet(_) => KeyType::Fernet,
        }
    }
}

/// Derive a new key from a password and write it URL-safe base64 encoded
/// to `keyfile`. Refuses to overwrite an existing keyfile.
///
/// Without a password a random 16-character alphanumeric one is generated
/// and echoed as a console warning so the user can note it down. The salt
/// is not persisted: the keyfile itself is the secret, the password only
/// seeds the derivation.
pub fn generate_key(keyfile: &Path, password: Option<&str>, key_size: usize) -> Result<()> {
    if keyfile.exists() {
        return Err(TeraboxError::KeyfileExists {
            path: keyfile.to_path_buf(),
        });
    }

    let password = match password {
        Some(p) => p.to_string(),
        None => {
            let mut rng = rand::rng();
            let generated: String = (0..PASSWORD_LEN)
                .map(|_| rng.sample(Alphanumeric) as char)
                .collect();
            Formatter::default().warning(
                "encryption",
                &format!("No password provided. Generating random password: {generated}"),
            );
            generated
        }
    };

    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| TeraboxError::KeyGeneration("failed to gather salt entropy".into()))?;

    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).expect("iteration count is non-zero");
    let mut key = vec![0u8; key_size];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut key,
    );

    fs::write(keyfile, URL_SAFE.encode(&key))
        .map_err(|e| TeraboxError::KeyGeneration(format!("failed to write keyfile: {e}")))?;

    Ok(())
}

/// Classify the key held in `keyfile`.
pub fn key_type(keyfile: &Path) -> Result<KeyType> {
    Ok(load_key(keyfile)?.kind())
}

fn load_key(keyfile: &Path) -> Result<KeyMaterial> {
    let raw = read_keyfile(keyfile)?;
    match URL_SAFE.decode(&raw) {
        Ok(decoded) if decoded.len() == AES_KEY_LEN => Ok(KeyMaterial::Aes(decoded)),
        _ => Ok(KeyMaterial::Fernet(raw)),
    }
}

fn read_keyfile(keyfile: &Path) -> Result<Vec<u8>> {
    if !keyfile.exists() {
        return Err(TeraboxError::FileNotFound {
            path: keyfile.to_path_buf(),
        });
    }
    Ok(fs::read(keyfile)?)
}

/// File encryption and decryption around a staging directory.
///
/// Outputs land in `temp_dir`, created on demand: `<name>.enc` when
/// encrypting, `<name>.dec` (with the `.enc` suffix removed) when
/// decrypting. AES files are processed in `chunk_size` pieces so large
/// uploads never sit fully in memory.
#[derive(Debug, Clone)]
pub struct Encryptor {
    temp_dir: PathBuf,
    chunk_size: usize,
}

impl Default for Encryptor {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_DIR)
    }
}

impl Encryptor {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Build an encryptor from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.temp_dir).with_chunk_size(settings.chunk_size)
    }

    /// Override the streaming chunk size. The value is rounded down to a
    /// multiple of the AES block size, with one block as the floor.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = (chunk_size - chunk_size % aes::BLOCK_SIZE).max(aes::BLOCK_SIZE);
        self
    }

    /// Encrypt `filepath` with the key in `keypath`, staging the result
    /// as `temp_dir/<basename>.enc`.
    ///
    /// Inputs that are already encrypted (an `.enc` extension or a
    /// recognized magic header) are copied verbatim into the staging
    /// directory and reported as [`TeraboxError::AlreadyEncrypted`];
    /// callers may upload the staged copy as-is.
    pub fn encrypt_file(&self, keypath: &Path, filepath: &Path) -> Result<PathBuf> {
        ensure_exists(keypath)?;
        ensure_exists(filepath)?;

        if has_enc_extension(filepath) || sniff_scheme(filepath)?.is_some() {
            let staged = self.stage_copy(filepath)?;
            return Err(TeraboxError::AlreadyEncrypted {
                path: filepath.to_path_buf(),
                staged,
            });
        }

        let key = load_key(keypath)?;
        tracing::debug!(scheme = %key.kind(), "encrypting {}", filepath.display());

        self.ensure_temp_dir()?;
        let destination = self.encrypted_path(filepath);
        match key {
            KeyMaterial::Aes(key) => self.encrypt_aes(&key, filepath, &destination)?,
            KeyMaterial::Fernet(key) => self.encrypt_fernet(&key, filepath, &destination)?,
        }
        Ok(destination)
    }

    /// Decrypt `filepath` with the key in `keypath`, staging the result
    /// as `temp_dir/<basename minus .enc>.dec`.
    ///
    /// The input must carry the `.enc` extension and one of the magic
    /// headers. The scheme follows the keyfile, matching what
    /// [`Encryptor::encrypt_file`] produced for it.
    pub fn decrypt_file(&self, keypath: &Path, filepath: &Path) -> Result<PathBuf> {
        ensure_exists(keypath)?;
        ensure_exists(filepath)?;

        if !has_enc_extension(filepath) || sniff_scheme(filepath)?.is_none() {
            return Err(TeraboxError::NotEncrypted {
                path: filepath.to_path_buf(),
            });
        }

        let key = load_key(keypath)?;
        tracing::debug!(scheme = %key.kind(), "decrypting {}", filepath.display());

        self.ensure_temp_dir()?;
        let destination = self.decrypted_path(filepath);
        match key {
            KeyMaterial::Aes(key) => self.decrypt_aes(&key, filepath, &destination)?,
            KeyMaterial::Fernet(key) => self.decrypt_fernet(&key, filepath, &destination)?,
        }
        Ok(destination)
    }

    fn encrypt_aes(&self, key: &[u8], filepath: &Path, destination: &Path) -> Result<()> {
        let reader = BufReader::new(File::open(filepath)?);
        let mut writer = BufWriter::new(File::create(destination)?);
        writer.write_all(MAGIC_AES)?;
        writer.write_all(b"\n")?;
        aes::encrypt(key, reader, &mut writer, self.chunk_size)?;
        writer.flush()?;
        Ok(())
    }

    fn decrypt_aes(&self, key: &[u8], filepath: &Path, destination: &Path) -> Result<()> {
        let mut reader = BufReader::new(File::open(filepath)?);
        skip_header_line(&mut reader)?;
        let mut writer = BufWriter::new(File::create(destination)?);
        aes::decrypt(key, &mut reader, &mut writer, self.chunk_size)?;
        writer.flush()?;
        Ok(())
    }

    fn encrypt_fernet(&self, key: &[u8], filepath: &Path, destination: &Path) -> Result<()> {
        let plaintext = fs::read(filepath)?;
        let token = fernet::encrypt(key, &plaintext)?;
        let mut writer = BufWriter::new(File::create(destination)?);
        writer.write_all(MAGIC_FERNET)?;
        writer.write_all(b"\n")?;
        writer.write_all(token.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn decrypt_fernet(&self, key: &[u8], filepath: &Path, destination: &Path) -> Result<()> {
        let contents = fs::read(filepath)?;
        let body = match contents.iter().position(|&b| b == b'\n') {
            Some(i) => &contents[i + 1..],
            None => &[][..],
        };
        let plaintext = fernet::decrypt(key, body)?;
        fs::write(destination, plaintext)?;
        Ok(())
    }

    /// Copy an already-encrypted input into the staging directory
    /// unchanged. Inputs that already end in `.enc` keep their name
    /// instead of gaining a second suffix, and an input that already
    /// lives in the staging directory is returned as-is.
    fn stage_copy(&self, filepath: &Path) -> Result<PathBuf> {
        self.ensure_temp_dir()?;
        let staged = if has_enc_extension(filepath) {
            self.temp_dir.join(filepath.file_name().unwrap_or_default())
        } else {
            self.encrypted_path(filepath)
        };
        // Copying a file onto itself truncates it.
        if staged.exists() && staged.canonicalize()? == filepath.canonicalize()? {
            return Ok(staged);
        }
        fs::copy(filepath, &staged)?;
        Ok(staged)
    }

    /// `temp_dir/<basename>.enc` for an encryption output.
    fn encrypted_path(&self, filepath: &Path) -> PathBuf {
        let mut name = filepath.file_name().unwrap_or_default().to_os_string();
        name.push(".enc");
        self.temp_dir.join(name)
    }

    /// `temp_dir/<basename minus .enc>.dec` for a decryption output.
    fn decrypted_path(&self, filepath: &Path) -> PathBuf {
        let name = Path::new(filepath.file_name().unwrap_or_default());
        self.temp_dir.join(name.with_extension("dec"))
    }

    fn ensure_temp_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.temp_dir)?;
        Ok(())
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(TeraboxError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

fn has_enc_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "enc")
}

/// Identify the scheme of an existing file by its magic header, if any.
fn sniff_scheme(path: &Path) -> Result<Option<KeyType>> {
    let mut file = File::open(path)?;
    let mut prefix = [0u8; 32];
    let mut len = 0;
    loop {
        let n = file.read(&mut prefix[len..])?;
        if n == 0 {
            break;
        }
        len += n;
        if len == prefix.len() {
            break;
        }
    }

    let prefix = &prefix[..len];
    if prefix.starts_with(MAGIC_AES) {
        Ok(Some(KeyType::Aes))
    } else if prefix.starts_with(MAGIC_FERNET) {
        Ok(Some(KeyType::Fernet))
    } else {
        Ok(None)
    }
}

/// Advance past the magic header line, including its trailing newline.
fn skip_header_line<R: BufRead>(reader: &mut R) -> Result<()> {
    let mut header = Vec::new();
    reader.read_until(b'\n', &mut header)?;
    Ok(())
}
