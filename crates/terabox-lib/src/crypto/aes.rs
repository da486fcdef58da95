//! AES-256-CBC with PKCS#7 padding, streamed in fixed-size chunks.
//!
//! The encrypted body is a random 16-byte IV followed by the ciphertext.
//! Only the final partial chunk is padded, so chunk boundaries never
//! split a block and both sides can stream with different chunk sizes.

use std::io::{Read, Write};

use aes::cipher::block_padding::{Padding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Block;
use ring::rand::{SecureRandom, SystemRandom};

use crate::errors::{Result, TeraboxError};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes. Chunk sizes must be positive multiples of
/// this; `Encryptor::with_chunk_size` enforces that.
pub(super) const BLOCK_SIZE: usize = 16;

/// Encrypt `reader` into `writer`: a random IV first, then the CBC
/// ciphertext with the final chunk padded.
pub(super) fn encrypt(
    key: &[u8],
    mut reader: impl Read,
    mut writer: impl Write,
    chunk_size: usize,
) -> Result<()> {
    let mut iv = [0u8; BLOCK_SIZE];
    SystemRandom::new()
        .fill(&mut iv)
        .map_err(|_| TeraboxError::Encryption("failed to gather IV entropy".into()))?;
    writer.write_all(&iv)?;

    let mut cipher = Aes256CbcEnc::new_from_slices(key, &iv)
        .map_err(|_| TeraboxError::Encryption("key is not a valid AES-256 key".into()))?;

    // One block of slack so the final chunk can take its padding in place.
    let mut buf = vec![0u8; chunk_size + BLOCK_SIZE];
    let mut filled = 0;
    loop {
        let n = reader.read(&mut buf[filled..chunk_size])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == chunk_size {
            for block in buf[..chunk_size].chunks_exact_mut(BLOCK_SIZE) {
                cipher.encrypt_block_mut(Block::from_mut_slice(block));
            }
            writer.write_all(&buf[..chunk_size])?;
            filled = 0;
        }
    }

    let ciphertext = cipher
        .encrypt_padded_mut::<Pkcs7>(&mut buf, filled)
        .map_err(|_| TeraboxError::Encryption("padding buffer too small".into()))?;
    writer.write_all(ciphertext)?;
    Ok(())
}

/// Decrypt `reader` (IV, then ciphertext) into `writer`. The newest block
/// is held back until end of input confirms it is the padded final one.
pub(super) fn decrypt(
    key: &[u8],
    mut reader: impl Read,
    mut writer: impl Write,
    chunk_size: usize,
) -> Result<()> {
    let mut iv = [0u8; BLOCK_SIZE];
    reader
        .read_exact(&mut iv)
        .map_err(|_| TeraboxError::Decryption("file is too short to hold an IV".into()))?;

    let mut cipher = Aes256CbcDec::new_from_slices(key, &iv)
        .map_err(|_| TeraboxError::Decryption("key is not a valid AES-256 key".into()))?;

    let mut buf = vec![0u8; chunk_size];
    let mut filled = 0;
    let mut held: Option<[u8; BLOCK_SIZE]> = None;
    loop {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == chunk_size {
            decrypt_chunk(&mut cipher, &mut buf[..chunk_size], &mut held, &mut writer)?;
            filled = 0;
        }
    }
    if filled > 0 {
        if filled % BLOCK_SIZE != 0 {
            return Err(TeraboxError::Decryption(
                "ciphertext length is not a multiple of the AES block size".into(),
            ));
        }
        decrypt_chunk(&mut cipher, &mut buf[..filled], &mut held, &mut writer)?;
    }

    let last = held.ok_or_else(|| TeraboxError::Decryption("ciphertext is empty".into()))?;
    let last_block = Block::from(last);
    let plaintext = Pkcs7::unpad(&last_block).map_err(|_| {
        TeraboxError::Decryption("invalid padding; wrong key or corrupt file".into())
    })?;
    writer.write_all(plaintext)?;
    Ok(())
}

/// Decrypt one chunk in place, emitting every block except the newest,
/// which replaces the held-back candidate for the padded final block.
fn decrypt_chunk(
    cipher: &mut Aes256CbcDec,
    chunk: &mut [u8],
    held: &mut Option<[u8; BLOCK_SIZE]>,
    mut writer: impl Write,
) -> Result<()> {
    for block in chunk.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block_mut(Block::from_mut_slice(block));
    }

    if let Some(previous) = held.take() {
        writer.write_all(&previous)?;
    }
    let split = chunk.len() - BLOCK_SIZE;
    writer.write_all(&chunk[..split])?;

    let mut last = [0u8; BLOCK_SIZE];
    last.copy_from_slice(&chunk[split..]);
    *held = Some(last);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const KEY: [u8; 32] = [42u8; 32];

    fn encrypt_vec(data: &[u8], chunk_size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        encrypt(&KEY, Cursor::new(data), &mut out, chunk_size).unwrap();
        out
    }

    fn decrypt_vec(body: &[u8], chunk_size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        decrypt(&KEY, Cursor::new(body), &mut out, chunk_size)?;
        Ok(out)
    }

    #[test]
    fn test_round_trip_shorter_than_one_block() {
        let body = encrypt_vec(b"hello", 64);
        assert_eq!(decrypt_vec(&body, 64).unwrap(), b"hello");
    }

    #[test]
    fn test_round_trip_chunk_aligned_input() {
        let data = vec![0x5au8; 64];
        let body = encrypt_vec(&data, 32);
        assert_eq!(decrypt_vec(&body, 32).unwrap(), data);
    }

    #[test]
    fn test_round_trip_with_partial_tail() {
        let data: Vec<u8> = (0..100u8).collect();
        let body = encrypt_vec(&data, 32);
        assert_eq!(decrypt_vec(&body, 32).unwrap(), data);
    }

    #[test]
    fn test_round_trip_empty_input() {
        let body = encrypt_vec(b"", 64);
        assert_eq!(body.len(), BLOCK_SIZE + BLOCK_SIZE);
        assert_eq!(decrypt_vec(&body, 64).unwrap(), b"");
    }

    #[test]
    fn test_chunk_sizes_interoperate() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let body = encrypt_vec(&data, 32);
        assert_eq!(decrypt_vec(&body, 160).unwrap(), data);
    }

    #[test]
    fn test_ciphertext_is_iv_plus_padded_blocks() {
        for n in [0usize, 5, 16, 17, 31, 32, 100] {
            let body = encrypt_vec(&vec![1u8; n], 64);
            let blocks = n / BLOCK_SIZE + 1;
            assert_eq!(body.len(), BLOCK_SIZE + blocks * BLOCK_SIZE);
        }
    }

    #[test]
    fn test_each_call_draws_a_fresh_iv() {
        let a = encrypt_vec(b"same input", 64);
        let b = encrypt_vec(b"same input", 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_decrypt_rejects_missing_iv() {
        let err = decrypt_vec(&[1, 2, 3], 64).unwrap_err();
        assert!(matches!(err, TeraboxError::Decryption(_)));
    }

    #[test]
    fn test_decrypt_rejects_unaligned_ciphertext() {
        let mut body = vec![0u8; BLOCK_SIZE];
        body.extend_from_slice(&[1, 2, 3, 4, 5]);
        let err = decrypt_vec(&body, 64).unwrap_err();
        assert!(matches!(err, TeraboxError::Decryption(_)));
    }

    #[test]
    fn test_decrypt_rejects_empty_ciphertext() {
        let body = vec![0u8; BLOCK_SIZE];
        let err = decrypt_vec(&body, 64).unwrap_err();
        assert!(matches!(err, TeraboxError::Decryption(_)));
    }

    #[test]
    fn test_decrypt_rejects_invalid_padding() {
        let iv = [9u8; BLOCK_SIZE];
        // An all-zero plaintext block can never be valid PKCS#7 padding.
        let mut block = Block::default();
        let mut enc = Aes256CbcEnc::new_from_slices(&KEY, &iv).unwrap();
        enc.encrypt_block_mut(&mut block);

        let mut body = iv.to_vec();
        body.extend_from_slice(block.as_slice());
        let err = decrypt_vec(&body, 64).unwrap_err();
        assert!(matches!(err, TeraboxError::Decryption(_)));
    }
}
