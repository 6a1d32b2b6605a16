//! Payload decryption for TIDAL streams.
//!
//! # Encryption Scheme
//!
//! Encrypted streams come with a base64 *security token*:
//! - The first 16 bytes are an IV, the rest is encrypted with AES-256-CBC
//!   under a fixed master key
//! - The unwrapped token holds a 16-byte AES key followed by an 8-byte nonce
//! - The audio itself is AES-128-CTR with the nonce as the high half of the
//!   counter block
//!
//! Decryption runs in place on the downloaded file.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::error::CryptoError;

/// Master key used to wrap per-track security tokens.
const MASTER_KEY: &str = "UIlTTEMmmLfGowo/UC60x2H45W6MdGgTRfo/umg4754=";

/// AES block size.
const AES_BLOCK_SIZE: usize = 16;

/// Bytes processed per read/write when decrypting a file.
const CHUNK_SIZE: usize = 64 * 1024;

/// An in-place decryption step for a downloaded payload.
pub trait Decrypt: Send + Sync {
    /// Decrypt the file at `path`, overwriting it with plaintext.
    fn decrypt(&self, path: &Path) -> Result<(), CryptoError>;
}

/// Key material recovered from a security token.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamKey {
    pub key: [u8; 16],
    pub nonce: [u8; 8],
}

impl fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamKey").finish_non_exhaustive()
    }
}

/// Decrypt AES-256-CBC without padding removal.
fn decrypt_aes_cbc(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    use aes::Aes256;
    use cipher::generic_array::GenericArray;
    use cipher::{BlockDecrypt, KeyInit};

    if data.is_empty() || data.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidToken(format!(
            "wrapped key length {} is not a positive multiple of {}",
            data.len(),
            AES_BLOCK_SIZE
        )));
    }

    let cipher = Aes256::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidToken("master key must be 32 bytes".to_string()))?;

    let mut result = data.to_vec();
    let mut prev_block = iv.to_vec();

    for chunk in result.chunks_exact_mut(AES_BLOCK_SIZE) {
        // Save ciphertext for next CBC iteration
        let ciphertext = chunk.to_vec();

        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));

        for (byte, prev) in chunk.iter_mut().zip(prev_block.iter()) {
            *byte ^= prev;
        }

        prev_block = ciphertext;
    }

    Ok(result)
}

/// Unwrap a base64 security token into the stream key and nonce.
pub fn unwrap_security_token(token: &str) -> Result<StreamKey, CryptoError> {
    let master_key = STANDARD
        .decode(MASTER_KEY)
        .map_err(|e| CryptoError::InvalidToken(format!("master key: {}", e)))?;
    let token = STANDARD
        .decode(token.trim())
        .map_err(|e| CryptoError::InvalidToken(e.to_string()))?;

    // IV plus at least 24 bytes of key material, block aligned
    if token.len() < AES_BLOCK_SIZE * 3 {
        return Err(CryptoError::InvalidToken(format!(
            "token too short: {} bytes",
            token.len()
        )));
    }

    let (iv, wrapped) = token.split_at(AES_BLOCK_SIZE);
    let unwrapped = decrypt_aes_cbc(wrapped, &master_key, iv)?;

    let mut key = [0u8; 16];
    let mut nonce = [0u8; 8];
    key.copy_from_slice(&unwrapped[..16]);
    nonce.copy_from_slice(&unwrapped[16..24]);

    Ok(StreamKey { key, nonce })
}

/// Apply the AES-128-CTR keystream to a file in place.
pub fn decrypt_file_in_place(path: &Path, stream_key: &StreamKey) -> Result<(), CryptoError> {
    use aes::Aes128;
    use ctr::cipher::{KeyIvInit, StreamCipher};
    use ctr::Ctr128BE;

    let mut counter = [0u8; AES_BLOCK_SIZE];
    counter[..8].copy_from_slice(&stream_key.nonce);

    let mut cipher = Ctr128BE::<Aes128>::new_from_slices(&stream_key.key, &counter)
        .map_err(|e| CryptoError::InvalidToken(format!("Failed to create AES cipher: {}", e)))?;

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut position = 0u64;

    loop {
        file.seek(SeekFrom::Start(position))?;
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        cipher.apply_keystream(&mut buffer[..bytes_read]);

        file.seek(SeekFrom::Start(position))?;
        file.write_all(&buffer[..bytes_read])?;
        position += bytes_read as u64;
    }

    file.flush()?;
    debug!("Decrypted {} bytes in {:?}", position, path);
    Ok(())
}

/// Decrypts a TIDAL payload given the security token from its stream URL.
///
/// The token is only unwrapped when [`Decrypt::decrypt`] runs, so a bad
/// token surfaces as a decryption failure of that track.
#[derive(Clone)]
pub struct TidalDecryptor {
    security_token: String,
}

impl TidalDecryptor {
    pub fn new<S: Into<String>>(security_token: S) -> Self {
        Self {
            security_token: security_token.into(),
        }
    }
}

impl fmt::Debug for TidalDecryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TidalDecryptor").finish_non_exhaustive()
    }
}

impl Decrypt for TidalDecryptor {
    fn decrypt(&self, path: &Path) -> Result<(), CryptoError> {
        let stream_key = unwrap_security_token(&self.security_token)?;
        decrypt_file_in_place(path, &stream_key)
    }
}
