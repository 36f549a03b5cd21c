//! Hybrid envelope encryption
//!
//! Clients encrypt submissions with a fresh 256-bit AES key, wrap the
//! key with the service's RSA public key (OAEP, SHA-256) and seal the
//! payload with AES-256-GCM. The server side unwraps and opens.
//!
//! Decryption failures are deliberately indistinguishable: bad padding,
//! wrong key, tag mismatch and corrupted ciphertext all collapse into
//! one opaque [`DecryptFailed`], so the error channel cannot be used as
//! a padding oracle.

use std::fmt;

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::errors::{Result, TrackgateError};

/// AES-256 key length in bytes
const DATA_KEY_LEN: usize = 32;
/// AES-GCM standard nonce length in bytes
const NONCE_LEN: usize = 12;

/// Opaque decryption failure. Carries no detail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptFailed;

impl fmt::Display for DecryptFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decrypt_failed")
    }
}

impl std::error::Error for DecryptFailed {}

/// The three transport-encoded parts of a sealed submission.
#[derive(Debug, Clone)]
pub struct SealedEnvelope {
    /// RSA-OAEP wrapped AES key
    pub ek: Vec<u8>,
    /// AES-GCM nonce
    pub nonce: Vec<u8>,
    /// Ciphertext with appended GCM tag
    pub ct: Vec<u8>,
}

/// Unwrap the data key and open the ciphertext.
///
/// Pure function of its inputs and the long-lived private key; no side
/// effects, safe to run concurrently across requests.
pub fn decrypt_envelope(
    private_key: &RsaPrivateKey,
    ek: &[u8],
    nonce: &[u8],
    ct: &[u8],
) -> std::result::Result<Vec<u8>, DecryptFailed> {
    let data_key = private_key
        .decrypt(Oaep::new::<Sha256>(), ek)
        .map_err(|_| DecryptFailed)?;

    if data_key.len() != DATA_KEY_LEN || nonce.len() != NONCE_LEN {
        return Err(DecryptFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(&data_key).map_err(|_| DecryptFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ct)
        .map_err(|_| DecryptFailed)
}

/// Seal a payload the way the browser SDK does: fresh AES-256 key,
/// fresh 96-bit nonce, key wrapped with RSA-OAEP/SHA-256.
pub fn encrypt_envelope(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<SealedEnvelope> {
    use aes_gcm::aead::rand_core::RngCore;

    let mut data_key = [0u8; DATA_KEY_LEN];
    OsRng.fill_bytes(&mut data_key);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ek = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &data_key)
        .map_err(|e| TrackgateError::crypto(format!("key wrap failed: {e}")))?;

    let cipher = Aes256Gcm::new_from_slice(&data_key)
        .map_err(|e| TrackgateError::crypto(format!("cipher init failed: {e}")))?;
    let ct = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| TrackgateError::crypto(format!("seal failed: {e}")))?;

    Ok(SealedEnvelope {
        ek,
        nonce: nonce.to_vec(),
        ct,
    })
}
