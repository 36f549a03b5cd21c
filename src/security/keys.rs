//! Service key pair management
//!
//! The RSA key pair is process-wide immutable state: loaded once at
//! startup, never rotated without a restart. If the PEM files are
//! missing, a fresh 2048-bit pair is generated and persisted before the
//! process accepts any traffic.

use std::path::Path;

use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::info;

use crate::errors::{Result, TrackgateError};

const KEY_BITS: usize = 2048;

pub struct ServiceKeys {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    kid: String,
}

impl ServiceKeys {
    /// Generate and persist a key pair if either PEM file is missing.
    pub fn ensure_key_pair(private_path: &str, public_path: &str) -> Result<()> {
        if Path::new(private_path).exists() && Path::new(public_path).exists() {
            return Ok(());
        }

        if let Some(dir) = Path::new(private_path).parent() {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(dir) = Path::new(public_path).parent() {
            std::fs::create_dir_all(dir)?;
        }

        info!("Generating new RSA-{} service key pair", KEY_BITS);
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| TrackgateError::crypto(format!("key generation failed: {e}")))?;

        let private_pem = private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| TrackgateError::crypto(format!("private key encoding failed: {e}")))?;
        std::fs::write(private_path, private_pem.as_bytes())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(private_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let public_pem = RsaPublicKey::from(&private)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TrackgateError::crypto(format!("public key encoding failed: {e}")))?;
        std::fs::write(public_path, public_pem.as_bytes())?;

        Ok(())
    }

    /// Load the pair from PEM files (PKCS#1 private, SPKI public).
    pub fn load(private_path: &str, public_path: &str, kid: &str) -> Result<Self> {
        let private_pem = std::fs::read_to_string(private_path)?;
        let private = RsaPrivateKey::from_pkcs1_pem(&private_pem)
            .map_err(|e| TrackgateError::crypto(format!("invalid private key PEM: {e}")))?;

        let public_pem = std::fs::read_to_string(public_path)?;
        let public = RsaPublicKey::from_public_key_pem(&public_pem)
            .map_err(|e| TrackgateError::crypto(format!("invalid public key PEM: {e}")))?;

        Ok(Self {
            private,
            public,
            kid: kid.to_string(),
        })
    }

    /// Build a key pair in memory, without touching the filesystem.
    /// Intended for tests that need distinct keys per case.
    pub fn generate_ephemeral(kid: &str) -> Result<Self> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| TrackgateError::crypto(format!("key generation failed: {e}")))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self {
            private,
            public,
            kid: kid.to_string(),
        })
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// SPKI PEM of the public key, as handed to clients.
    pub fn public_key_pem(&self) -> Result<String> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TrackgateError::crypto(format!("public key encoding failed: {e}")))
    }
}
