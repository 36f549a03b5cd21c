//! Cryptographic material and transforms for the admission pipeline.

pub mod envelope;
pub mod keys;
pub mod shortcode;

pub use envelope::{DecryptFailed, SealedEnvelope, decrypt_envelope, encrypt_envelope};
pub use keys::ServiceKeys;
pub use shortcode::generate_short_code;
