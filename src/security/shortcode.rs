//! Opaque short code generation for tracking tokens.

pub const SHORT_CODE_LEN: usize = 8;

/// Generate an 8-char alphanumeric short code.
pub fn generate_short_code() -> String {
    use rand::Rng;

    const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let mut rng = rand::thread_rng();
    (0..SHORT_CODE_LEN)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}
