//! Per-run device fingerprint.
//!
//! An opaque correlation token sent to the remote service: 32 lowercase hex
//! characters, generated fresh for every run and never derived from any
//! stable device identity.

use rand::Rng;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Generate a fresh 32-character lowercase hex token.
pub fn device_fingerprint() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_expected_shape() {
        let fp = device_fingerprint();
        assert_eq!(fp.len(), 32);
        assert!(fp.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn consecutive_calls_differ() {
        // 16^32 values; a collision here means the generator is broken
        assert_ne!(device_fingerprint(), device_fingerprint());
    }
}
