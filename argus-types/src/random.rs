//! Random identifier generation that can never take the host down.
//!
//! The operating system RNG is the primary source. If it fails (which
//! can happen in exotic sandboxes or very early in process startup), we
//! fall back to a time-seeded PRNG instead of panicking. The fallback
//! identifiers are of lower quality but identifiers only need to be
//! unique enough for correlation, not secret.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, SmallRng};
use rand::{RngCore, SeedableRng};
use uuid::Uuid;

fn fallback_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ ((std::process::id() as u64) << 32)
}

/// Fills an array with random bytes.
///
/// Uses the OS RNG and falls back to a time-seeded PRNG when that
/// fails. This function does not panic.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    if OsRng.try_fill_bytes(&mut bytes).is_err() {
        SmallRng::seed_from_u64(fallback_seed()).fill_bytes(&mut bytes);
    }
    bytes
}

/// Generates a random v4 UUID, used for event identifiers.
pub fn random_uuid() -> Uuid {
    let mut bytes: [u8; 16] = random_bytes();
    // set the uuid version and variant bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_uuid_is_v4() {
        let uuid = random_uuid();
        assert_eq!(uuid.get_version_num(), 4);
        assert!(!uuid.is_nil());
    }

    #[test]
    fn test_random_bytes_change() {
        let a: [u8; 16] = random_bytes();
        let b: [u8; 16] = random_bytes();
        assert_ne!(a, b);
    }
}
