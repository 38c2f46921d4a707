//! Request fingerprints.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::ephemeris::{Body, ZodiacSystem};

/// Hex-encoded SHA-256 identifying a logically distinct request.
///
/// Body order and duplicates do not affect the fingerprint; the timestamp is
/// taken verbatim, so `...00Z` and `...00.000Z` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the cache fingerprint for a request.
///
/// The hashed text is `instant|zodiac|sorted,bodies|want_speed`.
pub fn derive_key(
    instant: &str,
    zodiac: ZodiacSystem,
    bodies: &[Body],
    want_speed: bool,
) -> Fingerprint {
    let mut names: Vec<&str> = bodies.iter().map(|b| b.as_str()).collect();
    names.sort_unstable();
    names.dedup();

    let input = format!("{instant}|{zodiac}|{}|{want_speed}", names.join(","));
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}
