//! Session pseudonymisation and the injectable clock.
//!
//! The hash is a black box from the statistics core's point of view: a
//! one-way keyed function from a caller-supplied session identifier to an
//! opaque token. Records group by token without the original identifier
//! ever being stored.

use chrono::{DateTime, Utc};

/// One-way keyed mapping from session identifiers to opaque tokens.
pub trait SessionHasher: Send + Sync {
    fn pseudonymise(&self, session_id: &str) -> String;
}

/// Production hasher: BLAKE3 keyed mode.
///
/// The 32-byte key is derived from configured key material, so rotating
/// the material rotates every token. Same identifier + same material
/// always yields the same token, which is what lets one browsing session
/// group across calculations.
pub struct KeyedSessionHasher {
    key: [u8; 32],
}

const KEY_CONTEXT: &str = "nic-savings-stats 2024-06-01 session token key";

impl KeyedSessionHasher {
    pub fn new(key_material: &str) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, key_material.as_bytes()),
        }
    }
}

impl SessionHasher for KeyedSessionHasher {
    fn pseudonymise(&self, session_id: &str) -> String {
        blake3::keyed_hash(&self.key, session_id.as_bytes())
            .to_hex()
            .to_string()
    }
}

/// Injectable wall-clock source. Production uses `SystemClock`; tests pin
/// the instant to make record timestamps deterministic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
