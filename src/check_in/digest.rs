//! Digest computation for check-in occurrences using BLAKE3

use crate::check_in::event::{CheckInKind, CheckInType};
use blake3::Hasher;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Deduplication key for a check-in occurrence
///
/// Two events with the same digest describe the same occurrence; only the most
/// recently scheduled one is delivered.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Token distinguishing separate occurrences of the same check-in identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurrence(u64);

impl Occurrence {
    /// Draw a token no other occurrence in this process has used.
    ///
    /// Seeded from the process start time so tokens from different processes
    /// reporting the same identifier do not collide.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        static SEED: OnceLock<u64> = OnceLock::new();
        let seed = *SEED.get_or_init(|| {
            let now = chrono::Utc::now();
            ((now.timestamp() as u64) << 20)
                ^ u64::from(now.timestamp_subsec_nanos())
                ^ (u64::from(std::process::id()) << 40)
        });
        Occurrence(seed.wrapping_add(COUNTER.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn from_u64(value: u64) -> Self {
        Occurrence(value)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Compute the digest of a check-in occurrence
///
/// Digest = hash("check-in" || type || id_len || id || kind || occurrence)
///
/// Same inputs always produce the same digest; the kind is part of the hash so
/// the start and finish events of one cron occurrence are never coalesced.
pub fn compute_digest(
    check_in_type: CheckInType,
    identifier: &str,
    kind: Option<CheckInKind>,
    occurrence: Occurrence,
) -> Digest {
    let mut hasher = Hasher::new();

    hasher.update(b"check-in");
    hasher.update(check_in_type.as_str().as_bytes());

    // Length prefix keeps "ab"+"c" and "a"+"bc" apart
    hasher.update(&(identifier.len() as u64).to_be_bytes());
    hasher.update(identifier.as_bytes());

    match kind {
        Some(kind) => hasher.update(kind.as_str().as_bytes()),
        None => hasher.update(b"-"),
    };

    hasher.update(&occurrence.as_u64().to_be_bytes());

    Digest(*hasher.finalize().as_bytes())
}
