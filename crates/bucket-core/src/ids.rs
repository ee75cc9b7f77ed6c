//! Short, URL-safe, practically-unique bucket ids.
//!
//! Ids are 12 symbols over a fixed 64-symbol alphabet: one worker symbol,
//! three symbols of a coarse time counter, three of a per-process sequence,
//! and five random. In-process uniqueness is exact while the sequence has
//! not wrapped; across processes it is statistical — no collision check is
//! made against the archive, by design, given the alphabet size and call
//! volume.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::GenerationError;

/// Fixed URL-safe alphabet, 64 symbols.
const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Generator epoch: 2020-01-01T00:00:00Z. Ids encode minutes since then.
const EPOCH_SECS: u64 = 1_577_836_800;

/// Length of every generated id.
pub const ID_LEN: usize = 12;

/// Produces short bucket ids.
///
/// Seeded once at process start from the current time plus the worker
/// index; share one instance per process behind an `Arc`.
pub struct IdGenerator {
    worker: u8,
    seq: AtomicU64,
    rng: Mutex<StdRng>,
}

impl IdGenerator {
    /// Create a generator for `worker` (folded into the alphabet range).
    ///
    /// Fails if the wall clock reads before the Unix epoch.
    pub fn new(worker: u8) -> Result<Self, GenerationError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| GenerationError::ClockSkew)?;
        let seed = now.as_nanos() as u64 ^ (u64::from(worker) << 56);

        Ok(Self {
            worker: worker & 0x3f,
            seq: AtomicU64::new(0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    /// Produce a fresh id, or fail — the caller decides whether to retry.
    pub fn next(&self) -> Result<String, GenerationError> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| GenerationError::ClockSkew)?
            .as_secs();
        let minutes = secs
            .checked_sub(EPOCH_SECS)
            .ok_or(GenerationError::ClockSkew)?
            / 60;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut rng = self.rng.lock().map_err(|_| GenerationError::Poisoned)?;

        let mut id = String::with_capacity(ID_LEN);
        id.push(symbol(self.worker));
        for shift in [12, 6, 0] {
            id.push(symbol((minutes >> shift) as u8));
        }
        for shift in [12, 6, 0] {
            id.push(symbol((seq >> shift) as u8));
        }
        for _ in 0..5 {
            let idx = rng.gen_range(0..ALPHABET.len());
            id.push(ALPHABET[idx] as char);
        }

        Ok(id)
    }
}

fn symbol(v: u8) -> char {
    ALPHABET[(v & 0x3f) as usize] as char
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_have_fixed_length_and_alphabet() {
        let generator = IdGenerator::new(0).unwrap();
        let id = generator.next().unwrap();

        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn sequential_ids_are_unique() {
        let generator = IdGenerator::new(3).unwrap();
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let id = generator.next().unwrap();
            assert!(seen.insert(id), "duplicate id generated");
        }
    }

    #[test]
    fn workers_stamp_their_symbol() {
        for worker in [0u8, 1, 42, 63] {
            let generator = IdGenerator::new(worker).unwrap();
            let id = generator.next().unwrap();
            assert_eq!(id.chars().next().unwrap(), symbol(worker));
        }
    }

    #[test]
    fn worker_index_folds_into_alphabet() {
        // 64 and 0 share a symbol; the id stays within the alphabet.
        let generator = IdGenerator::new(64).unwrap();
        let id = generator.next().unwrap();
        assert_eq!(id.chars().next().unwrap(), symbol(0));
    }

    #[test]
    fn generators_with_different_seeds_diverge() {
        let a = IdGenerator::new(1).unwrap();
        let b = IdGenerator::new(2).unwrap();

        // Same sequence numbers, different worker and seed: the ids differ.
        assert_ne!(a.next().unwrap(), b.next().unwrap());
    }
}
