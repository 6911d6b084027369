//! Random short/manage code generation

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use std::sync::Mutex;

/// Characters a generated code may contain
pub const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of both the short code and the manage code
pub const CODE_LENGTH: usize = 6;

/// Generates codes from a random source it owns.
///
/// Uniqueness is not checked here; the storage layer rejects collisions.
pub struct CodeGenerator {
    rng: Mutex<StdRng>,
}

impl CodeGenerator {
    /// Create a generator seeded once from the thread-local OS-backed RNG
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_rng(&mut rand::rng())),
        }
    }

    /// Create a deterministic generator (tests, reproducible tooling)
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw `length` characters independently and uniformly from [`ALPHABET`]
    pub fn generate(&self, length: usize) -> String {
        // A panic while holding the lock cannot leave the RNG in a bad state
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        (0..length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }

    /// Draw a fresh `(short_code, manage_code)` pair
    pub fn codes(&self) -> (String, String) {
        (self.generate(CODE_LENGTH), self.generate(CODE_LENGTH))
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}
