//! Chaotic key store wrapper for fault injection testing
//!
//! Store wrapper that randomly fails operations to test error handling. Used
//! for chaos testing to ensure storage failures surface as errors and never
//! corrupt or silently replace an established session key.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use hushwire_crypto::SessionKey;

use super::{SessionKeyStore, StorageError};
use crate::PeerId;

/// Chaotic key store wrapper that randomly injects failures
///
/// Delegates to an underlying store but randomly fails operations based on a
/// configured failure rate. Injected failures happen before the inner store
/// is touched, so a failed `put_if_absent` never writes. Uses Arc<Mutex<>> for
/// the RNG state, making it Clone and thread-safe.
#[derive(Clone)]
pub struct ChaoticKeyStore<S: SessionKeyStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
}

/// Simple deterministic RNG for chaos injection
///
/// Uses linear congruential generator (LCG) for fast, deterministic randomness.
/// This ensures chaos tests are reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }

    /// Check if we should fail (returns true with probability = `failure_rate`)
    fn should_fail(&mut self, failure_rate: f64) -> bool {
        self.next() < failure_rate
    }
}

impl<S: SessionKeyStore> ChaoticKeyStore<S> {
    /// Create a new chaotic wrapper with the default seed
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self { inner, failure_rate, rng: Arc::new(Mutex::new(ChaoticRng::new(seed))) }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Check if this operation should fail
    fn should_fail(&self) -> bool {
        #[allow(clippy::expect_used)]
        self.rng.lock().expect("ChaoticRng mutex poisoned").should_fail(self.failure_rate)
    }

    fn inject(&self) -> Result<(), StorageError> {
        if self.should_fail() {
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: SessionKeyStore> SessionKeyStore for ChaoticKeyStore<S> {
    fn get(&self, peer_id: PeerId) -> Result<Option<SessionKey>, StorageError> {
        self.inject()?;
        self.inner.get(peer_id)
    }

    fn put_if_absent(&self, peer_id: PeerId, key: &SessionKey) -> Result<bool, StorageError> {
        self.inject()?;
        self.inner.put_if_absent(peer_id, key)
    }

    fn peers(&self) -> Result<Vec<PeerId>, StorageError> {
        self.inject()?;
        self.inner.peers()
    }
}
