//! Production Environment implementation using the OS RNG.
//!
//! `SystemEnv` draws IVs and identity scalars from getrandom. Truly random,
//! not reproducible.

use hushwire_core::Environment;

/// Production environment backed by the OS cryptographic RNG.
///
/// # Security
///
/// getrandom provides OS-level cryptographic randomness (e.g. the getrandom
/// syscall on Linux, `BCryptGenRandom` on Windows). Suitable for IVs and
/// identity keys.
///
/// # Panics
///
/// Panics if the OS RNG fails. A client without working randomness would
/// produce predictable IVs and identity keys.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - client cannot encrypt securely");
    }
}
