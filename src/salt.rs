//! Salt generation.
//!
//! Uses `ring::rand::SystemRandom`, the only source of randomness in the
//! crate. Every call draws fresh bytes; nothing is cached or counter-based,
//! so concurrent callers never share or correlate output.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use crate::error::FilterError;
use crate::params::{DEFAULT_SALT_BYTES, MIN_SALT_BYTES};

/// Produces a fresh random salt token per call.
pub trait SaltGenerator: Send + Sync {
    fn generate(&self) -> Result<String, FilterError>;
}

/// CSPRNG-backed generator emitting URL-safe base64 without padding.
#[derive(Debug)]
pub struct DefaultSaltGenerator {
    rng: SystemRandom,
    len: usize,
}

impl DefaultSaltGenerator {
    pub fn new() -> Self {
        Self::with_len(DEFAULT_SALT_BYTES)
    }

    /// A generator drawing `len` random bytes per salt, clamped to at least
    /// `MIN_SALT_BYTES`.
    pub fn with_len(len: usize) -> Self {
        Self {
            rng: SystemRandom::new(),
            len: len.max(MIN_SALT_BYTES),
        }
    }
}

impl Default for DefaultSaltGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SaltGenerator for DefaultSaltGenerator {
    fn generate(&self) -> Result<String, FilterError> {
        let mut bytes = Zeroizing::new(vec![0u8; self.len]);
        self.rng
            .fill(bytes.as_mut_slice())
            .map_err(|_| FilterError::RandomnessFailure)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes.as_slice()))
    }
}
