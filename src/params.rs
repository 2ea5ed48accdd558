//! Envelope parameter names, defaults, and filter configuration.
//!
//! The parameter names are part of the wire contract with the remote
//! service and must match exactly. Every module that reads or writes an
//! envelope parameter takes its name from here.

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Default encryption key size, in bits.
pub const DEFAULT_ENCRYPTION_SIZE: u32 = 128;

/// Default number of key derivation iterations.
pub const DEFAULT_ENCRYPTION_ITERATIONS: u32 = 1024;

/// Default number of random bytes behind each generated salt.
pub const DEFAULT_SALT_BYTES: usize = 32;

/// Smallest salt accepted from configuration.
pub const MIN_SALT_BYTES: usize = 16;

/// Query and payload parameters that make up the encryption envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKeyParameter {
    EncryptSecret,
    EncryptionKeySalt,
    EncryptionKeySize,
    EncryptionKeyIterations,
    /// Response-only: the key under which metadata is attached.
    EncryptionMetadata,
}

impl ApiKeyParameter {
    /// The four parameters that travel in the outgoing query.
    pub const ENVELOPE: [ApiKeyParameter; 4] = [
        Self::EncryptSecret,
        Self::EncryptionKeySize,
        Self::EncryptionKeyIterations,
        Self::EncryptionKeySalt,
    ];

    /// Wire name of the parameter.
    pub const fn name(self) -> &'static str {
        match self {
            Self::EncryptSecret => "encryptSecret",
            Self::EncryptionKeySalt => "encryptionKeySalt",
            Self::EncryptionKeySize => "encryptionKeySize",
            Self::EncryptionKeyIterations => "encryptionKeyIterations",
            Self::EncryptionMetadata => "encryptionMetadata",
        }
    }

    /// Returns true if `key` names one of the four envelope query parameters.
    pub fn is_envelope_key(key: &str) -> bool {
        Self::ENVELOPE.iter().any(|p| p.name() == key)
    }
}

/// Tunables for the envelope the filter injects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Key size sent with injected criteria and assumed when absent.
    pub key_size: u32,
    /// Iteration count sent with injected criteria and assumed when absent.
    pub key_iterations: u32,
    /// Random bytes drawn per salt.
    pub salt_bytes: usize,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key_size: DEFAULT_ENCRYPTION_SIZE,
            key_iterations: DEFAULT_ENCRYPTION_ITERATIONS,
            salt_bytes: DEFAULT_SALT_BYTES,
        }
    }
}

impl EncryptionConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their defaults.
    pub fn from_json(raw: &str) -> Result<Self, FilterError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| FilterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.key_size == 0 {
            return Err(FilterError::Config("key_size must be non-zero".into()));
        }
        if self.key_iterations == 0 {
            return Err(FilterError::Config("key_iterations must be non-zero".into()));
        }
        if self.salt_bytes < MIN_SALT_BYTES {
            return Err(FilterError::Config(format!(
                "salt_bytes must be at least {MIN_SALT_BYTES}"
            )));
        }
        Ok(())
    }
}
