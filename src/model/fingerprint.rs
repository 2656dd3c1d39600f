//! # Fingerprint
//!
//! Deterministic content hashes used for cheap equality between snapshots.
//!
//! A fingerprint is the lowercase hex SHA-256 of an entity's semantic fields.
//! Fields are fed to the hasher with their name and a length prefix, so two
//! different field layouts can never produce the same byte stream. The
//! entity's own fingerprint is never part of its input.
//!
//! Collisions are treated as impossible. This is a documented simplification,
//! not a cryptographic guarantee the reconciler relies on for security.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex encoded SHA-256 content hash
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Borrow the hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the default (never computed) fingerprint
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental builder for a [`Fingerprint`]
///
/// ```
/// use idp_scim_sync::model::FingerprintHasher;
///
/// let a = FingerprintHasher::new("group").field("name", "admins").finish();
/// let b = FingerprintHasher::new("group").field("name", "admins").finish();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct FingerprintHasher {
    hasher: Sha256,
}

impl FingerprintHasher {
    /// Start a hash for the given entity kind
    ///
    /// The kind separates domains: a group and a user with identical field
    /// values still hash differently.
    pub fn new(kind: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update([0u8]);
        Self { hasher }
    }

    /// Feed a named field
    #[must_use]
    pub fn field(mut self, name: &str, value: impl AsRef<[u8]>) -> Self {
        let value = value.as_ref();
        self.hasher.update(name.as_bytes());
        self.hasher.update([b'=']);
        self.hasher.update((value.len() as u64).to_be_bytes());
        self.hasher.update(value);
        self
    }

    /// Feed a boolean field
    #[must_use]
    pub fn flag(self, name: &str, value: bool) -> Self {
        self.field(name, if value { [1u8] } else { [0u8] })
    }

    /// Finish and hex encode the digest
    pub fn finish(self) -> Fingerprint {
        Fingerprint(format!("{:x}", self.hasher.finalize()))
    }
}
