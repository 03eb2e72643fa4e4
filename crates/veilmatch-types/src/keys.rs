//! Stealth key material carried on orders.
//!
//! Only the **public** half of a recipient's spending key ever leaves the
//! client. Curve validation lives in `veilmatch-stealth`; this type is the
//! raw, serializable compressed SEC1 encoding.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Result, VeilError};

/// Length of a compressed SEC1 secp256k1 point.
pub const COMPRESSED_KEY_LEN: usize = 33;

/// A compressed SEC1 secp256k1 public key (33 bytes).
///
/// Serialized as a `0x`-prefixed hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes(pub [u8; COMPRESSED_KEY_LEN]);

/// A recipient's long-lived spending public key.
pub type SpendingPublicKey = PublicKeyBytes;

/// The per-trade ephemeral public key `R = r·G`, published with a settlement
/// so the recipient can recompute the shared secret.
pub type EphemeralPublicKey = PublicKeyBytes;

impl PublicKeyBytes {
    /// Wrap raw bytes. Only the length and SEC1 prefix are checked here.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; COMPRESSED_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| VeilError::InvalidPublicKey {
                    reason: format!(
                        "expected {COMPRESSED_KEY_LEN} bytes, got {}",
                        bytes.len()
                    ),
                })?;
        if array[0] != 0x02 && array[0] != 0x03 {
            return Err(VeilError::InvalidPublicKey {
                reason: format!("bad SEC1 prefix 0x{:02x}", array[0]),
            });
        }
        Ok(Self(array))
    }

    /// Parse a `0x`-prefixed (or bare) hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(|e| {
            VeilError::InvalidPublicKey {
                reason: e.to_string(),
            }
        })?;
        Self::from_slice(&raw)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_KEY_LEN] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for PublicKeyBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKeyBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
