//! Recipient-side scanning and key recovery.
//!
//! Given a published [`StealthLeg`] and their own spending secret `s`, a
//! recipient recomputes the shared point `P = s·R`, checks the view tag,
//! and reconstructs the one-time private key `s + t`.

use std::fmt;

use alloy_primitives::{Address, keccak256};
use k256::{FieldBytes, NonZeroScalar, ProjectivePoint, SecretKey};
use veilmatch_types::{Result, SpendingPublicKey, StealthLeg, VeilError};

use crate::curve::{address_of, compress, parse_point, scalar_from_digest};

/// A recipient's long-lived spending private key. Never leaves the client.
#[derive(Clone)]
pub struct SpendingSecret(NonZeroScalar);

impl SpendingSecret {
    /// Parse a big-endian scalar, rejecting zero and values `>= n`.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let repr = FieldBytes::clone_from_slice(bytes);
        Option::<NonZeroScalar>::from(NonZeroScalar::from_repr(repr))
            .map(Self)
            .ok_or(VeilError::DegenerateScalar)
    }

    /// The spending public key to attach to orders.
    pub fn public_key(&self) -> Result<SpendingPublicKey> {
        compress(&(ProjectivePoint::GENERATOR * *self.0))
    }
}

impl From<SecretKey> for SpendingSecret {
    fn from(secret: SecretKey) -> Self {
        Self(secret.to_nonzero_scalar())
    }
}

impl fmt::Debug for SpendingSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpendingSecret(..)")
    }
}

/// The private key controlling one stealth address.
pub struct StealthSecret {
    key: SecretKey,
    address: Address,
}

impl StealthSecret {
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn secret_key(&self) -> &SecretKey {
        &self.key
    }
}

impl fmt::Debug for StealthSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StealthSecret")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Cheap pre-filter: does the announcement's view tag match this key?
/// One point multiplication, no address hashing.
pub fn view_tag_matches(secret: &SpendingSecret, leg: &StealthLeg) -> Result<bool> {
    let ephemeral = parse_point(&leg.ephemeral_public_key)?;
    let shared = ephemeral * *secret.0;
    let digest = keccak256(compress(&shared)?.as_bytes());
    Ok(digest[0] == leg.view_tag)
}

/// Check whether `leg` pays this recipient. Returns the stealth private
/// key if it does, `None` otherwise.
pub fn scan(secret: &SpendingSecret, leg: &StealthLeg) -> Result<Option<StealthSecret>> {
    let ephemeral = parse_point(&leg.ephemeral_public_key)?;
    let shared = ephemeral * *secret.0;
    let digest = keccak256(compress(&shared)?.as_bytes());
    if digest[0] != leg.view_tag {
        return Ok(None);
    }

    let t = scalar_from_digest(digest)?;
    let sum = Option::<NonZeroScalar>::from(NonZeroScalar::new(*secret.0 + *t))
        .ok_or(VeilError::DegenerateScalar)?;
    let address = address_of(&(ProjectivePoint::GENERATOR * *sum))?;
    if address != leg.stealth_address {
        return Ok(None);
    }
    Ok(Some(StealthSecret {
        key: SecretKey::from(sum),
        address,
    }))
}

/// Like [`scan`], but a leg that does not belong to this key is an error.
pub fn recover_stealth_key(secret: &SpendingSecret, leg: &StealthLeg) -> Result<StealthSecret> {
    scan(secret, leg)?.ok_or(VeilError::StealthMismatch(leg.stealth_address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::{derive_stealth_address, derive_trade_legs};
    use crate::seed::StealthSeed;
    use alloy_primitives::B256;
    use rand::rngs::OsRng;
    use veilmatch_types::OrderId;

    fn random_secret() -> SpendingSecret {
        SpendingSecret::from(SecretKey::random(&mut OsRng))
    }

    #[test]
    fn recipient_recovers_key_for_every_seed() {
        let secret = random_secret();
        let public = secret.public_key().unwrap();
        for i in 0u8..16 {
            let leg = derive_stealth_address(&public, &StealthSeed(B256::repeat_byte(i + 1)))
                .unwrap();
            assert!(view_tag_matches(&secret, &leg).unwrap());
            let recovered = recover_stealth_key(&secret, &leg).unwrap();
            assert_eq!(recovered.address(), leg.stealth_address);
            // The recovered key really controls the address.
            let point = recovered.secret_key().public_key().to_projective();
            assert_eq!(address_of(&point).unwrap(), leg.stealth_address);
        }
    }

    #[test]
    fn other_recipient_cannot_claim() {
        let alice = random_secret();
        let bob = random_secret();
        let leg = derive_stealth_address(
            &alice.public_key().unwrap(),
            &StealthSeed(B256::repeat_byte(0x42)),
        )
        .unwrap();
        assert!(scan(&bob, &leg).unwrap().is_none());
        assert_eq!(
            recover_stealth_key(&bob, &leg).unwrap_err(),
            VeilError::StealthMismatch(leg.stealth_address)
        );
    }

    #[test]
    fn both_trade_legs_recoverable_by_their_owners() {
        let buyer = random_secret();
        let seller = random_secret();
        let (b, s) = derive_trade_legs(
            OrderId::new(),
            OrderId::new(),
            7,
            &buyer.public_key().unwrap(),
            &seller.public_key().unwrap(),
        )
        .unwrap();
        assert_eq!(recover_stealth_key(&buyer, &b).unwrap().address(), b.stealth_address);
        assert_eq!(recover_stealth_key(&seller, &s).unwrap().address(), s.stealth_address);
        assert!(scan(&buyer, &s).unwrap().is_none());
    }

    #[test]
    fn zero_secret_rejected() {
        assert!(SpendingSecret::from_bytes(&[0; 32]).is_err());
        let mut one = [0u8; 32];
        one[31] = 1;
        let secret = SpendingSecret::from_bytes(&one).unwrap();
        assert_eq!(
            secret.public_key().unwrap().as_bytes(),
            &veilmatch_types::Order::TEST_SPENDING_KEY
        );
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = random_secret();
        assert_eq!(format!("{secret:?}"), "SpendingSecret(..)");
    }
}
