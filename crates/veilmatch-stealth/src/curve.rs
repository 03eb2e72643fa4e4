//! secp256k1 helpers shared by derivation and recovery.

use alloy_primitives::{Address, B256, keccak256};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{FieldBytes, NonZeroScalar, ProjectivePoint, PublicKey};
use veilmatch_types::{PublicKeyBytes, Result, VeilError, keys::COMPRESSED_KEY_LEN};

/// Parse a compressed key into a curve point. Off-curve encodings and the
/// identity are rejected.
pub(crate) fn parse_point(key: &PublicKeyBytes) -> Result<ProjectivePoint> {
    let public = PublicKey::from_sec1_bytes(key.as_bytes()).map_err(|_| {
        VeilError::InvalidPublicKey {
            reason: format!("{key} is not a point on secp256k1"),
        }
    })?;
    Ok(public.to_projective())
}

/// Interpret a 32-byte digest as a scalar. Zero and values `>= n` are
/// degenerate; nothing is reduced modulo the order.
pub(crate) fn scalar_from_digest(digest: B256) -> Result<NonZeroScalar> {
    let repr = FieldBytes::clone_from_slice(digest.as_slice());
    Option::<NonZeroScalar>::from(NonZeroScalar::from_repr(repr)).ok_or(VeilError::DegenerateScalar)
}

pub(crate) fn compress(point: &ProjectivePoint) -> Result<PublicKeyBytes> {
    if *point == ProjectivePoint::IDENTITY {
        return Err(VeilError::DegenerateScalar);
    }
    let encoded = point.to_affine().to_encoded_point(true);
    let bytes: [u8; COMPRESSED_KEY_LEN] =
        encoded
            .as_bytes()
            .try_into()
            .map_err(|_| VeilError::Internal("compressed point has wrong length".to_string()))?;
    Ok(PublicKeyBytes(bytes))
}

/// EVM address of a point: last 20 bytes of `keccak256(X || Y)`.
pub(crate) fn address_of(point: &ProjectivePoint) -> Result<Address> {
    if *point == ProjectivePoint::IDENTITY {
        return Err(VeilError::DegenerateScalar);
    }
    let encoded = point.to_affine().to_encoded_point(false);
    // Skip the 0x04 SEC1 prefix.
    let digest = keccak256(&encoded.as_bytes()[1..]);
    Ok(Address::from_slice(&digest[12..]))
}
