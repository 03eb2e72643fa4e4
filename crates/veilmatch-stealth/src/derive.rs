//! Sender-side derivation of one-time destinations.

use alloy_primitives::keccak256;
use k256::ProjectivePoint;
use tracing::debug;
use veilmatch_types::{OrderId, Result, SpendingPublicKey, StealthLeg};

use crate::curve::{address_of, compress, parse_point, scalar_from_digest};
use crate::seed::{LegRole, StealthSeed};

/// Derive the one-time destination for `spending_key` under `seed`.
///
/// ```text
/// r = keccak256(seed)            ephemeral scalar, rejected if 0 or >= n
/// R = r·G                        published as the ephemeral public key
/// P = r·S                        shared point
/// h = keccak256(compress(P))     view tag = h[0]
/// t = h                          rejected if 0 or >= n
/// stealth = S + t·G              address = keccak256(X || Y)[12..]
/// ```
///
/// The recipient recomputes `P = s·R` and spends with `s + t`.
pub fn derive_stealth_address(
    spending_key: &SpendingPublicKey,
    seed: &StealthSeed,
) -> Result<StealthLeg> {
    let spending = parse_point(spending_key)?;
    let r = scalar_from_digest(keccak256(seed.as_b256()))?;

    let ephemeral = ProjectivePoint::GENERATOR * *r;
    let shared = spending * *r;
    let digest = keccak256(compress(&shared)?.as_bytes());
    let t = scalar_from_digest(digest)?;
    let stealth = spending + ProjectivePoint::GENERATOR * *t;

    Ok(StealthLeg {
        stealth_address: address_of(&stealth)?,
        ephemeral_public_key: compress(&ephemeral)?,
        view_tag: digest[0],
    })
}

/// Reject spending keys that are not usable curve points.
pub fn validate_spending_key(key: &SpendingPublicKey) -> Result<()> {
    parse_point(key).map(|_| ())
}

/// Derive both legs of a trade. Each leg gets its own role-separated seed.
pub fn derive_trade_legs(
    buy_order_id: OrderId,
    sell_order_id: OrderId,
    trade_nonce: u64,
    buyer_key: &SpendingPublicKey,
    seller_key: &SpendingPublicKey,
) -> Result<(StealthLeg, StealthLeg)> {
    let buyer_seed = StealthSeed::for_leg(buy_order_id, sell_order_id, trade_nonce, LegRole::Buyer);
    let seller_seed =
        StealthSeed::for_leg(buy_order_id, sell_order_id, trade_nonce, LegRole::Seller);
    let buyer = derive_stealth_address(buyer_key, &buyer_seed)?;
    let seller = derive_stealth_address(seller_key, &seller_seed)?;
    debug!(
        buy = %buy_order_id,
        sell = %sell_order_id,
        nonce = trade_nonce,
        buyer_view_tag = buyer.view_tag,
        seller_view_tag = seller.view_tag,
        "Derived stealth legs"
    );
    Ok((buyer, seller))
}
