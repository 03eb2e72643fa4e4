//! Settlement reports and their canonical binary layout.
//!
//! A report is the only message the vault authority accepts from the
//! off-chain side. Every report encodes exactly one variant:
//!
//! ```text
//! byte 0        : tag (0 Verify, 1 Settle, 2 Withdraw, 3 CrossChainSettle)
//! bytes 1..     : the variant's fields as 32-byte big-endian ABI words,
//!                 in declaration order
//! ```
//!
//! Addresses occupy the low 20 bytes of their word and `uint64` the low 8;
//! the high bytes must be zero. Decoding is strict: unknown tags, wrong
//! lengths, and dirty padding are all rejected. Nothing is ever skipped.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{Result, VeilError};

/// Size of one ABI word.
pub const WORD: usize = 32;

/// Discriminant byte that opens every encoded report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReportTag {
    Verify = 0,
    Settle = 1,
    Withdraw = 2,
    CrossChainSettle = 3,
}

impl ReportTag {
    /// Number of ABI words that follow the tag byte.
    #[must_use]
    pub fn word_count(self) -> usize {
        match self {
            Self::Verify => 1,
            Self::Settle => 7,
            Self::Withdraw => 2,
            Self::CrossChainSettle => 9,
        }
    }

    /// Exact encoded length of a report with this tag.
    #[must_use]
    pub fn encoded_len(self) -> usize {
        1 + self.word_count() * WORD
    }
}

impl TryFrom<u8> for ReportTag {
    type Error = VeilError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Verify),
            1 => Ok(Self::Settle),
            2 => Ok(Self::Withdraw),
            3 => Ok(Self::CrossChainSettle),
            other => Err(VeilError::UnknownReportTag(other)),
        }
    }
}

impl std::fmt::Display for ReportTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verify => write!(f, "VERIFY"),
            Self::Settle => write!(f, "SETTLE"),
            Self::Withdraw => write!(f, "WITHDRAW"),
            Self::CrossChainSettle => write!(f, "CROSS_CHAIN_SETTLE"),
        }
    }
}

/// Pay both legs of a matched trade to their stealth destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleReport {
    pub order_id: B256,
    pub stealth_buyer: Address,
    pub stealth_seller: Address,
    /// Token paid to the buyer (the base asset).
    pub token_a: Address,
    /// Token paid to the seller (the quote asset).
    pub token_b: Address,
    pub amount_a: U256,
    pub amount_b: U256,
}

/// Settle a trade whose buyer leg is delivered on another chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainSettleReport {
    pub order_id: B256,
    pub dest_chain_selector: u64,
    pub dest_receiver: Address,
    pub buyer: Address,
    pub seller: Address,
    pub token_usdc: Address,
    pub amount_usdc: U256,
    pub token_rwa: Address,
    pub amount_rwa: U256,
}

/// One authenticated state-transition request for the vault authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementReport {
    Verify { user: Address },
    Settle(SettleReport),
    Withdraw { user: Address, withdrawal_id: U256 },
    CrossChainSettle(CrossChainSettleReport),
}

impl SettlementReport {
    #[must_use]
    pub fn tag(&self) -> ReportTag {
        match self {
            Self::Verify { .. } => ReportTag::Verify,
            Self::Settle(_) => ReportTag::Settle,
            Self::Withdraw { .. } => ReportTag::Withdraw,
            Self::CrossChainSettle(_) => ReportTag::CrossChainSettle,
        }
    }

    /// Encode into the canonical tagged layout.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let tag = self.tag();
        let mut w = WordWriter::with_tag(tag);
        match self {
            Self::Verify { user } => {
                w.address(*user);
            }
            Self::Settle(s) => {
                w.b256(s.order_id)
                    .address(s.stealth_buyer)
                    .address(s.stealth_seller)
                    .address(s.token_a)
                    .address(s.token_b)
                    .u256(s.amount_a)
                    .u256(s.amount_b);
            }
            Self::Withdraw {
                user,
                withdrawal_id,
            } => {
                w.address(*user).u256(*withdrawal_id);
            }
            Self::CrossChainSettle(c) => {
                w.b256(c.order_id)
                    .u64(c.dest_chain_selector)
                    .address(c.dest_receiver)
                    .address(c.buyer)
                    .address(c.seller)
                    .address(c.token_usdc)
                    .u256(c.amount_usdc)
                    .address(c.token_rwa)
                    .u256(c.amount_rwa);
            }
        }
        debug_assert_eq!(w.buf.len(), tag.encoded_len());
        w.buf
    }

    /// Decode a report, rejecting anything that is not exactly one
    /// well-formed variant.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag_byte, body) = bytes.split_first().ok_or_else(|| VeilError::MalformedReport {
            reason: "empty report".to_string(),
        })?;
        let tag = ReportTag::try_from(tag_byte)?;
        if bytes.len() != tag.encoded_len() {
            return Err(VeilError::MalformedReport {
                reason: format!(
                    "{tag} report must be {} bytes, got {}",
                    tag.encoded_len(),
                    bytes.len()
                ),
            });
        }

        let mut r = WordReader::new(body);
        let report = match tag {
            ReportTag::Verify => Self::Verify { user: r.address()? },
            ReportTag::Settle => Self::Settle(SettleReport {
                order_id: r.b256()?,
                stealth_buyer: r.address()?,
                stealth_seller: r.address()?,
                token_a: r.address()?,
                token_b: r.address()?,
                amount_a: r.u256()?,
                amount_b: r.u256()?,
            }),
            ReportTag::Withdraw => Self::Withdraw {
                user: r.address()?,
                withdrawal_id: r.u256()?,
            },
            ReportTag::CrossChainSettle => Self::CrossChainSettle(CrossChainSettleReport {
                order_id: r.b256()?,
                dest_chain_selector: r.u64()?,
                dest_receiver: r.address()?,
                buyer: r.address()?,
                seller: r.address()?,
                token_usdc: r.address()?,
                amount_usdc: r.u256()?,
                token_rwa: r.address()?,
                amount_rwa: r.u256()?,
            }),
        };
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Word codec
// ---------------------------------------------------------------------------

struct WordWriter {
    buf: Vec<u8>,
}

impl WordWriter {
    fn with_tag(tag: ReportTag) -> Self {
        let mut buf = Vec::with_capacity(tag.encoded_len());
        buf.push(tag as u8);
        Self { buf }
    }

    fn b256(&mut self, value: B256) -> &mut Self {
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    fn address(&mut self, value: Address) -> &mut Self {
        self.buf.extend_from_slice(&[0u8; 12]);
        self.buf.extend_from_slice(value.as_slice());
        self
    }

    fn u256(&mut self, value: U256) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes::<WORD>());
        self
    }

    fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&[0u8; 24]);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }
}

struct WordReader<'a> {
    words: std::slice::ChunksExact<'a, u8>,
    index: usize,
}

impl<'a> WordReader<'a> {
    fn new(body: &'a [u8]) -> Self {
        Self {
            words: body.chunks_exact(WORD),
            index: 0,
        }
    }

    fn next_word(&mut self) -> Result<&'a [u8]> {
        let word = self.words.next().ok_or_else(|| VeilError::MalformedReport {
            reason: format!("missing word {}", self.index),
        })?;
        self.index += 1;
        Ok(word)
    }

    fn require_zero_padding(&self, padding: &[u8], kind: &str) -> Result<()> {
        if padding.iter().any(|&b| b != 0) {
            return Err(VeilError::MalformedReport {
                reason: format!("dirty {kind} padding in word {}", self.index - 1),
            });
        }
        Ok(())
    }

    fn b256(&mut self) -> Result<B256> {
        Ok(B256::from_slice(self.next_word()?))
    }

    fn address(&mut self) -> Result<Address> {
        let word = self.next_word()?;
        self.require_zero_padding(&word[..12], "address")?;
        Ok(Address::from_slice(&word[12..]))
    }

    fn u256(&mut self) -> Result<U256> {
        Ok(U256::from_be_slice(self.next_word()?))
    }

    fn u64(&mut self) -> Result<u64> {
        let word = self.next_word()?;
        self.require_zero_padding(&word[..24], "uint64")?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&word[24..]);
        Ok(u64::from_be_bytes(raw))
    }
}
