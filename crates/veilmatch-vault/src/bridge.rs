//! Outbound cross-chain messaging and the destination-side receiver.
//!
//! The source vault hands a [`BridgeMessage`] plus the USDC leg to a
//! [`BridgeRouter`], paying the router's fee from its fee balance. The
//! destination [`CrossChainReceiver`] pays the buyer the RWA leg and the
//! seller the bridged USDC. It keeps its own settled set, so a message
//! delivered twice pays once.

use std::collections::HashSet;

use alloy_primitives::{Address, B256, U256, keccak256};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use veilmatch_types::{Result, VeilError};

use crate::ledger::{TokenLedger, Transfer};
use crate::store::{FlagStore, MemoryFlagStore};

/// Payload carried to the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub dest_chain_selector: u64,
    pub receiver: Address,
    pub order_id: B256,
    pub buyer: Address,
    pub seller: Address,
    pub token_rwa: Address,
    pub amount_rwa: U256,
    /// Token leg moved alongside the message (USDC).
    pub token: Address,
    pub amount: U256,
}

impl BridgeMessage {
    fn digest(&self, sequence: u64) -> B256 {
        let mut preimage = Vec::with_capacity(8 + 20 * 6 + 32 * 3 + 8);
        preimage.extend_from_slice(&self.dest_chain_selector.to_be_bytes());
        preimage.extend_from_slice(self.receiver.as_slice());
        preimage.extend_from_slice(self.order_id.as_slice());
        preimage.extend_from_slice(self.buyer.as_slice());
        preimage.extend_from_slice(self.seller.as_slice());
        preimage.extend_from_slice(self.token_rwa.as_slice());
        preimage.extend_from_slice(&self.amount_rwa.to_be_bytes::<32>());
        preimage.extend_from_slice(self.token.as_slice());
        preimage.extend_from_slice(&self.amount.to_be_bytes::<32>());
        preimage.extend_from_slice(&sequence.to_be_bytes());
        keccak256(&preimage)
    }
}

pub trait BridgeRouter {
    /// Account that receives the token leg on the source chain.
    fn address(&self) -> Address;

    /// Fee, in native units, to send `message`.
    fn fee(&self, message: &BridgeMessage) -> Result<U256>;

    /// Dispatch `message`. Returns the message id.
    fn send(&mut self, message: BridgeMessage, fee: U256) -> Result<B256>;
}

/// In-memory router that queues messages in an outbox.
#[derive(Debug, Clone)]
pub struct MemoryBridge {
    address: Address,
    fee: U256,
    supported_chains: HashSet<u64>,
    offline: bool,
    outbox: Vec<(B256, BridgeMessage)>,
    sequence: u64,
}

impl MemoryBridge {
    #[must_use]
    pub fn new(address: Address, fee: U256) -> Self {
        Self {
            address,
            fee,
            supported_chains: HashSet::new(),
            offline: false,
            outbox: Vec::new(),
            sequence: 0,
        }
    }

    #[must_use]
    pub fn with_chain(mut self, selector: u64) -> Self {
        self.supported_chains.insert(selector);
        self
    }

    /// While offline every send fails.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    #[must_use]
    pub fn outbox(&self) -> &[(B256, BridgeMessage)] {
        &self.outbox
    }

    /// Hand queued messages to the destination side.
    pub fn drain_outbox(&mut self) -> Vec<(B256, BridgeMessage)> {
        std::mem::take(&mut self.outbox)
    }
}

impl BridgeRouter for MemoryBridge {
    fn address(&self) -> Address {
        self.address
    }

    fn fee(&self, message: &BridgeMessage) -> Result<U256> {
        if !self.supported_chains.contains(&message.dest_chain_selector) {
            return Err(VeilError::BridgeSendFailed {
                reason: format!("unsupported chain {}", message.dest_chain_selector),
            });
        }
        Ok(self.fee)
    }

    fn send(&mut self, message: BridgeMessage, fee: U256) -> Result<B256> {
        if self.offline {
            return Err(VeilError::BridgeSendFailed {
                reason: "router unavailable".to_string(),
            });
        }
        let required = self.fee(&message)?;
        if fee < required {
            return Err(VeilError::BridgeSendFailed {
                reason: format!("fee {fee} below required {required}"),
            });
        }
        let id = message.digest(self.sequence);
        self.sequence += 1;
        self.outbox.push((id, message));
        Ok(id)
    }
}

/// Destination-side settlement of bridged trades.
#[derive(Debug)]
pub struct CrossChainReceiver<L, S = MemoryFlagStore<B256>> {
    address: Address,
    ledger: L,
    settled: S,
}

impl<L: TokenLedger> CrossChainReceiver<L> {
    pub fn new(address: Address, ledger: L) -> Self {
        Self::with_store(address, ledger, MemoryFlagStore::new())
    }
}

impl<L: TokenLedger, S: FlagStore<B256>> CrossChainReceiver<L, S> {
    pub fn with_store(address: Address, ledger: L, settled: S) -> Self {
        Self {
            address,
            ledger,
            settled,
        }
    }

    /// Pay both legs of a bridged trade once. A redelivery fails
    /// `AlreadySettled` without moving funds.
    pub fn receive(&mut self, message: &BridgeMessage) -> Result<()> {
        if self.settled.is_set(&message.order_id) {
            warn!(order_id = %message.order_id, "Duplicate bridged settlement ignored");
            return Err(VeilError::AlreadySettled(message.order_id));
        }
        self.ledger.transfer_batch(&[
            Transfer {
                token: message.token_rwa,
                from: self.address,
                to: message.buyer,
                amount: message.amount_rwa,
            },
            Transfer {
                token: message.token,
                from: self.address,
                to: message.seller,
                amount: message.amount,
            },
        ])?;
        self.settled.set(message.order_id);
        info!(order_id = %message.order_id, "Bridged settlement paid");
        Ok(())
    }

    #[must_use]
    pub fn is_settled(&self, order_id: &B256) -> bool {
        self.settled.is_set(order_id)
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}
