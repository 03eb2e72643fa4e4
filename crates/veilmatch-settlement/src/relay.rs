//! The report transport.
//!
//! A [`Relay`] carries encoded report bytes to the authority and returns
//! what the authority did with them. [`VaultRelay`] delivers in-process to
//! a shared [`VaultStateMachine`] as a fixed sender address.

use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256, keccak256};
use async_trait::async_trait;
use tracing::debug;
use veilmatch_types::{Result, VeilError};
use veilmatch_vault::{
    BridgeRouter, FlagStore, MemoryBridge, MemoryFlagStore, MemoryLedger, ReportOutcome,
    TokenLedger, VaultStateMachine,
};

/// Acknowledgement of an applied report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReceipt {
    /// Keccak-256 of the submitted bytes.
    pub report_hash: B256,
    pub outcome: ReportOutcome,
}

#[async_trait]
pub trait Relay: Send + Sync {
    /// Deliver one encoded report. Authority rejections come back as the
    /// authority's own error; transport failures as `Network` / `Io`.
    async fn submit_report(&self, report: &[u8]) -> Result<RelayReceipt>;
}

pub struct VaultRelay<
    L = MemoryLedger,
    R = MemoryBridge,
    V = MemoryFlagStore<Address>,
    S = MemoryFlagStore<B256>,
> {
    vault: Arc<Mutex<VaultStateMachine<L, R, V, S>>>,
    sender: Address,
}

impl<L, R, V, S> VaultRelay<L, R, V, S> {
    pub fn new(vault: Arc<Mutex<VaultStateMachine<L, R, V, S>>>, sender: Address) -> Self {
        Self { vault, sender }
    }

    #[must_use]
    pub fn sender(&self) -> Address {
        self.sender
    }
}

#[async_trait]
impl<L, R, V, S> Relay for VaultRelay<L, R, V, S>
where
    L: TokenLedger + Send,
    R: BridgeRouter + Send,
    V: FlagStore<Address> + Send,
    S: FlagStore<B256> + Send,
{
    async fn submit_report(&self, report: &[u8]) -> Result<RelayReceipt> {
        let report_hash = keccak256(report);
        let outcome = {
            let mut vault = self
                .vault
                .lock()
                .map_err(|_| VeilError::Internal("vault lock poisoned".to_string()))?;
            vault.on_report(self.sender, report)?
        };
        debug!(report_hash = %report_hash, sender = %self.sender, "Report delivered");
        Ok(RelayReceipt {
            report_hash,
            outcome,
        })
    }
}
