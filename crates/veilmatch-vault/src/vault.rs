//! The custody authority.
//!
//! Reports are accepted from exactly one trusted sender (the forwarder),
//! decoded, and applied one at a time. Each report either fully applies or
//! leaves every store untouched.
//!
//! ```text
//! Settle      per order id:  unsettled ──▶ settled           (terminal)
//! Withdraw    per request:   requested ──▶ claimed           (terminal)
//! Verify      per address:   unverified ──▶ verified          (terminal, repeat = no-op)
//! ```
//!
//! Custody is pooled. Settle and CrossChainSettle trust the report's
//! amounts once the sender check and the settled guard pass; there is no
//! per-user balance accounting. Only deposits are gated on verification.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use veilmatch_types::{
    CrossChainSettleReport, Result, SettleReport, SettlementReport, VaultConfig, VeilError,
};

use crate::bridge::{BridgeMessage, BridgeRouter, MemoryBridge};
use crate::compliance::ComplianceGate;
use crate::conservation::CustodyJournal;
use crate::events::VaultEvent;
use crate::ledger::{MemoryLedger, TokenLedger, Transfer};
use crate::store::{FlagStore, MemoryFlagStore};
use crate::withdrawal::{WithdrawalBook, WithdrawalRequest};

/// What an accepted report did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportOutcome {
    Verified {
        user: Address,
        /// `false` when the address was already verified.
        newly_verified: bool,
    },
    Settled {
        order_id: B256,
    },
    WithdrawalClaimed {
        user: Address,
        withdrawal_id: U256,
    },
    CrossChainDispatched {
        order_id: B256,
        message_id: B256,
        fee: U256,
    },
}

pub struct VaultStateMachine<
    L = MemoryLedger,
    R = MemoryBridge,
    V = MemoryFlagStore<Address>,
    S = MemoryFlagStore<B256>,
> {
    owner: Address,
    forwarder: Address,
    address: Address,
    verified: V,
    settled: S,
    ledger: L,
    router: R,
    withdrawals: WithdrawalBook,
    fee_balance: U256,
    journal: CustodyJournal,
    events: Vec<VaultEvent>,
}

impl<L: TokenLedger, R: BridgeRouter> VaultStateMachine<L, R> {
    /// A vault with in-memory verified and settled sets.
    pub fn new(config: &VaultConfig, ledger: L, router: R) -> Self {
        Self::with_stores(
            config,
            ledger,
            router,
            MemoryFlagStore::new(),
            MemoryFlagStore::new(),
        )
    }
}

impl<L, R, V, S> VaultStateMachine<L, R, V, S>
where
    L: TokenLedger,
    R: BridgeRouter,
    V: FlagStore<Address>,
    S: FlagStore<B256>,
{
    pub fn with_stores(config: &VaultConfig, ledger: L, router: R, verified: V, settled: S) -> Self {
        Self {
            owner: config.owner,
            forwarder: config.forwarder,
            address: config.vault_address,
            verified,
            settled,
            ledger,
            router,
            withdrawals: WithdrawalBook::new(),
            fee_balance: U256::ZERO,
            journal: CustodyJournal::new(),
            events: Vec::new(),
        }
    }

    // =================================================================
    // Caller-facing operations
    // =================================================================

    /// Move `amount` of `token` from `caller` into pooled custody. Only
    /// verified addresses may deposit.
    pub fn fund(&mut self, caller: Address, token: Address, amount: U256) -> Result<()> {
        if !self.verified.is_set(&caller) {
            return Err(VeilError::NotVerified(caller));
        }
        require_positive(amount)?;
        self.ledger.transfer(Transfer {
            token,
            from: caller,
            to: self.address,
            amount,
        })?;
        self.journal.record_inflow(token, amount);
        info!(user = %caller, token = %token, amount = %amount, "Custody funded");
        self.events.push(VaultEvent::Funded {
            user: caller,
            token,
            amount,
        });
        Ok(())
    }

    /// Register a withdrawal to be claimed later by a Withdraw report.
    /// Balances are not checked here.
    pub fn request_withdrawal(
        &mut self,
        caller: Address,
        token: Address,
        amount: U256,
    ) -> Result<U256> {
        require_positive(amount)?;
        let withdrawal_id = self.withdrawals.request(caller, token, amount);
        debug!(user = %caller, id = %withdrawal_id, "Withdrawal requested");
        self.events.push(VaultEvent::WithdrawalRequested {
            user: caller,
            withdrawal_id,
            token,
            amount,
        });
        Ok(withdrawal_id)
    }

    /// Top up the balance that pays bridging fees.
    pub fn deposit_fee_balance(&mut self, caller: Address, amount: U256) -> Result<()> {
        require_positive(amount)?;
        self.fee_balance = self
            .fee_balance
            .checked_add(amount)
            .ok_or(VeilError::BalanceOverflow)?;
        self.events.push(VaultEvent::FeeDeposited {
            from: caller,
            amount,
        });
        Ok(())
    }

    /// Rotate the trusted report sender.
    pub fn set_forwarder(&mut self, caller: Address, forwarder: Address) -> Result<()> {
        self.require_owner(caller)?;
        let previous = std::mem::replace(&mut self.forwarder, forwarder);
        warn!(previous = %previous, current = %forwarder, "Forwarder rotated");
        self.events.push(VaultEvent::ForwarderUpdated {
            previous,
            current: forwarder,
        });
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        self.require_owner(caller)?;
        let previous = std::mem::replace(&mut self.owner, new_owner);
        warn!(previous = %previous, current = %new_owner, "Ownership transferred");
        self.events.push(VaultEvent::OwnershipTransferred {
            previous,
            current: new_owner,
        });
        Ok(())
    }

    // =================================================================
    // Report intake
    // =================================================================

    /// Authenticate, decode, and apply one report.
    pub fn on_report(&mut self, sender: Address, report: &[u8]) -> Result<ReportOutcome> {
        if sender != self.forwarder {
            error!(
                sender = %sender,
                forwarder = %self.forwarder,
                security = true,
                "Report from unauthorized sender rejected"
            );
            return Err(VeilError::UnauthorizedSender(sender));
        }
        let report = SettlementReport::decode(report).inspect_err(|e| {
            warn!(error = %e, "Undecodable report rejected");
        })?;
        debug!(tag = %report.tag(), "Applying report");

        match report {
            SettlementReport::Verify { user } => Ok(self.apply_verify(user)),
            SettlementReport::Settle(settle) => self.apply_settle(&settle),
            SettlementReport::Withdraw {
                user,
                withdrawal_id,
            } => self.apply_withdraw(user, withdrawal_id),
            SettlementReport::CrossChainSettle(cross) => self.apply_cross_chain(&cross),
        }
    }

    fn apply_verify(&mut self, user: Address) -> ReportOutcome {
        let newly_verified = self.verified.set(user);
        if newly_verified {
            info!(user = %user, "Address verified");
            self.events.push(VaultEvent::Verified { user });
        }
        ReportOutcome::Verified {
            user,
            newly_verified,
        }
    }

    fn apply_settle(&mut self, s: &SettleReport) -> Result<ReportOutcome> {
        if self.settled.is_set(&s.order_id) {
            return Err(VeilError::AlreadySettled(s.order_id));
        }
        if s.stealth_buyer == self.address || s.stealth_seller == self.address {
            return Err(VeilError::MalformedReport {
                reason: format!("settlement {} pays the vault itself", s.order_id),
            });
        }
        self.ledger.transfer_batch(&[
            Transfer {
                token: s.token_a,
                from: self.address,
                to: s.stealth_buyer,
                amount: s.amount_a,
            },
            Transfer {
                token: s.token_b,
                from: self.address,
                to: s.stealth_seller,
                amount: s.amount_b,
            },
        ])?;
        self.settled.set(s.order_id);
        self.journal.record_outflow(s.token_a, s.amount_a);
        self.journal.record_outflow(s.token_b, s.amount_b);
        info!(order_id = %s.order_id, "Trade settled");
        self.events.push(VaultEvent::Settled {
            order_id: s.order_id,
            stealth_buyer: s.stealth_buyer,
            stealth_seller: s.stealth_seller,
            token_a: s.token_a,
            amount_a: s.amount_a,
            token_b: s.token_b,
            amount_b: s.amount_b,
        });
        Ok(ReportOutcome::Settled {
            order_id: s.order_id,
        })
    }

    fn apply_withdraw(&mut self, user: Address, withdrawal_id: U256) -> Result<ReportOutcome> {
        let WithdrawalRequest { token, amount, .. } =
            self.withdrawals.claimable(user, withdrawal_id)?.clone();
        self.ledger.transfer(Transfer {
            token,
            from: self.address,
            to: user,
            amount,
        })?;
        self.withdrawals.mark_claimed(user, withdrawal_id)?;
        self.journal.record_outflow(token, amount);
        info!(user = %user, id = %withdrawal_id, "Withdrawal claimed");
        self.events.push(VaultEvent::WithdrawalClaimed {
            user,
            withdrawal_id,
            token,
            amount,
        });
        Ok(ReportOutcome::WithdrawalClaimed {
            user,
            withdrawal_id,
        })
    }

    fn apply_cross_chain(&mut self, c: &CrossChainSettleReport) -> Result<ReportOutcome> {
        if self.settled.is_set(&c.order_id) {
            return Err(VeilError::AlreadySettled(c.order_id));
        }
        let message = BridgeMessage {
            dest_chain_selector: c.dest_chain_selector,
            receiver: c.dest_receiver,
            order_id: c.order_id,
            buyer: c.buyer,
            seller: c.seller,
            token_rwa: c.token_rwa,
            amount_rwa: c.amount_rwa,
            token: c.token_usdc,
            amount: c.amount_usdc,
        };
        let fee = self.router.fee(&message)?;
        if self.fee_balance < fee {
            return Err(VeilError::InsufficientFeeBalance {
                needed: fee,
                available: self.fee_balance,
            });
        }
        let custody = self.ledger.balance_of(c.token_usdc, self.address);
        if custody < c.amount_usdc {
            return Err(VeilError::InsufficientBalance {
                token: c.token_usdc,
                needed: c.amount_usdc,
                available: custody,
            });
        }

        let message_id = self.router.send(message, fee)?;

        // Fee and custody were checked above; the send is the last fallible step.
        self.fee_balance -= fee;
        self.ledger.transfer(Transfer {
            token: c.token_usdc,
            from: self.address,
            to: self.router.address(),
            amount: c.amount_usdc,
        })?;
        self.settled.set(c.order_id);
        self.journal.record_outflow(c.token_usdc, c.amount_usdc);
        info!(
            order_id = %c.order_id,
            chain = c.dest_chain_selector,
            message_id = %message_id,
            fee = %fee,
            "Cross-chain settlement dispatched"
        );
        self.events.push(VaultEvent::CrossChainDispatched {
            order_id: c.order_id,
            dest_chain_selector: c.dest_chain_selector,
            message_id,
            fee,
        });
        Ok(ReportOutcome::CrossChainDispatched {
            order_id: c.order_id,
            message_id,
            fee,
        })
    }

    fn require_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            error!(caller = %caller, security = true, "Owner capability denied");
            return Err(VeilError::NotOwner(caller));
        }
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn is_verified(&self, user: Address) -> bool {
        self.verified.is_set(&user)
    }

    #[must_use]
    pub fn is_settled(&self, order_id: &B256) -> bool {
        self.settled.is_set(order_id)
    }

    #[must_use]
    pub fn withdrawal(&self, user: Address, withdrawal_id: U256) -> Option<&WithdrawalRequest> {
        self.withdrawals.get(user, withdrawal_id)
    }

    #[must_use]
    pub fn custody_balance(&self, token: Address) -> U256 {
        self.ledger.balance_of(token, self.address)
    }

    #[must_use]
    pub fn fee_balance(&self) -> U256 {
        self.fee_balance
    }

    #[must_use]
    pub fn forwarder(&self) -> Address {
        self.forwarder
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    #[must_use]
    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut R {
        &mut self.router
    }

    /// Check custody against the journal for every token that has moved.
    pub fn verify_conservation(&self) -> Result<()> {
        for token in self.journal.tracked_tokens() {
            self.journal.verify(token, self.custody_balance(token))?;
        }
        Ok(())
    }
}

impl<L, R, V, S> ComplianceGate for VaultStateMachine<L, R, V, S>
where
    L: TokenLedger + Send + Sync,
    R: BridgeRouter + Send + Sync,
    V: FlagStore<Address> + Send + Sync,
    S: FlagStore<B256> + Send + Sync,
{
    fn is_verified(&self, address: Address) -> bool {
        self.verified.is_set(&address)
    }
}

fn require_positive(amount: U256) -> Result<()> {
    if amount.is_zero() {
        return Err(VeilError::InvalidAmount {
            reason: "amount must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use veilmatch_types::CrossChainSettleReport;

    use super::*;

    const CHAIN: u64 = 5_009_297_550_715_157_269;

    fn owner() -> Address {
        Address::repeat_byte(0x01)
    }
    fn forwarder() -> Address {
        Address::repeat_byte(0x02)
    }
    fn vault_addr() -> Address {
        Address::repeat_byte(0x03)
    }
    fn router_addr() -> Address {
        Address::repeat_byte(0x04)
    }
    fn rwa() -> Address {
        Address::repeat_byte(0xaa)
    }
    fn usdc() -> Address {
        Address::repeat_byte(0xcc)
    }
    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }
    fn bob() -> Address {
        Address::repeat_byte(0xb0)
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init();
    }

    fn vault() -> VaultStateMachine {
        init_tracing();
        let config = VaultConfig {
            owner: owner(),
            forwarder: forwarder(),
            vault_address: vault_addr(),
        };
        let mut ledger = MemoryLedger::new();
        for user in [alice(), bob()] {
            ledger.mint(rwa(), user, U256::from(1_000u64)).unwrap();
            ledger.mint(usdc(), user, U256::from(10_000u64)).unwrap();
        }
        let router = MemoryBridge::new(router_addr(), U256::from(7u64)).with_chain(CHAIN);
        VaultStateMachine::new(&config, ledger, router)
    }

    fn verify(vault: &mut VaultStateMachine, user: Address) {
        let report = SettlementReport::Verify { user }.encode();
        vault.on_report(forwarder(), &report).unwrap();
    }

    /// Both parties verified and funded: alice sells RWA, bob pays USDC.
    fn funded_vault() -> VaultStateMachine {
        let mut vault = vault();
        verify(&mut vault, alice());
        verify(&mut vault, bob());
        vault.fund(alice(), rwa(), U256::from(100u64)).unwrap();
        vault.fund(bob(), usdc(), U256::from(1_000u64)).unwrap();
        vault
    }

    fn settle_report(order_byte: u8) -> SettlementReport {
        SettlementReport::Settle(SettleReport {
            order_id: B256::repeat_byte(order_byte),
            stealth_buyer: Address::repeat_byte(0x5b),
            stealth_seller: Address::repeat_byte(0x55),
            token_a: rwa(),
            token_b: usdc(),
            amount_a: U256::from(60u64),
            amount_b: U256::from(600u64),
        })
    }

    fn cross_chain_report() -> CrossChainSettleReport {
        CrossChainSettleReport {
            order_id: B256::repeat_byte(0x77),
            dest_chain_selector: CHAIN,
            dest_receiver: Address::repeat_byte(0xde),
            buyer: Address::repeat_byte(0x5b),
            seller: Address::repeat_byte(0x55),
            token_usdc: usdc(),
            amount_usdc: U256::from(500u64),
            token_rwa: rwa(),
            amount_rwa: U256::from(5u64),
        }
    }

    #[test]
    fn fund_is_gated_on_verification() {
        let mut vault = vault();
        let amount = U256::from(10u64);
        assert_eq!(
            vault.fund(alice(), rwa(), amount).unwrap_err(),
            VeilError::NotVerified(alice())
        );
        assert_eq!(vault.custody_balance(rwa()), U256::ZERO);

        verify(&mut vault, alice());
        vault.fund(alice(), rwa(), amount).unwrap();
        assert_eq!(vault.custody_balance(rwa()), amount);
    }

    #[test]
    fn verify_is_idempotent_and_monotonic() {
        let mut vault = vault();
        let report = SettlementReport::Verify { user: alice() }.encode();
        assert_eq!(
            vault.on_report(forwarder(), &report).unwrap(),
            ReportOutcome::Verified {
                user: alice(),
                newly_verified: true
            }
        );
        assert_eq!(
            vault.on_report(forwarder(), &report).unwrap(),
            ReportOutcome::Verified {
                user: alice(),
                newly_verified: false
            }
        );
        // Every other report kind, successful or not, leaves it verified.
        let _ = vault.on_report(forwarder(), &settle_report(1).encode());
        let _ = vault.on_report(
            forwarder(),
            &SettlementReport::Withdraw {
                user: alice(),
                withdrawal_id: U256::ZERO,
            }
            .encode(),
        );
        assert!(vault.is_verified(alice()));
        let verified_events = vault
            .events()
            .iter()
            .filter(|e| matches!(e, VaultEvent::Verified { .. }))
            .count();
        assert_eq!(verified_events, 1);
    }

    #[test]
    fn unauthorized_sender_changes_nothing() {
        let mut vault = funded_vault();
        let events_before = vault.events().len();
        let intruder = Address::repeat_byte(0x66);
        for report in [
            SettlementReport::Verify {
                user: Address::repeat_byte(0x99),
            },
            settle_report(1),
        ] {
            assert_eq!(
                vault.on_report(intruder, &report.encode()).unwrap_err(),
                VeilError::UnauthorizedSender(intruder)
            );
        }
        assert!(!vault.is_verified(Address::repeat_byte(0x99)));
        assert!(!vault.is_settled(&B256::repeat_byte(1)));
        assert_eq!(vault.custody_balance(rwa()), U256::from(100u64));
        assert_eq!(vault.custody_balance(usdc()), U256::from(1_000u64));
        assert_eq!(vault.events().len(), events_before);
    }

    #[test]
    fn settle_cannot_pay_the_vault() {
        let mut vault = funded_vault();
        let SettlementReport::Settle(mut settle) = settle_report(1) else {
            unreachable!()
        };
        settle.stealth_seller = vault_addr();
        let err = vault
            .on_report(forwarder(), &SettlementReport::Settle(settle).encode())
            .unwrap_err();
        assert!(matches!(err, VeilError::MalformedReport { .. }));
        assert!(!vault.is_settled(&B256::repeat_byte(1)));
        assert_eq!(vault.custody_balance(usdc()), U256::from(1_000u64));
        vault.verify_conservation().unwrap();
    }

    #[test]
    fn settle_pays_exactly_once() {
        let mut vault = funded_vault();
        let report = settle_report(1).encode();
        assert_eq!(
            vault.on_report(forwarder(), &report).unwrap(),
            ReportOutcome::Settled {
                order_id: B256::repeat_byte(1)
            }
        );
        let buyer = Address::repeat_byte(0x5b);
        let seller = Address::repeat_byte(0x55);
        assert_eq!(vault.ledger().balance_of(rwa(), buyer), U256::from(60u64));
        assert_eq!(vault.ledger().balance_of(usdc(), seller), U256::from(600u64));
        assert_eq!(vault.custody_balance(rwa()), U256::from(40u64));
        assert_eq!(vault.custody_balance(usdc()), U256::from(400u64));

        let err = vault.on_report(forwarder(), &report).unwrap_err();
        assert_eq!(err, VeilError::AlreadySettled(B256::repeat_byte(1)));
        assert!(err.is_success_equivalent());
        assert_eq!(vault.ledger().balance_of(rwa(), buyer), U256::from(60u64));
        assert_eq!(vault.custody_balance(usdc()), U256::from(400u64));
        vault.verify_conservation().unwrap();
    }

    #[test]
    fn settle_moves_only_the_two_legs() {
        let mut vault = funded_vault();
        let other = Address::repeat_byte(0xee);
        vault
            .ledger_mut()
            .mint(other, vault_addr(), U256::from(5u64))
            .unwrap();
        vault.on_report(forwarder(), &settle_report(1).encode()).unwrap();
        assert_eq!(vault.custody_balance(other), U256::from(5u64));
        assert_eq!(vault.ledger().balance_of(rwa(), alice()), U256::from(900u64));
        assert_eq!(vault.ledger().balance_of(usdc(), bob()), U256::from(9_000u64));
    }

    #[test]
    fn settle_beyond_custody_halts_and_stays_retriable() {
        let mut vault = vault();
        verify(&mut vault, alice());
        vault.fund(alice(), rwa(), U256::from(100u64)).unwrap();
        // No USDC in custody: the quote leg cannot be paid.
        let err = vault
            .on_report(forwarder(), &settle_report(2).encode())
            .unwrap_err();
        assert!(err.requires_halt());
        assert!(!vault.is_settled(&B256::repeat_byte(2)));
        assert_eq!(vault.custody_balance(rwa()), U256::from(100u64));
    }

    #[test]
    fn withdrawal_lifecycle() {
        let mut vault = funded_vault();
        let id = vault
            .request_withdrawal(alice(), rwa(), U256::from(30u64))
            .unwrap();
        assert_eq!(id, U256::ZERO);
        let claim = SettlementReport::Withdraw {
            user: alice(),
            withdrawal_id: id,
        }
        .encode();

        let bad = SettlementReport::Withdraw {
            user: alice(),
            withdrawal_id: U256::from(9u64),
        }
        .encode();
        assert!(matches!(
            vault.on_report(forwarder(), &bad),
            Err(VeilError::InvalidWithdrawalId { .. })
        ));

        vault.on_report(forwarder(), &claim).unwrap();
        assert_eq!(vault.ledger().balance_of(rwa(), alice()), U256::from(930u64));
        assert!(vault.withdrawal(alice(), id).unwrap().claimed);

        let err = vault.on_report(forwarder(), &claim).unwrap_err();
        assert!(matches!(err, VeilError::AlreadyClaimed { .. }));
        assert_eq!(vault.ledger().balance_of(rwa(), alice()), U256::from(930u64));
        vault.verify_conservation().unwrap();
    }

    #[test]
    fn withdrawal_beyond_custody_stays_unclaimed() {
        let mut vault = funded_vault();
        let id = vault
            .request_withdrawal(alice(), rwa(), U256::from(1_000u64))
            .unwrap();
        let claim = SettlementReport::Withdraw {
            user: alice(),
            withdrawal_id: id,
        }
        .encode();
        assert!(vault.on_report(forwarder(), &claim).is_err());
        assert!(!vault.withdrawal(alice(), id).unwrap().claimed);
    }

    #[test]
    fn cross_chain_needs_fee_balance() {
        let mut vault = funded_vault();
        let report = SettlementReport::CrossChainSettle(cross_chain_report()).encode();
        assert_eq!(
            vault.on_report(forwarder(), &report).unwrap_err(),
            VeilError::InsufficientFeeBalance {
                needed: U256::from(7u64),
                available: U256::ZERO
            }
        );
        assert!(!vault.is_settled(&B256::repeat_byte(0x77)));
        assert!(vault.router().outbox().is_empty());

        vault.deposit_fee_balance(owner(), U256::from(10u64)).unwrap();
        let outcome = vault.on_report(forwarder(), &report).unwrap();
        assert!(matches!(outcome, ReportOutcome::CrossChainDispatched { fee, .. } if fee == U256::from(7u64)));
        assert_eq!(vault.fee_balance(), U256::from(3u64));
        assert!(vault.is_settled(&B256::repeat_byte(0x77)));
        assert_eq!(vault.custody_balance(usdc()), U256::from(500u64));
        assert_eq!(
            vault.ledger().balance_of(usdc(), router_addr()),
            U256::from(500u64)
        );
        assert_eq!(vault.router().outbox().len(), 1);

        assert_eq!(
            vault.on_report(forwarder(), &report).unwrap_err(),
            VeilError::AlreadySettled(B256::repeat_byte(0x77))
        );
        assert_eq!(vault.fee_balance(), U256::from(3u64));
        vault.verify_conservation().unwrap();
    }

    #[test]
    fn failed_bridge_send_leaves_order_unsettled() {
        let mut vault = funded_vault();
        vault.deposit_fee_balance(owner(), U256::from(10u64)).unwrap();
        vault.router_mut().set_offline(true);
        let report = SettlementReport::CrossChainSettle(cross_chain_report()).encode();
        assert!(matches!(
            vault.on_report(forwarder(), &report),
            Err(VeilError::BridgeSendFailed { .. })
        ));
        assert!(!vault.is_settled(&B256::repeat_byte(0x77)));
        assert_eq!(vault.fee_balance(), U256::from(10u64));
        assert_eq!(vault.custody_balance(usdc()), U256::from(1_000u64));

        vault.router_mut().set_offline(false);
        vault.on_report(forwarder(), &report).unwrap();
        assert!(vault.is_settled(&B256::repeat_byte(0x77)));
    }

    #[test]
    fn cross_chain_and_settle_share_the_settled_set() {
        let mut vault = funded_vault();
        vault.deposit_fee_balance(owner(), U256::from(10u64)).unwrap();
        let report = SettlementReport::CrossChainSettle(cross_chain_report()).encode();
        vault.on_report(forwarder(), &report).unwrap();
        let same_id = settle_report(0x77).encode();
        assert_eq!(
            vault.on_report(forwarder(), &same_id).unwrap_err(),
            VeilError::AlreadySettled(B256::repeat_byte(0x77))
        );
    }

    #[test]
    fn owner_rotates_forwarder() {
        let mut vault = vault();
        let relay2 = Address::repeat_byte(0x22);
        assert_eq!(
            vault.set_forwarder(forwarder(), relay2).unwrap_err(),
            VeilError::NotOwner(forwarder())
        );
        vault.set_forwarder(owner(), relay2).unwrap();
        let report = SettlementReport::Verify { user: alice() }.encode();
        assert!(matches!(
            vault.on_report(forwarder(), &report),
            Err(VeilError::UnauthorizedSender(_))
        ));
        vault.on_report(relay2, &report).unwrap();
        assert!(vault.is_verified(alice()));
    }

    #[test]
    fn ownership_transfer_moves_capability() {
        let mut vault = vault();
        let next = Address::repeat_byte(0x0f);
        vault.transfer_ownership(owner(), next).unwrap();
        assert_eq!(vault.owner(), next);
        assert!(vault.set_forwarder(owner(), next).is_err());
        vault.set_forwarder(next, next).unwrap();
        assert_eq!(vault.forwarder(), next);
    }

    #[test]
    fn undecodable_reports_rejected_without_effect() {
        let mut vault = funded_vault();
        let before = vault.events().len();
        assert_eq!(
            vault.on_report(forwarder(), &[9u8; 33]).unwrap_err(),
            VeilError::UnknownReportTag(9)
        );
        let mut truncated = settle_report(1).encode();
        truncated.pop();
        assert!(matches!(
            vault.on_report(forwarder(), &truncated),
            Err(VeilError::MalformedReport { .. })
        ));
        assert_eq!(vault.events().len(), before);
    }

    #[test]
    fn zero_amounts_rejected() {
        let mut vault = vault();
        verify(&mut vault, alice());
        assert!(matches!(
            vault.fund(alice(), rwa(), U256::ZERO),
            Err(VeilError::InvalidAmount { .. })
        ));
        assert!(vault.request_withdrawal(alice(), rwa(), U256::ZERO).is_err());
        assert!(vault.deposit_fee_balance(alice(), U256::ZERO).is_err());
    }

    #[test]
    fn compliance_gate_reads_verified_set() {
        let mut vault = vault();
        assert!(!ComplianceGate::is_verified(&vault, alice()));
        verify(&mut vault, alice());
        assert!(ComplianceGate::is_verified(&vault, alice()));
    }
}
