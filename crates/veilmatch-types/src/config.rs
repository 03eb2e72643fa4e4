//! Configuration for the engine, the relay, and the vault authority.
//!
//! Every section deserializes from JSON; missing relay knobs fall back to the
//! defaults in [`crate::constants`].

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{PairId, Result, VeilError, constants};

/// One tradable pair and the on-chain tokens behind its two legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairConfig {
    pub pair_id: PairId,
    /// Token delivered to the buyer.
    pub base_token: Address,
    /// Token delivered to the seller.
    pub quote_token: Address,
}

/// Matching engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pairs: Vec<PairConfig>,
}

impl EngineConfig {
    /// Look up a pair by id.
    #[must_use]
    pub fn pair(&self, pair_id: &PairId) -> Option<&PairConfig> {
        self.pairs.iter().find(|p| &p.pair_id == pair_id)
    }

    /// Reject empty configurations and duplicate pair ids.
    pub fn validate(&self) -> Result<()> {
        if self.pairs.is_empty() {
            return Err(VeilError::Configuration("no pairs configured".to_string()));
        }
        for (i, pair) in self.pairs.iter().enumerate() {
            if self.pairs[..i].iter().any(|p| p.pair_id == pair.pair_id) {
                return Err(VeilError::Configuration(format!(
                    "duplicate pair {}",
                    pair.pair_id
                )));
            }
            if pair.base_token == pair.quote_token {
                return Err(VeilError::Configuration(format!(
                    "pair {} uses the same token on both legs",
                    pair.pair_id
                )));
            }
        }
        Ok(())
    }
}

/// Report submission behaviour: per-attempt timeout and bounded backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub submit_timeout_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            submit_timeout_ms: constants::DEFAULT_SUBMIT_TIMEOUT_MS,
            max_attempts: constants::DEFAULT_MAX_SUBMIT_ATTEMPTS,
            initial_backoff_ms: constants::DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: constants::DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(VeilError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.submit_timeout_ms == 0 {
            return Err(VeilError::Configuration(
                "submit_timeout_ms must be positive".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(VeilError::Configuration(format!(
                "initial_backoff_ms {} exceeds max_backoff_ms {}",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Deployment parameters of the vault authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Administrative owner; may rotate the forwarder and transfer ownership.
    pub owner: Address,
    /// The only sender whose reports are accepted.
    pub forwarder: Address,
    /// The vault's own address, used as the custody account in the ledger.
    pub vault_address: Address,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VeilConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    pub vault: VaultConfig,
}

impl VeilConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VeilError::Configuration(format!("invalid config: {e}")))?;
        config.engine.validate()?;
        config.relay.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "engine": {
            "pairs": [{
                "pair_id": "RWA-USDC",
                "base_token": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "quote_token": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
            }]
        },
        "relay": { "max_attempts": 3 },
        "vault": {
            "owner": "0x1111111111111111111111111111111111111111",
            "forwarder": "0x2222222222222222222222222222222222222222",
            "vault_address": "0x3333333333333333333333333333333333333333"
        }
    }"#;

    #[test]
    fn parses_sample_with_relay_defaults() {
        let cfg = VeilConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(cfg.engine.pairs.len(), 1);
        assert_eq!(cfg.relay.max_attempts, 3);
        assert_eq!(
            cfg.relay.submit_timeout_ms,
            constants::DEFAULT_SUBMIT_TIMEOUT_MS
        );
        assert_eq!(cfg.vault.forwarder, Address::repeat_byte(0x22));
        let pair = cfg.engine.pair(&PairId::new("RWA-USDC")).unwrap();
        assert_eq!(pair.base_token, Address::repeat_byte(0xaa));
    }

    #[test]
    fn rejects_duplicate_pairs() {
        let pair = PairConfig {
            pair_id: PairId::new("RWA-USDC"),
            base_token: Address::repeat_byte(1),
            quote_token: Address::repeat_byte(2),
        };
        let cfg = EngineConfig {
            pairs: vec![pair.clone(), pair],
        };
        assert!(matches!(cfg.validate(), Err(VeilError::Configuration(_))));
    }

    #[test]
    fn rejects_zero_attempts() {
        let relay = RelayConfig {
            max_attempts: 0,
            ..RelayConfig::default()
        };
        assert!(relay.validate().is_err());
        assert!(RelayConfig::default().validate().is_ok());
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        assert!(matches!(
            VeilConfig::from_json_str("{"),
            Err(VeilError::Configuration(_))
        ));
    }
}
