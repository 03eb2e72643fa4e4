//! Stealth announcements.
//!
//! A stealth address is useless to its owner until they learn the
//! ephemeral key behind it. After a settlement confirms, one announcement
//! per leg is published; recipients scan the board with their spending
//! secret and recover the one-time keys that belong to them.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use veilmatch_stealth::{SpendingSecret, StealthSecret, scan};
use veilmatch_types::{Result, SettlementId, StealthLeg, VeilError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealthAnnouncement {
    pub settlement_id: SettlementId,
    pub leg: StealthLeg,
}

#[async_trait]
pub trait AnnouncementSink: Send + Sync {
    /// Publish one announcement. Publishing the same announcement twice
    /// must not create a second entry.
    async fn publish(&self, announcement: StealthAnnouncement) -> Result<()>;
}

/// In-memory announcement board.
#[derive(Debug, Default)]
pub struct MemoryAnnouncementBoard {
    entries: Mutex<Vec<StealthAnnouncement>>,
}

impl MemoryAnnouncementBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Result<Vec<StealthAnnouncement>> {
        Ok(self.lock()?.clone())
    }

    /// Every published stealth key that belongs to `secret`. Malformed
    /// announcements are skipped.
    pub fn scan_for(&self, secret: &SpendingSecret) -> Result<Vec<StealthSecret>> {
        let entries = self.snapshot()?;
        let mut found = Vec::new();
        for announcement in &entries {
            match scan(secret, &announcement.leg) {
                Ok(Some(key)) => found.push(key),
                Ok(None) => {}
                Err(e) => warn!(
                    settlement = %announcement.settlement_id,
                    stealth_address = %announcement.leg.stealth_address,
                    error = %e,
                    "Skipping unreadable announcement"
                ),
            }
        }
        Ok(found)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StealthAnnouncement>>> {
        self.entries
            .lock()
            .map_err(|_| VeilError::Internal("announcement board lock poisoned".to_string()))
    }
}

#[async_trait]
impl AnnouncementSink for MemoryAnnouncementBoard {
    async fn publish(&self, announcement: StealthAnnouncement) -> Result<()> {
        let mut entries = self.lock()?;
        if !entries.contains(&announcement) {
            entries.push(announcement);
        }
        Ok(())
    }
}
