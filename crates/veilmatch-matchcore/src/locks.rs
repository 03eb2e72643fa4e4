//! Per-pair serialization of matching.
//!
//! Two match attempts on the same pair never interleave; different pairs
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use veilmatch_types::{PairId, Result, VeilError};

#[derive(Debug, Default)]
pub struct PairLocks {
    locks: Mutex<HashMap<PairId, Arc<Mutex<()>>>>,
}

impl PairLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `pair_id`, created on first use. Callers hold the
    /// returned mutex's guard for the whole matching loop.
    pub fn handle(&self, pair_id: &PairId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| VeilError::Internal("pair lock table poisoned".to_string()))?;
        Ok(Arc::clone(locks.entry(pair_id.clone()).or_default()))
    }
}
