//! Single-Flight Module
//!
//! Per-key gates that serialize concurrent cache misses so only one caller
//! runs the creation function for a key at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

// == Flight Group ==
/// Table of in-flight keys.
///
/// Gates are created on first use and removed once no caller holds or awaits
/// them.
#[derive(Debug, Default)]
pub struct FlightGroup {
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FlightGroup {
    pub fn new() -> Self {
        Self::default()
    }

    // == Acquire ==
    /// Waits until no other caller holds the gate for `key`, then holds it
    /// until the returned guard is dropped.
    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            gates.entry(key.to_string()).or_default().clone()
        };

        let held = gate.clone().lock_owned().await;

        FlightGuard {
            group: self,
            key: key.to_string(),
            gate,
            held: Some(held),
        }
    }

    /// Returns the number of keys with a live gate.
    pub fn in_flight(&self) -> usize {
        self.gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

// == Flight Guard ==
/// Exclusive hold on one key's gate.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    group: &'a FlightGroup,
    key: String,
    gate: Arc<AsyncMutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Release before counting so the guard's own reference is gone.
        self.held.take();

        let mut gates = self
            .group
            .gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // One reference in the table, one in this guard: nobody else waits.
        if Arc::strong_count(&self.gate) == 2 {
            gates.remove(&self.key);
        }
    }
}
