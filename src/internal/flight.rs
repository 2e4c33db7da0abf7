//! Per-identifier build locks.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::key::Key;

/// Serializes concurrent builds of one identifier on one injector.
///
/// A resolution holding the guard for a key is the only one building that key
/// on this node; later arrivals wait, then find the committed instance.
#[derive(Default)]
pub(crate) struct FlightTable {
    slots: Mutex<AHashMap<Key, Arc<AsyncMutex<()>>>>,
}

impl FlightTable {
    pub(crate) async fn acquire(&self, key: &Key) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(key.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }
}
