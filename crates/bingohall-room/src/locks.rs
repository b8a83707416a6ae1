//! Per-room mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use bingohall_protocol::RoomId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one async mutex per room.
///
/// Every mutating engine operation holds its room's guard from first
/// read to last write, so operations on one room run one at a time while
/// different rooms never contend.
#[derive(Default)]
pub(crate) struct RoomLocks {
    locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
}

impl RoomLocks {
    pub(crate) async fn lock(&self, room_id: RoomId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(room_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Forgets a deleted room. Callers already waiting on its mutex still
    /// get it and then find the room gone.
    pub(crate) async fn forget(&self, room_id: RoomId) {
        self.locks.lock().await.remove(&room_id);
    }
}
