//! Per-room publish/subscribe.

use std::collections::HashMap;

use bingohall_protocol::{RoomEvent, RoomId};
use tokio::sync::{broadcast, Mutex};

/// One broadcast channel per room, created on first subscribe.
///
/// Publishing never waits: with no subscribers the event is dropped, and
/// a subscriber that falls more than `capacity` events behind sees
/// `RecvError::Lagged` and carries on from the oldest retained event.
pub(crate) struct EventBus {
    capacity: usize,
    channels: Mutex<HashMap<RoomId, broadcast::Sender<RoomEvent>>>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn subscribe(
        &self,
        room_id: RoomId,
    ) -> broadcast::Receiver<RoomEvent> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub(crate) async fn publish(&self, event: RoomEvent) {
        let room_id = event.room_id();
        let mut channels = self.channels.lock().await;
        let Some(tx) = channels.get(&room_id) else {
            return;
        };
        if tx.send(event).is_err() {
            // Everyone unsubscribed.
            channels.remove(&room_id);
        }
    }

    /// Drops the room's channel. Receivers see `RecvError::Closed` once
    /// they have drained what was already sent.
    pub(crate) async fn close(&self, room_id: RoomId) {
        self.channels.lock().await.remove(&room_id);
    }
}
