//! Packet-ready notification bus.

use std::sync::Arc;

use tokio::sync::broadcast;

use parallax_proto::Packet;

/// Default subscriber channel capacity.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Fire-and-forget publish/subscribe channel for fully middleware-processed
/// packets.
///
/// Publishing never blocks: a subscriber that falls behind lags and drops
/// the oldest events rather than delaying dispatch. Subscribe before
/// traffic begins to observe every packet; drop the receiver on teardown.
#[derive(Debug)]
pub struct PacketBus {
    tx: broadcast::Sender<Arc<Packet>>,
}

impl PacketBus {
    /// Creates a bus whose subscribers buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribes to packet-ready events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Packet>> {
        self.tx.subscribe()
    }

    /// Publishes a packet-ready event, returning the number of subscribers
    /// it reached. With no subscribers the event is dropped.
    pub fn publish(&self, packet: Arc<Packet>) -> usize {
        self.tx.send(packet).unwrap_or(0)
    }

    /// The number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PacketBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
