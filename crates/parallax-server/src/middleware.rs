//! Sequential middleware chain with a single-shot advance contract.

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::oneshot;
use tracing::error;

use parallax_proto::Packet;

/// A middleware entry: receives the shared packet and an [`Advance`] token
/// it must fire exactly once for the chain to proceed.
pub type MiddlewareFn = Arc<dyn Fn(Arc<Packet>, Advance) + Send + Sync>;

/// Single-shot completion token handed to each middleware entry.
///
/// The token is idempotent: only the first [`advance`](Self::advance) call
/// has effect. It is cheap to clone and may be moved into spawned tasks, so
/// an entry can do asynchronous work before advancing.
#[derive(Clone)]
pub struct Advance {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl Advance {
    fn new(tx: oneshot::Sender<()>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Signals that this middleware entry has finished. Later calls are
    /// no-ops.
    pub fn advance(&self) {
        let sender = self.tx.lock().ok().and_then(|mut slot| slot.take());
        if let Some(tx) = sender {
            let _ = tx.send(());
        }
    }
}

/// Ordered sequence of middleware, executed strictly sequentially.
///
/// Entry *n+1* does not begin until entry *n* has advanced, so scratch-map
/// mutations are deterministic even when entries do asynchronous work
/// internally. An entry that never advances stalls that packet's processing
/// forever; no timeout is imposed.
#[derive(Default)]
pub struct MiddlewareChain {
    entries: RwLock<Vec<MiddlewareFn>>,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware entry. Entries run in registration order.
    pub fn push<F>(&self, middleware: F)
    where
        F: Fn(Arc<Packet>, Advance) + Send + Sync + 'static,
    {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(Arc::new(middleware));
        }
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true if no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every entry over the packet, in order, to completion.
    ///
    /// The entry set is snapshotted up front, so registrations made while a
    /// packet is in flight do not affect it.
    pub async fn run(&self, packet: &Arc<Packet>) {
        let entries: Vec<MiddlewareFn> = match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(_) => return,
        };

        for (index, entry) in entries.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            entry(Arc::clone(packet), Advance::new(tx));

            if rx.await.is_err() {
                // The entry dropped its token without advancing. The
                // contract says the chain never completes; park here so the
                // stall is at least observable.
                error!(
                    middleware = index,
                    "Middleware dropped its advance token without firing; packet stalled"
                );
                std::future::pending::<()>().await;
            }
        }
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallax_proto::Value;
    use std::time::Duration;

    #[tokio::test]
    async fn entries_run_in_registration_order() {
        let chain = MiddlewareChain::new();
        chain.push(|packet, advance| {
            packet.set_scratch("tag", Value::Array(vec![]));
            advance.advance();
        });
        chain.push(|packet, advance| {
            packet.update_scratch("tag", |value| {
                if let Value::Array(items) = value {
                    items.push("x".into());
                }
            });
            advance.advance();
        });

        let packet = Arc::new(Packet::default());
        chain.run(&packet).await;

        assert_eq!(packet.scratch("tag"), Some(Value::Array(vec!["x".into()])));
    }

    #[tokio::test]
    async fn later_entry_waits_for_async_predecessor() {
        let chain = MiddlewareChain::new();
        chain.push(|packet, advance| {
            // Advance from a spawned task after a delay; the second entry
            // must still observe the mutation.
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                packet.set_scratch("seen", Value::Bool(true));
                advance.advance();
            });
        });
        chain.push(|packet, advance| {
            assert_eq!(packet.scratch("seen"), Some(Value::Bool(true)));
            packet.set_scratch("order_ok", Value::Bool(true));
            advance.advance();
        });

        let packet = Arc::new(Packet::default());
        chain.run(&packet).await;

        assert_eq!(packet.scratch("order_ok"), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn double_advance_is_idempotent() {
        let chain = MiddlewareChain::new();
        chain.push(|_, advance| {
            advance.advance();
            advance.advance();
        });
        chain.push(|packet, advance| {
            packet.set_scratch("ran", Value::Bool(true));
            advance.advance();
        });

        let packet = Arc::new(Packet::default());
        chain.run(&packet).await;

        assert_eq!(packet.scratch("ran"), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn dropped_token_stalls_the_chain() {
        let chain = MiddlewareChain::new();
        chain.push(|_, _advance| {
            // Token dropped without advancing.
        });
        chain.push(|packet, advance| {
            packet.set_scratch("unreachable", Value::Bool(true));
            advance.advance();
        });

        let packet = Arc::new(Packet::default());
        let stalled = tokio::time::timeout(Duration::from_millis(50), chain.run(&packet)).await;

        assert!(stalled.is_err());
        assert_eq!(packet.scratch("unreachable"), None);
    }

    #[tokio::test]
    async fn empty_chain_completes_immediately() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());

        let packet = Arc::new(Packet::default());
        chain.run(&packet).await;
    }
}
