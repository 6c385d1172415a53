//! The packet dispatch pipeline.

use std::future::{poll_fn, Future};
use std::pin::pin;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use parallax_proto::{ClassAliasRegistry, Message, Packet, PacketCodec, WireCodec};

use crate::bus::{PacketBus, DEFAULT_BUS_CAPACITY};
use crate::error::ServerError;
use crate::middleware::{Advance, MiddlewareChain};
use crate::service::{Invocation, Service, ServiceRegistry};

/// The dispatch core: owns the service registry, middleware chain, and
/// notification bus, and drives decoded packets through the pipeline.
///
/// Pipeline per request: decode → middleware chain (strictly sequential) →
/// one packet-ready bus event → per-message resolution and invocation.
/// Handler invocations run as independent tasks that begin in message order;
/// the dispatcher never waits for one message's handler to finish before the
/// next begins, and a handler failure is isolated to its message.
pub struct Dispatcher {
    services: ServiceRegistry,
    middleware: MiddlewareChain,
    bus: PacketBus,
    codec: Arc<dyn PacketCodec>,
    aliases: Arc<ClassAliasRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default wire codec and bus capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bus_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Creates a dispatcher with the default wire codec and the given bus
    /// capacity.
    #[must_use]
    pub fn with_bus_capacity(capacity: usize) -> Self {
        let aliases = Arc::new(ClassAliasRegistry::new());
        Self {
            services: ServiceRegistry::new(),
            middleware: MiddlewareChain::new(),
            bus: PacketBus::new(capacity),
            codec: Arc::new(WireCodec::new(Arc::clone(&aliases))),
            aliases,
        }
    }

    /// Creates a dispatcher over a custom codec implementation.
    #[must_use]
    pub fn with_codec(codec: Arc<dyn PacketCodec>) -> Self {
        Self {
            services: ServiceRegistry::new(),
            middleware: MiddlewareChain::new(),
            bus: PacketBus::default(),
            codec,
            aliases: Arc::new(ClassAliasRegistry::new()),
        }
    }

    /// Registers a service under its own name (last-write-wins).
    pub fn register_service(&self, service: Arc<dyn Service>) {
        self.services.register(service);
    }

    /// Appends a middleware entry; entries run in registration order.
    pub fn use_middleware<F>(&self, middleware: F)
    where
        F: Fn(Arc<Packet>, Advance) + Send + Sync + 'static,
    {
        self.middleware.push(middleware);
    }

    /// Subscribes to packet-ready events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Arc<Packet>> {
        self.bus.subscribe()
    }

    /// Registers a class alias with the default codec's alias registry.
    pub fn register_class_alias(&self, alias: impl Into<String>) {
        self.aliases.register(alias);
    }

    /// The alias registry consulted by the default codec.
    #[must_use]
    pub fn aliases(&self) -> &Arc<ClassAliasRegistry> {
        &self.aliases
    }

    /// The service registry.
    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Decodes raw request bytes and dispatches the packet.
    ///
    /// A decode failure aborts the whole request before dispatch begins and
    /// is the only error surfaced to the transport.
    pub async fn process_packet(&self, bytes: &[u8]) -> Result<DispatchedPacket, ServerError> {
        let packet = Arc::new(self.codec.decode(bytes)?);
        Ok(self.dispatch(packet).await)
    }

    /// Dispatches an already-decoded packet: runs the middleware chain,
    /// publishes the packet-ready event, and fires each message's handler.
    pub async fn dispatch(&self, packet: Arc<Packet>) -> DispatchedPacket {
        self.middleware.run(&packet).await;

        let reached = self.bus.publish(Arc::clone(&packet));
        debug!(
            messages = packet.messages().len(),
            subscribers = reached,
            "Packet ready"
        );

        // Each handler task carries a baton from its predecessor: it begins
        // polling only after the previous handler's first poll, so
        // invocations start in message order on any runtime flavour while
        // completions stay independent.
        let mut handlers = Vec::new();
        let mut baton: Option<oneshot::Receiver<()>> = None;
        for message in packet.messages() {
            let target = message.target();

            let Some(service) = self.services.resolve(target.namespace()) else {
                // Unresolvable targets are dropped, not rejected: no error,
                // no response, and later messages still dispatch.
                debug!(target = %message.target_uri(), "No service for target; message skipped");
                continue;
            };

            let (started_tx, started_rx) = oneshot::channel();
            let predecessor = baton.replace(started_rx);
            handlers.push(tokio::spawn(start_after(
                predecessor,
                started_tx,
                invoke(
                    service,
                    target.method().to_owned(),
                    Arc::clone(message),
                    Arc::clone(&packet),
                ),
            )));
        }

        DispatchedPacket { packet, handlers }
    }

    /// Encodes the reply envelope for a dispatched packet.
    pub fn encode_reply(&self, packet: &Packet) -> Result<Vec<u8>, ServerError> {
        Ok(self.codec.encode_reply(packet)?)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("services", &self.services)
            .field("middleware", &self.middleware)
            .field("subscribers", &self.bus.subscriber_count())
            .finish()
    }
}

/// A packet whose handlers have been fired.
///
/// The dispatch core never awaits handler completion; the transport calls
/// [`settle`](Self::settle) before encoding the reply so every response
/// slot has had its chance to be written.
#[derive(Debug)]
pub struct DispatchedPacket {
    packet: Arc<Packet>,
    handlers: Vec<JoinHandle<()>>,
}

impl DispatchedPacket {
    /// The dispatched packet.
    #[must_use]
    pub fn packet(&self) -> &Arc<Packet> {
        &self.packet
    }

    /// The number of handler invocations fired.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.handlers.len()
    }

    /// Awaits every fired handler, then returns the packet. A panicking
    /// handler is logged and does not affect its siblings.
    pub async fn settle(self) -> Arc<Packet> {
        for handle in self.handlers {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!(error = %e, "Handler task panicked");
                }
            }
        }
        self.packet
    }
}

/// Runs a handler future after its predecessor has begun, signalling its
/// own start once its first poll returns.
async fn start_after(
    predecessor: Option<oneshot::Receiver<()>>,
    started: oneshot::Sender<()>,
    handler: impl Future<Output = ()>,
) {
    if let Some(predecessor) = predecessor {
        // A predecessor that panics before signalling drops its sender; the
        // receive error still releases this message.
        let _ = predecessor.await;
    }

    let mut handler = pin!(handler);
    let mut started = Some(started);
    poll_fn(move |cx| {
        let poll = handler.as_mut().poll(cx);
        if let Some(started) = started.take() {
            let _ = started.send(());
        }
        poll
    })
    .await;
}

async fn invoke(
    service: Arc<dyn Service>,
    method: String,
    message: Arc<Message>,
    packet: Arc<Packet>,
) {
    let service_name = service.name().to_owned();
    let call = Invocation::new(method.clone(), Arc::clone(&message), packet);

    match service.invoke(call).await {
        Ok(Some(value)) => {
            // Implicit response: wired back unless the handler already
            // responded explicitly.
            message.respond(value);
        }
        Ok(None) => {}
        Err(e) => {
            warn!(
                service = %service_name,
                method = %method,
                error = %e,
                "Handler failed"
            );
        }
    }
}
