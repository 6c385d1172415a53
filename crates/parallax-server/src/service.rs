//! Service trait, invocation context, and the service registry.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};

use parallax_proto::{Message, Packet, Value};

/// Errors raised inside a service method.
///
/// Handler errors are isolated to the message that triggered them: the
/// dispatcher logs them and carries on with the packet's remaining
/// messages. They never abort the request.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The service has no method with the requested name.
    #[error("service '{service}' has no method '{method}'")]
    UnknownMethod { service: String, method: String },

    /// The handler failed.
    #[error("handler failed: {0}")]
    Failed(String),

    /// Arbitrary handler error.
    #[error("{0}")]
    Custom(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The call context handed to a service method.
///
/// Carries the resolved method name, the owning message (arguments and the
/// response slot), and the packet the message arrived in (for scratch-map
/// access).
#[derive(Debug, Clone)]
pub struct Invocation {
    method: String,
    message: Arc<Message>,
    packet: Arc<Packet>,
}

impl Invocation {
    /// Creates an invocation context.
    #[must_use]
    pub fn new(method: impl Into<String>, message: Arc<Message>, packet: Arc<Packet>) -> Self {
        Self {
            method: method.into(),
            message,
            packet,
        }
    }

    /// The method name (final segment of the target identifier).
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The call arguments in wire order.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        self.message.arguments()
    }

    /// The message being dispatched.
    #[must_use]
    pub fn message(&self) -> &Arc<Message> {
        &self.message
    }

    /// The packet the message arrived in.
    #[must_use]
    pub fn packet(&self) -> &Arc<Packet> {
        &self.packet
    }
}

/// A named collection of invocable methods reachable via target identifiers.
///
/// A service method may answer in two ways: return `Ok(Some(value))` and let
/// the dispatcher wire the value into the message's response slot, or call
/// [`Message::respond`] itself and return `Ok(None)`. If a handler does
/// both, the explicit response wins (the slot is single-use).
#[async_trait]
pub trait Service: Send + Sync {
    /// The namespace this service is registered under.
    fn name(&self) -> &str;

    /// Invokes a method on this service.
    ///
    /// Implementations should return [`HandlerError::UnknownMethod`] for
    /// method names they do not expose.
    async fn invoke(&self, call: Invocation) -> Result<Option<Value>, HandlerError>;
}

/// Mapping from namespace to service.
///
/// Registration is last-write-wins: registering a second service under the
/// same name silently replaces the first. Resolution clones the `Arc`, so
/// an in-flight dispatch keeps the service it resolved even if the registry
/// is mutated afterwards.
#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<String, Arc<dyn Service>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under its own name.
    pub fn register(&self, service: Arc<dyn Service>) {
        let name = service.name().to_owned();
        if self.services.insert(name.clone(), service).is_some() {
            debug!(service = %name, "Service replaced");
        } else {
            info!(service = %name, "Service registered");
        }
    }

    /// Resolves a namespace to its service, if registered.
    #[must_use]
    pub fn resolve(&self, namespace: &str) -> Option<Arc<dyn Service>> {
        self.services.get(namespace).map(|entry| entry.value().clone())
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Registered namespaces, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}
