//! Packet dispatch server for the parallax remoting protocol.
//!
//! The server receives binary envelopes ("packets") over HTTP, runs each
//! decoded packet through an ordered middleware chain, publishes a
//! packet-ready event, and routes every message inside the packet to a
//! registered [`Service`] by splitting its `namespace.method` target.
//! Handler results are collected into a reply envelope of the same format.
//!
//! ```no_run
//! use std::sync::Arc;
//! use parallax_server::{Dispatcher, ServerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(service: Arc<dyn parallax_server::Service>) -> Result<(), parallax_server::ServerError> {
//! let dispatcher = Arc::new(Dispatcher::new());
//! dispatcher.register_service(service);
//! dispatcher.use_middleware(|packet, advance| {
//!     packet.set_scratch("seen", true.into());
//!     advance.advance();
//! });
//!
//! parallax_server::serve(dispatcher, ServerConfig::default(), CancellationToken::new()).await
//! # }
//! ```

mod bus;
mod config;
mod dispatch;
mod error;
mod middleware;
mod service;
mod transport;

pub use bus::{PacketBus, DEFAULT_BUS_CAPACITY};
pub use config::{ConfigError, ServerConfig};
pub use dispatch::{DispatchedPacket, Dispatcher};
pub use error::ServerError;
pub use middleware::{Advance, MiddlewareChain, MiddlewareFn};
pub use service::{HandlerError, Invocation, Service, ServiceRegistry};
pub use transport::{build_router, serve, PACKET_CONTENT_TYPE};
