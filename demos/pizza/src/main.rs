//! Demo remoting server.
//!
//! Registers a `pizza` service with `order` and `cancel` methods, two
//! scratch-map middleware, and a packet-ready subscriber, then serves
//! until Ctrl+C or SIGTERM.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use parallax_proto::Value;
use parallax_server::{
    Dispatcher, HandlerError, Invocation, ServerConfig, ServerError, Service,
};

/// Pizza ordering service.
///
/// `order` expects a `Pizza`-tagged object with a `toppings` array and
/// responds through the message explicitly; `cancel` takes an order id and
/// lets the dispatcher wire its return value back implicitly.
struct PizzaService;

#[async_trait]
impl Service for PizzaService {
    fn name(&self) -> &str {
        "pizza"
    }

    async fn invoke(&self, call: Invocation) -> Result<Option<Value>, HandlerError> {
        match call.method() {
            "order" => {
                let toppings: Vec<&str> = call
                    .arguments()
                    .first()
                    .and_then(|pizza| pizza.field("toppings"))
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();

                call.message().respond(
                    format!(
                        "Successfully created order with toppings {}.",
                        toppings.join(", ")
                    )
                    .into(),
                );
                Ok(None)
            }
            "cancel" => {
                let id = call
                    .arguments()
                    .first()
                    .and_then(Value::as_f64)
                    .ok_or_else(|| HandlerError::Failed("missing order id".into()))?;
                Ok(Some(format!("Cancelled order for pizza {id}.").into()))
            }
            method => Err(HandlerError::UnknownMethod {
                service: self.name().to_owned(),
                method: method.to_owned(),
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config();
    info!(
        bind_address = %config.bind_address,
        path = %config.path,
        "Configuration loaded"
    );

    let dispatcher = Arc::new(Dispatcher::with_bus_capacity(config.bus_capacity));

    dispatcher.register_class_alias("Pizza");
    dispatcher.register_service(Arc::new(PizzaService));

    dispatcher.use_middleware(|packet, advance| {
        packet.set_scratch("tags", Value::Array(vec![]));
        advance.advance();
    });
    dispatcher.use_middleware(|packet, advance| {
        packet.update_scratch("tags", |value| {
            if let Value::Array(items) = value {
                items.push("demo".into());
            }
        });
        advance.advance();
    });

    // Observe fully-processed packets off the dispatch path.
    let mut events = dispatcher.subscribe();
    tokio::spawn(async move {
        while let Ok(packet) = events.recv().await {
            info!(
                messages = packet.messages().len(),
                tags = ?packet.scratch("tags"),
                "Packet processed"
            );
        }
    });

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, initiating graceful shutdown");
        cancel_on_signal.cancel();
    });

    parallax_server::serve(dispatcher, config, cancel).await
}

fn load_config() -> ServerConfig {
    match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            info!(error = %e, "Failed to load parallax.toml, using default configuration");
            ServerConfig::default()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C");
        }
        () = terminate => {
            info!("Received SIGTERM");
        }
    }
}
