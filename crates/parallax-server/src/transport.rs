//! HTTP transport: packet endpoint, crossdomain policy, home page.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::ServerError;

/// Content type for request and reply envelopes.
pub const PACKET_CONTENT_TYPE: &str = "application/x-parallax";

const DEFAULT_HOME: &str = "<!DOCTYPE html>\n<html>\n<head><title>parallax</title></head>\n<body>\n<h1>parallax remoting server</h1>\n<p>POST binary packets to the configured endpoint.</p>\n</body>\n</html>\n";

/// Shared transport state.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    crossdomain: Arc<str>,
}

/// Builds the HTTP router for a dispatcher.
pub fn build_router(dispatcher: Arc<Dispatcher>, config: &ServerConfig) -> Router {
    let state = AppState {
        dispatcher,
        crossdomain: Arc::from(config.crossdomain.as_str()),
    };

    let mut router = Router::new().route("/crossdomain.xml", get(crossdomain));

    // The packet endpoint may share "/" with the home page; axum merges
    // methods on the same path only within one route call.
    if config.path == "/" {
        let root = if config.default_home {
            get(home).post(handle_packet)
        } else {
            post(handle_packet)
        };
        router = router.route("/", root);
    } else {
        router = router.route(&config.path, post(handle_packet));
        if config.default_home {
            router = router.route("/", get(home));
        }
    }

    router.with_state(state)
}

/// Runs the HTTP server until the cancellation token fires.
pub async fn serve(
    dispatcher: Arc<Dispatcher>,
    config: ServerConfig,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let app = build_router(dispatcher, &config);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    info!(
        address = %config.bind_address,
        path = %config.path,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Packet endpoint: decode, dispatch, settle, encode the reply.
async fn handle_packet(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ServerError> {
    let dispatched = state.dispatcher.process_packet(&body).await?;
    let packet = dispatched.settle().await;
    let reply = state.dispatcher.encode_reply(&packet)?;

    Ok(([(header::CONTENT_TYPE, PACKET_CONTENT_TYPE)], reply))
}

/// Crossdomain policy endpoint.
async fn crossdomain(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/xml")],
        state.crossdomain.to_string(),
    )
}

/// Built-in home page.
async fn home() -> impl IntoResponse {
    Html(DEFAULT_HOME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parallax_proto::{PacketCodec, Value, WireCodec, WireMessage, WirePacket};
    use tower::ServiceExt;

    use crate::service::{HandlerError, Invocation, Service};

    struct EchoService;

    #[async_trait]
    impl Service for EchoService {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, call: Invocation) -> Result<Option<Value>, HandlerError> {
            Ok(call.arguments().first().cloned())
        }
    }

    fn test_router() -> Router {
        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.register_service(Arc::new(EchoService));
        build_router(dispatcher, &ServerConfig::default())
    }

    #[tokio::test]
    async fn malformed_packet_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from(vec![0u8; 4]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn packet_roundtrip_over_http() {
        let codec = WireCodec::default();
        let request_bytes = codec
            .encode_request(&WirePacket {
                messages: vec![WireMessage {
                    target_uri: "echo.say".to_owned(),
                    response_uri: "/1".to_owned(),
                    arguments: vec!["hello".into()],
                }],
            })
            .unwrap();

        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::CONTENT_TYPE, PACKET_CONTENT_TYPE)
                    .body(Body::from(request_bytes))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            PACKET_CONTENT_TYPE
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let reply = codec.decode(&body).unwrap();
        assert_eq!(reply.messages().len(), 1);
        assert_eq!(reply.messages()[0].target_uri(), "/1/onResult");
        assert_eq!(reply.messages()[0].arguments(), &["hello".into()]);
    }

    #[tokio::test]
    async fn crossdomain_policy_served_as_xml() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/crossdomain.xml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/xml"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("cross-domain-policy"));
    }

    #[tokio::test]
    async fn home_page_served_by_default() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn home_page_can_be_disabled() {
        let dispatcher = Arc::new(Dispatcher::new());
        let config = ServerConfig {
            default_home: false,
            ..Default::default()
        };
        let router = build_router(dispatcher, &config);

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn custom_packet_path() {
        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.register_service(Arc::new(EchoService));
        let config = ServerConfig {
            path: "/gateway".to_owned(),
            ..Default::default()
        };
        let router = build_router(dispatcher, &config);

        let codec = WireCodec::default();
        let request_bytes = codec
            .encode_request(&WirePacket { messages: vec![] })
            .unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/gateway")
                    .body(Body::from(request_bytes))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
