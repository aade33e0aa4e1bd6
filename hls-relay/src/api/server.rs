//! API server setup and configuration.

use axum::Router;
use axum::extract::Request;
use axum::response::Response;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, MakeSpan, OnFailure,
    OnRequest, OnResponse, TraceLayer,
};
use tracing::{Level, Span};

use relay_engine::Relay;

use crate::api::routes;
use crate::api::routes::health::SELF_CHECK_PATH;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::monitor::SelfCheckMonitor;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Playlist relay shared by all requests
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }
}

/// API server.
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    /// Create a new API server.
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone());

        // Add CORS if enabled
        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        with_request_tracing(router)
    }

    /// Start the server.
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| crate::error::Error::ApiError(format!("Invalid address: {}", e)))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("API server listening on http://{}", local_addr);

        if !self.config.self_check_interval.is_zero() {
            let check_url = format!("http://{}{}", self_check_addr(local_addr), SELF_CHECK_PATH);
            SelfCheckMonitor::new(
                check_url,
                self.config.self_check_interval,
                self.config.self_check_timeout,
            )?
            .start(self.cancel_token.child_token());
        }

        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await
            .map_err(|e| crate::error::Error::ApiError(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

/// Traces each request at `INFO`; failures at `ERROR`. Self-check polls get a
/// disabled span, which every callback below skips.
fn with_request_tracing(router: Router) -> Router {
    let layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            if is_self_check(req) {
                return Span::none();
            }
            DefaultMakeSpan::new().level(Level::INFO).make_span(req)
        })
        .on_request(|req: &Request, span: &Span| {
            if !span.is_disabled() {
                DefaultOnRequest::new().level(Level::INFO).on_request(req, span);
            }
        })
        .on_response(|res: &Response, latency: Duration, span: &Span| {
            if !span.is_disabled() {
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .on_response(res, latency, span);
            }
        })
        .on_failure(
            |class: ServerErrorsFailureClass, latency: Duration, span: &Span| {
                if !span.is_disabled() {
                    DefaultOnFailure::new()
                        .level(Level::ERROR)
                        .on_failure(class, latency, span);
                }
            },
        );

    router.layer(layer)
}

/// Self-check polling is frequent; its requests get no trace span.
fn is_self_check(req: &Request) -> bool {
    req.uri().path() == SELF_CHECK_PATH
}

/// Address the server uses to reach itself; wildcard binds map to loopback.
fn self_check_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(v4) if v4.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(v6) if v6.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_engine::RelayConfig;

    fn state() -> AppState {
        let relay = Relay::with_http(RelayConfig::default()).unwrap();
        AppState::new(Arc::new(relay))
    }

    #[test]
    fn self_check_requests_are_recognised() {
        let poll = axum::http::Request::builder()
            .uri("/self-check?x=1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(is_self_check(&poll));

        let stream = axum::http::Request::builder()
            .uri("/get_best_stream")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(!is_self_check(&stream));
    }

    #[test]
    fn test_server_creation() {
        let server = ApiServer::new(ServerConfig::default(), state());

        // Server should have a valid cancel token
        let token = server.cancel_token();
        assert!(!token.is_cancelled());
        server.shutdown();
        assert!(token.is_cancelled());
    }

    #[test]
    fn wildcard_bind_checks_loopback() {
        let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        assert_eq!(self_check_addr(addr), "127.0.0.1:8080".parse().unwrap());

        let addr: SocketAddr = "[::]:9000".parse().unwrap();
        assert_eq!(self_check_addr(addr), "[::1]:9000".parse().unwrap());

        let addr: SocketAddr = "10.1.2.3:80".parse().unwrap();
        assert_eq!(self_check_addr(addr), addr);
    }
}
