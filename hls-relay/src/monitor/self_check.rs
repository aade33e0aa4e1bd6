//! Periodic self-check against the server's own `/self-check` route.
//!
//! A failed probe is logged and never stops the process.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::models::SelfCheckResponse;
use crate::error::{Error, Result};

/// Probes the server over HTTP on a fixed interval.
pub struct SelfCheckMonitor {
    client: reqwest::Client,
    url: String,
    interval: Duration,
}

impl SelfCheckMonitor {
    /// Create a monitor probing `url` every `interval`, each probe bounded by `timeout`.
    pub fn new(url: impl Into<String>, interval: Duration, timeout: Duration) -> Result<Self> {
        relay_engine::fetch::install_rustls_provider();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to build self-check client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            interval,
        })
    }

    /// Spawn the probe loop; it exits when `cancel` fires.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the listener is up.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        match self.check().await {
                            Ok(response) => info!(time = response.time, "Self-check OK"),
                            Err(e) => error!(url = %self.url, error = %e, "Self-check failed"),
                        }
                    }
                }
            }
        })
    }

    /// Run one probe. Non-2xx statuses and `ok: false` bodies count as failures.
    pub async fn check(&self) -> Result<SelfCheckResponse> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Other(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Other(format!("unexpected status {status}")));
        }

        let body: SelfCheckResponse = response
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid response body: {e}")))?;

        if !body.ok {
            return Err(Error::Other("server reported not ok".to_string()));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{Json, Router, routing::get};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn monitor(addr: SocketAddr, interval: Duration) -> SelfCheckMonitor {
        SelfCheckMonitor::new(
            format!("http://{addr}/self-check"),
            interval,
            Duration::from_secs(3),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn check_accepts_ok_response() {
        let router = Router::new().route(
            "/self-check",
            get(|| async { Json(SelfCheckResponse { ok: true, time: 42 }) }),
        );
        let addr = serve(router).await;

        let response = monitor(addr, Duration::from_secs(30)).check().await.unwrap();
        assert!(response.ok);
        assert_eq!(response.time, 42);
    }

    #[tokio::test]
    async fn check_rejects_error_status() {
        let router = Router::new().route(
            "/self-check",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let addr = serve(router).await;

        assert!(monitor(addr, Duration::from_secs(30)).check().await.is_err());
    }

    #[tokio::test]
    async fn check_rejects_not_ok_body() {
        let router = Router::new().route(
            "/self-check",
            get(|| async { Json(SelfCheckResponse { ok: false, time: 0 }) }),
        );
        let addr = serve(router).await;

        assert!(monitor(addr, Duration::from_secs(30)).check().await.is_err());
    }

    #[tokio::test]
    async fn check_fails_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(monitor(addr, Duration::from_secs(30)).check().await.is_err());
    }

    #[tokio::test]
    async fn loop_checks_until_cancelled() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/self-check",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(SelfCheckResponse { ok: true, time: 0 })
                }
            }),
        );
        let addr = serve(router).await;

        let cancel = CancellationToken::new();
        let handle = monitor(addr, Duration::from_millis(20)).start(cancel.clone());

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        handle.await.unwrap();

        let seen = hits.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected repeated checks, saw {seen}");
    }
}
