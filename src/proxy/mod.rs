//! The broadcast engine.
//!
//! [`Broadcaster`] owns a validated config, the outbound HTTP client, a
//! metrics reporter and an optional logger. For every inbound request it
//! rewrites one copy per backend ([`transform`]), dispatches them
//! concurrently ([`fanout`]), races the primary against the response
//! timeout ([`race`]) and writes the outcome ([`respond`]).
//! [`broadcast_handler`] is the axum fallback that feeds it.

pub mod fanout;
pub mod headers;
pub mod race;
pub mod respond;
pub mod transform;

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use tokio::time::Instant;
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

use crate::config::model::BroadcastConfig;
use crate::metrics::{self, MetricsReporter, REQUEST_COUNT};
use crate::server::{self, HttpClient};
use race::Decision;
pub use transform::InboundRequest;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

pub struct Broadcaster {
    config: Arc<BroadcastConfig>,
    client: HttpClient,
    metrics: Arc<dyn MetricsReporter>,
    logger: Option<tracing::Dispatch>,
}

impl Broadcaster {
    #[must_use]
    pub fn new(config: BroadcastConfig) -> Self {
        let client = server::build_http_client(config.response_timeout());
        Self::with_client(config, client)
    }

    #[must_use]
    pub fn with_client(config: BroadcastConfig, client: HttpClient) -> Self {
        Self {
            config: Arc::new(config),
            client,
            metrics: metrics::noop(),
            logger: None,
        }
    }

    #[must_use]
    pub fn with_metrics_reporter(mut self, reporter: Arc<dyn MetricsReporter>) -> Self {
        self.metrics = reporter;
        self
    }

    /// Scope every request, and the backend tasks it spawns, to `logger`
    /// instead of whatever subscriber is current.
    #[must_use]
    pub fn with_logger(mut self, logger: tracing::Dispatch) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    pub async fn broadcast(&self, inbound: InboundRequest) -> Response {
        let handled = async move {
            let span = tracing::info_span!(
                "broadcast",
                correlation_id = %correlation_id(&inbound.headers)
            );
            self.handle(inbound).instrument(span).await
        };

        match &self.logger {
            Some(logger) => handled.with_subscriber(logger.clone()).await,
            None => handled.await,
        }
    }

    async fn handle(&self, inbound: InboundRequest) -> Response {
        self.metrics.increment(REQUEST_COUNT);
        tracing::info!(
            method = %inbound.method,
            uri = %inbound.uri,
            backends = self.config.backends().len(),
            "request received"
        );

        let deadline = Instant::now() + self.config.response_timeout();
        let primary = fanout::fan_out(fanout::FanOut {
            client: &self.client,
            config: &self.config,
            metrics: &self.metrics,
            inbound: &inbound,
        });

        let decision = race::race(
            primary,
            deadline,
            self.config.primary(),
            self.metrics.as_ref(),
        )
        .await;

        match &decision {
            Decision::PrimaryResponse(response) => {
                tracing::debug!(status = response.status().as_u16(), "forwarding primary response");
            }
            Decision::PrimaryError(err) => {
                tracing::warn!(error = %err, "primary failed, returning error text");
            }
            Decision::TimedOut => {
                tracing::warn!(
                    timeout_secs = self.config.response_timeout().as_secs(),
                    primary = %self.config.primary(),
                    "primary did not respond in time"
                );
            }
        }

        respond::into_response(decision, self.config.status_policy())
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from)
}

/// Axum fallback: every request, whatever its method or path, is broadcast.
pub async fn broadcast_handler(
    State(broadcaster): State<Arc<Broadcaster>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    broadcaster
        .broadcast(InboundRequest {
            method,
            uri,
            headers,
            body,
        })
        .await
}
