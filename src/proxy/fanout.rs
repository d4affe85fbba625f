//! Concurrent fan-out of a single request to every configured backend.
//!
//! One task is spawned per backend. The primary's outcome is delivered on
//! a oneshot channel for the racer; secondaries drain and log their
//! responses and never report back. Tasks are detached: when the racer
//! settles early they keep running to completion, and a late primary
//! outcome is simply dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Response;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tokio::sync::oneshot;
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

use super::transform::{transform, InboundRequest, OutboundRequest};
use crate::config::model::{BroadcastConfig, EndpointId};
use crate::error::{error_chain, ForwardError};
use crate::metrics::{
    MetricsReporter, PRIMARY_FAILURE_COUNT, PRIMARY_RESPONSE_TIME, PRIMARY_SUCCESS_COUNT,
    SECONDARY_FAILURE_COUNT, SECONDARY_RESPONSE_TIME, SECONDARY_SUCCESS_COUNT,
};
use crate::server::HttpClient;

/// What the primary task reports to the racer.
pub type PrimaryOutcome<B = Incoming> = Result<Response<B>, ForwardError>;

pub struct FanOut<'a> {
    pub client: &'a HttpClient,
    pub config: &'a BroadcastConfig,
    pub metrics: &'a Arc<dyn MetricsReporter>,
    pub inbound: &'a InboundRequest,
}

struct Backend {
    id: EndpointId,
    target: String,
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Spawn one call per backend and return the primary's outcome channel.
pub fn fan_out(req: FanOut<'_>) -> oneshot::Receiver<PrimaryOutcome> {
    let (primary_tx, primary_rx) = oneshot::channel();
    let mut primary_tx = Some(primary_tx);

    for (id, url) in req.config.backends() {
        let backend = Backend {
            id: id.clone(),
            target: url.to_string(),
        };
        let outbound = transform(req.inbound, url);
        let client = req.client.clone();
        let metrics = Arc::clone(req.metrics);

        if req.config.is_primary(id) {
            let Some(tx) = primary_tx.take() else {
                continue;
            };
            match outbound {
                Ok(request) => {
                    tracing::debug!(
                        endpoint = %backend.id,
                        uri = %request.uri(),
                        "sending request to primary"
                    );
                    tokio::spawn(
                        call_primary(client, backend, request, metrics, tx)
                            .in_current_span()
                            .with_current_subscriber(),
                    );
                }
                Err(e) => {
                    metrics.increment(PRIMARY_FAILURE_COUNT);
                    tracing::error!(
                        endpoint = %backend.id,
                        target = %backend.target,
                        error = %e,
                        "could not build primary request"
                    );
                    let _ = tx.send(Err(ForwardError::InvalidRequest {
                        endpoint: backend.id,
                        detail: e.to_string(),
                    }));
                }
            }
        } else {
            match outbound {
                Ok(request) => {
                    tracing::debug!(
                        endpoint = %backend.id,
                        uri = %request.uri(),
                        "sending request to secondary"
                    );
                    tokio::spawn(
                        call_secondary(client, backend, request, metrics)
                            .in_current_span()
                            .with_current_subscriber(),
                    );
                }
                Err(e) => {
                    metrics.increment(SECONDARY_FAILURE_COUNT);
                    tracing::error!(
                        endpoint = %backend.id,
                        target = %backend.target,
                        error = %e,
                        "could not build secondary request"
                    );
                }
            }
        }
    }

    primary_rx
}

async fn call_primary(
    client: HttpClient,
    backend: Backend,
    request: OutboundRequest,
    metrics: Arc<dyn MetricsReporter>,
    tx: oneshot::Sender<PrimaryOutcome>,
) {
    let start = Instant::now();
    let result = client.request(request).await;
    let elapsed = start.elapsed();

    let outcome = match result {
        Ok(response) => {
            metrics.increment(PRIMARY_SUCCESS_COUNT);
            metrics.time(PRIMARY_RESPONSE_TIME, elapsed);
            tracing::info!(
                endpoint = %backend.id,
                target = %backend.target,
                status = response.status().as_u16(),
                latency_ms = millis(elapsed),
                "primary target responded"
            );
            Ok(response)
        }
        Err(e) => {
            metrics.increment(PRIMARY_FAILURE_COUNT);
            let detail = error_chain(&e);
            tracing::error!(
                endpoint = %backend.id,
                target = %backend.target,
                error = %detail,
                latency_ms = millis(elapsed),
                "primary target failed"
            );
            Err(ForwardError::Transport {
                endpoint: backend.id.clone(),
                target: backend.target,
                detail,
            })
        }
    };

    if tx.send(outcome).is_err() {
        tracing::debug!(
            endpoint = %backend.id,
            latency_ms = millis(elapsed),
            "primary outcome arrived after the response was decided, dropping it"
        );
    }
}

async fn call_secondary(
    client: HttpClient,
    backend: Backend,
    request: OutboundRequest,
    metrics: Arc<dyn MetricsReporter>,
) {
    let start = Instant::now();
    let result = client.request(request).await;
    let elapsed = start.elapsed();

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            metrics.increment(SECONDARY_FAILURE_COUNT);
            tracing::error!(
                endpoint = %backend.id,
                target = %backend.target,
                error = %error_chain(&e),
                latency_ms = millis(elapsed),
                "secondary target failed"
            );
            return;
        }
    };

    metrics.increment(SECONDARY_SUCCESS_COUNT);
    metrics.time(SECONDARY_RESPONSE_TIME, elapsed);

    let status = response.status().as_u16();
    // Read to the end so the pooled connection is not left half-read.
    match response.into_body().collect().await {
        Ok(collected) => {
            let body = collected.to_bytes();
            tracing::info!(
                endpoint = %backend.id,
                target = %backend.target,
                status,
                latency_ms = millis(elapsed),
                body = %String::from_utf8_lossy(&body),
                "secondary target responded"
            );
        }
        Err(e) => {
            tracing::warn!(
                endpoint = %backend.id,
                target = %backend.target,
                status,
                error = %e,
                "secondary response body could not be read"
            );
        }
    }
}
