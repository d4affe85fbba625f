//! `broadcaster run`: start the broadcast server.
//!
//! Loads and validates the config file, installs the logger, serves until
//! SIGTERM / Ctrl+C, then logs the metrics collected during the run.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config;
use crate::error::BroadcastError;
use crate::logging;
use crate::metrics::{InMemoryReporter, MetricsReporter};
use crate::proxy::Broadcaster;
use crate::server;

pub async fn execute(args: RunArgs) -> Result<(), BroadcastError> {
    let path = config::resolve_path(args.config.as_deref()).await?;
    let config = config::load_file(&path).await?;

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level().clone());
    let log_format = logging::resolve_format(args.pretty, args.json);
    let logger = logging::build(&log_level, log_format, config.log_file())?;
    logging::install(logger.clone())?;

    let port = args.port.unwrap_or_else(|| config.port());
    let addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;

    let reporter = Arc::new(InMemoryReporter::new());
    let metrics: Arc<dyn MetricsReporter> = reporter.clone();

    let backend_count = config.backends().len();
    let primary = config.primary().clone();
    let timeout = config.response_timeout();

    let broadcaster = Arc::new(
        Broadcaster::new(config)
            .with_metrics_reporter(metrics)
            .with_logger(logger),
    );
    let router = server::build_router(broadcaster, args.max_body);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        config = %path.display(),
        primary = %primary,
        backends = backend_count,
        timeout_secs = timeout.as_secs(),
        "broadcaster started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    match serde_json::to_string(&reporter.snapshot()) {
        Ok(snapshot) => tracing::info!(metrics = %snapshot, "broadcaster stopped"),
        Err(e) => tracing::warn!(error = %e, "broadcaster stopped, metrics not serializable"),
    }
    Ok(())
}
