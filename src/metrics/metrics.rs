use crate::log::kflog::Logger;
use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::sync::oneshot::Receiver;
use warp::{Filter, Rejection, Reply};

/// Pipeline counters, registered on a caller-owned registry.
pub struct Metrics {
    pub sent_messages: IntCounter,
    pub send_errors: IntCounter,
    pub send_duration: Histogram,
    pub received_messages: IntCounter,
    pub missing_data: IntCounter,
    pub decode_errors: IntCounter,
}

impl Metrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Metrics> {
        let metrics = Metrics {
            sent_messages: IntCounter::new("kcev_sent_messages", "Envelopes delivered to kafka")?,
            send_errors: IntCounter::new("kcev_send_errors", "Envelopes kafka failed to deliver")?,
            send_duration: Histogram::with_opts(
                HistogramOpts::new("kcev_send_duration_ms", "Envelope send duration")
                    .buckets(prometheus::exponential_buckets(5.0, 2.0, 5)?),
            )?,
            received_messages: IntCounter::new(
                "kcev_received_messages",
                "Envelopes received and decoded",
            )?,
            missing_data: IntCounter::new("kcev_missing_data", "Envelopes received without data")?,
            decode_errors: IntCounter::new(
                "kcev_decode_errors",
                "Envelopes that could not be decoded",
            )?,
        };

        registry.register(Box::new(metrics.sent_messages.clone()))?;
        registry.register(Box::new(metrics.send_errors.clone()))?;
        registry.register(Box::new(metrics.send_duration.clone()))?;
        registry.register(Box::new(metrics.received_messages.clone()))?;
        registry.register(Box::new(metrics.missing_data.clone()))?;
        registry.register(Box::new(metrics.decode_errors.clone()))?;
        Ok(metrics)
    }
}

fn with_logger(
    logger: Logger,
) -> impl Filter<Extract = (Logger,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || logger.clone())
}

fn with_registry(
    registry: Arc<Registry>,
) -> impl Filter<Extract = (Arc<Registry>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || registry.clone())
}

pub(crate) fn render(logger: &Logger, registry: &Registry) -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        slog::error!(
            logger,
            "failed to encode prometheus metrics";
            "error" => e.to_string(),
        );
    };

    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            slog::error!(
                logger,
                "failed to encode prometheus metrics from utf8";
                "error" => e.to_string(),
            );
            String::default()
        }
    }
}

async fn handler(logger: Logger, registry: Arc<Registry>) -> Result<impl Reply, Rejection> {
    Ok(render(&logger, &registry))
}

pub struct ServerConfig {
    pub port: u16,
}

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Server {
        Server { config }
    }

    pub fn start_server(
        &self,
        logger: Logger,
        registry: Arc<Registry>,
        shutdown_rx: Receiver<String>,
    ) -> Receiver<i8> {
        let route = warp::path!("metrics")
            .and(warp::get())
            .and(with_logger(logger.clone()))
            .and(with_registry(registry))
            .and_then(handler);

        let (shutdown_completed_tx, shutdown_completed_rx) = oneshot::channel::<i8>();

        slog::info!(
            logger,
            "starting metrics server";
            "port" => self.config.port
        );
        let shutdown_logger = logger.clone();
        let (_, server) =
            warp::serve(route).bind_with_graceful_shutdown(([0, 0, 0, 0], self.config.port), {
                async move {
                    shutdown_rx.await.ok();
                    slog::info!(shutdown_logger, "shutting down metrics server");
                }
            });

        // Completion is signalled only after the server, and every logger it holds, is gone.
        tokio::task::spawn(async move {
            server.await;
            slog::info!(logger, "metrics server stopped");
            drop(logger);
            shutdown_completed_tx.send(0).ok();
        });
        shutdown_completed_rx
    }
}
