use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

pub const PREDICTIONS_TOTAL: &str = "image_classifier_predictions_total";
pub const PREDICTION_SECONDS: &str = "image_classifier_prediction_seconds";

/// Latency histogram bucket bounds, in seconds
pub const LATENCY_BUCKETS: [f64; 9] = [0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0];

/// Prediction request counters and latencies, kept in a registry owned by the
/// server rather than the process-wide default one.
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    prediction_latency: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(PREDICTIONS_TOTAL, "Total number of predictions"),
            &["status"],
        )?;
        let prediction_latency = Histogram::with_opts(
            HistogramOpts::new(PREDICTION_SECONDS, "Time spent processing prediction")
                .buckets(LATENCY_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(prediction_latency.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            prediction_latency,
        })
    }

    /// Records one finished prediction request
    pub fn observe(&self, status: u16, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[&status.to_string()])
            .inc();
        self.prediction_latency.observe(elapsed.as_secs_f64());
    }

    pub fn requests_with_status(&self, status: u16) -> u64 {
        self.requests_total
            .with_label_values(&[&status.to_string()])
            .get()
    }

    /// Renders all metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Middleware timing every request whose path ends in `/predict`
pub async fn track_predictions(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    if !request.uri().path().ends_with("/predict") {
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    metrics.observe(response.status().as_u16(), start.elapsed());
    response
}
