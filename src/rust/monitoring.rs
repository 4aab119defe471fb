//! Summaries of the serving metrics, read back from a Prometheus server.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::metrics::{PREDICTIONS_TOTAL, PREDICTION_SECONDS};

const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("Unable to connect to Prometheus server: {0}")]
    Connection(#[from] reqwest::Error),
    #[error("Malformed Prometheus response: {0}")]
    Malformed(String),
}

/// Body of a Prometheus `/api/v1/query` response
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub data: QueryData,
}

#[derive(Debug, Deserialize)]
pub struct QueryData {
    #[serde(default)]
    pub result: Vec<Sample>,
}

/// One instant-vector sample: labels plus `[timestamp, "value"]`
#[derive(Debug, Clone, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: (f64, String),
}

impl Sample {
    fn number(&self) -> Result<f64, MonitoringError> {
        self.value
            .1
            .parse::<f64>()
            .map_err(|e| MonitoringError::Malformed(format!("sample value {:?}: {}", self.value.1, e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub total: f64,
    pub success: f64,
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Upper bound of the bucket, in seconds
    pub bucket: f64,
    /// Requests that fell in this bucket only (not cumulative)
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub requests: RequestCounts,
    pub response_times: Vec<HistogramBucket>,
}

#[derive(Debug, Clone)]
pub struct MonitoringClient {
    prometheus_url: String,
    client: reqwest::Client,
}

impl MonitoringClient {
    pub fn new(prometheus_url: impl Into<String>) -> Result<Self, MonitoringError> {
        let client = reqwest::Client::builder().timeout(QUERY_TIMEOUT).build()?;
        Ok(Self {
            prometheus_url: prometheus_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn prometheus_url(&self) -> &str {
        &self.prometheus_url
    }

    /// Queries totals, success rate and latency buckets and reduces them
    pub async fn fetch_summary(&self) -> Result<MetricsSummary, MonitoringError> {
        let total = self.query(&format!("sum({})", PREDICTIONS_TOTAL)).await?;
        let success_rate = self
            .query(&format!(
                "sum({name}{{status=\"200\"}}) / sum({name}) * 100",
                name = PREDICTIONS_TOTAL
            ))
            .await?;
        let buckets = self
            .query(&format!("sum({}_bucket) by (le)", PREDICTION_SECONDS))
            .await?;

        summarize(&total, &success_rate, &buckets)
    }

    async fn query(&self, query: &str) -> Result<Vec<Sample>, MonitoringError> {
        debug!("Prometheus query: {}", query);
        let response: QueryResponse = self
            .client
            .get(format!("{}/api/v1/query", self.prometheus_url))
            .query(&[("query", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.data.result)
    }
}

/// Reduces raw query results to request counts and per-bucket latencies
pub fn summarize(
    total: &[Sample],
    success_rate: &[Sample],
    buckets: &[Sample],
) -> Result<MetricsSummary, MonitoringError> {
    let total = match total.first() {
        Some(sample) => sample.number()?.max(0.0),
        None => 0.0,
    };

    // an empty or undefined ratio means nothing has failed
    let rate = match success_rate.first() {
        Some(sample) => sample.number()?,
        None => 100.0,
    };
    let rate = if rate.is_nan() { 100.0 } else { rate.clamp(0.0, 100.0) };

    let response_times = if total > 0.0 {
        bucket_counts(buckets)?
    } else {
        Vec::new()
    };

    Ok(MetricsSummary {
        requests: RequestCounts {
            total,
            success: rate / 100.0 * total,
            error: (100.0 - rate) / 100.0 * total,
        },
        response_times,
    })
}

/// Converts cumulative `le` buckets into per-bucket counts, dropping `+Inf`
pub fn bucket_counts(samples: &[Sample]) -> Result<Vec<HistogramBucket>, MonitoringError> {
    let mut bounded = Vec::with_capacity(samples.len());
    for sample in samples {
        let Some(le) = sample.metric.get("le") else {
            continue;
        };
        let bound = le
            .parse::<f64>()
            .map_err(|e| MonitoringError::Malformed(format!("bucket bound {:?}: {}", le, e)))?;
        if bound.is_finite() {
            bounded.push((bound, sample.number()?));
        }
    }
    bounded.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut previous = 0.0;
    Ok(bounded
        .into_iter()
        .map(|(bound, cumulative)| {
            let count = cumulative - previous;
            previous = cumulative;
            HistogramBucket { bucket: bound, count }
        })
        .collect())
}
