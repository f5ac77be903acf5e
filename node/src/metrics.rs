//! # Prometheus Metrics
//!
//! Exposes operational metrics for the ledger node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it
/// can be shared across request handlers and background tasks.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total number of accepted deposits.
    pub deposits_total: IntCounter,
    /// Total number of accepted withdrawals (paid or queued).
    pub withdrawals_total: IntCounter,
    /// Total number of payments made by settlement passes.
    pub settlement_payments_total: IntCounter,
    /// Current number of pending withdrawal requests.
    pub pending_withdrawals: IntGauge,
    /// The persisted growing ratio as a float (1.0 = parity).
    pub growing_ratio: Gauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("swell".into()), None)
            .expect("failed to create prometheus registry");

        let deposits_total =
            IntCounter::new("deposits_total", "Total number of accepted deposits")
                .expect("metric creation");
        registry
            .register(Box::new(deposits_total.clone()))
            .expect("metric registration");

        let withdrawals_total = IntCounter::new(
            "withdrawals_total",
            "Total number of accepted withdrawals, paid or queued",
        )
        .expect("metric creation");
        registry
            .register(Box::new(withdrawals_total.clone()))
            .expect("metric registration");

        let settlement_payments_total = IntCounter::new(
            "settlement_payments_total",
            "Total number of payments made by settlement passes",
        )
        .expect("metric creation");
        registry
            .register(Box::new(settlement_payments_total.clone()))
            .expect("metric registration");

        let pending_withdrawals = IntGauge::new(
            "pending_withdrawals",
            "Current number of pending withdrawal requests",
        )
        .expect("metric creation");
        registry
            .register(Box::new(pending_withdrawals.clone()))
            .expect("metric registration");

        let growing_ratio = Gauge::new(
            "growing_ratio",
            "The persisted growing ratio (1.0 = parity with principal)",
        )
        .expect("metric creation");
        registry
            .register(Box::new(growing_ratio.clone()))
            .expect("metric registration");

        Self {
            registry,
            deposits_total,
            withdrawals_total,
            settlement_payments_total,
            pending_withdrawals,
            growing_ratio,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers via extension.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
