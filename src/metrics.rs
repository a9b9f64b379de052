use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{http::header, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus_client::{
    encoding::{text::encode, EncodeLabelSet},
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct InterfaceLabels {
    interface: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct DroppedLabels {
    interface: String,
    reason: String,
}

/// Counters for everything the pipeline would otherwise absorb silently.
#[derive(Clone, Default)]
pub struct Metrics {
    frames_total: Family<InterfaceLabels, Counter>,
    discoveries_total: Family<InterfaceLabels, Counter>,
    dropped_events_total: Family<DroppedLabels, Counter>,
    store_errors_total: Family<InterfaceLabels, Counter>,
    worker_terminations_total: Family<InterfaceLabels, Counter>,
    notifications_total: Counter,
    active_workers: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, registry: &mut Registry) {
        registry.register("arpwatch_frames", "ARP frames received", self.frames_total.clone());
        registry.register("arpwatch_discoveries", "Hosts seen for the first time", self.discoveries_total.clone());
        registry.register("arpwatch_dropped_events", "ARP events dropped before reaching the store", self.dropped_events_total.clone());
        registry.register("arpwatch_store_errors", "Store lookups or appends that failed", self.store_errors_total.clone());
        registry.register("arpwatch_worker_terminations", "Capture workers that stopped", self.worker_terminations_total.clone());
        registry.register("arpwatch_notifications", "Discoveries written to the destination", self.notifications_total.clone());
        registry.register("arpwatch_active_workers", "Capture workers currently running", self.active_workers.clone());
    }

    pub(crate) fn frame(&self, interface: &str) {
        self.frames_total.get_or_create(&labels(interface)).inc();
    }

    pub(crate) fn discovery(&self, interface: &str) {
        self.discoveries_total.get_or_create(&labels(interface)).inc();
    }

    pub(crate) fn dropped(&self, interface: &str, reason: &str) {
        self.dropped_events_total
            .get_or_create(&DroppedLabels { interface: interface.to_string(), reason: reason.to_string() })
            .inc();
    }

    pub(crate) fn store_error(&self, interface: &str) {
        self.store_errors_total.get_or_create(&labels(interface)).inc();
    }

    pub(crate) fn worker_started(&self) {
        self.active_workers.inc();
    }

    pub(crate) fn worker_terminated(&self, interface: &str) {
        self.active_workers.dec();
        self.worker_terminations_total.get_or_create(&labels(interface)).inc();
    }

    pub(crate) fn notification(&self) {
        self.notifications_total.inc();
    }

    pub fn notifications(&self) -> u64 {
        self.notifications_total.get()
    }

    pub fn active_workers(&self) -> i64 {
        self.active_workers.get()
    }
}

// Reading a family member creates its series, so these stay out of the exported surface.
#[cfg(test)]
impl Metrics {
    pub(crate) fn frames(&self, interface: &str) -> u64 {
        self.frames_total.get_or_create(&labels(interface)).get()
    }

    pub(crate) fn discoveries(&self, interface: &str) -> u64 {
        self.discoveries_total.get_or_create(&labels(interface)).get()
    }

    pub(crate) fn dropped_events(&self, interface: &str, reason: &str) -> u64 {
        self.dropped_events_total
            .get_or_create(&DroppedLabels { interface: interface.to_string(), reason: reason.to_string() })
            .get()
    }

    pub(crate) fn store_errors(&self, interface: &str) -> u64 {
        self.store_errors_total.get_or_create(&labels(interface)).get()
    }

    pub(crate) fn worker_terminations(&self, interface: &str) -> u64 {
        self.worker_terminations_total.get_or_create(&labels(interface)).get()
    }
}

fn labels(interface: &str) -> InterfaceLabels {
    InterfaceLabels { interface: interface.to_string() }
}

/// Serves the registry in the text exposition format at `/metrics`.
pub async fn serve(registry: Arc<Registry>, addr: SocketAddr) -> Result<()> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let registry = registry.clone();
            async move {
                let mut buffer = String::new();
                match encode(&mut buffer, &registry) {
                    Ok(()) => ([(header::CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")], buffer).into_response(),
                    Err(e) => {
                        log::error!("failed to encode metrics: {}", e);
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    }
                }
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("failed to bind metrics listener on {}", addr))?;
    log::info!("serving metrics on http://{}/metrics", addr);
    axum::serve(listener, app).await.context("metrics server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_gauge_tracks_lifecycle() {
        let metrics = Metrics::new();
        metrics.worker_started();
        metrics.worker_started();
        metrics.worker_terminated("eth0");
        assert_eq!(metrics.active_workers(), 1);
        assert_eq!(metrics.worker_terminations("eth0"), 1);
        assert_eq!(metrics.worker_terminations("eth1"), 0);
    }

    #[test]
    fn encodes_registered_families() {
        let metrics = Metrics::new();
        let mut registry = Registry::default();
        metrics.register(&mut registry);
        metrics.discovery("eth0");
        metrics.dropped("eth0", "invalid_address");

        let mut buffer = String::new();
        encode(&mut buffer, &registry).unwrap();
        assert!(buffer.contains("arpwatch_discoveries_total{interface=\"eth0\"} 1"));
        assert!(buffer.contains("arpwatch_dropped_events_total{interface=\"eth0\",reason=\"invalid_address\"} 1"));
    }
}
