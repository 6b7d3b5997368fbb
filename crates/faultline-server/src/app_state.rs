//! Shared application state.
//!
//! Holds the config, the synthetic generators and the metrics registry.
//! The registry is created once here and shared by reference with the
//! instrumentation middleware, the handlers and the process collector.

use std::sync::Arc;

use faultline_core::error::Result;
use faultline_core::{FailureGenerator, LatencyGenerator};

use crate::config::FaultlineConfig;
use crate::obs::{self, metrics::MetricsRegistry, process};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<MetricsRegistry>,
}

struct AppStateInner {
    cfg: FaultlineConfig,
    latency: LatencyGenerator,
    failure: FailureGenerator,
}

impl AppState {
    /// Build application state and register all metric families.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: FaultlineConfig) -> Result<Self> {
        let latency = LatencyGenerator::new(cfg.latency.min_ms, cfg.latency.spread_ms)?;
        let failure = FailureGenerator::new(cfg.failure.gateway_timeout());

        let metrics = Arc::new(MetricsRegistry::new());
        obs::register_http_metrics(&metrics)?;
        if cfg.metrics.default_metrics {
            process::register(&metrics)?;
        }

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, latency, failure }),
            metrics,
        })
    }

    pub fn cfg(&self) -> &FaultlineConfig {
        &self.inner.cfg
    }

    pub fn latency(&self) -> &LatencyGenerator {
        &self.inner.latency
    }

    pub fn failure(&self) -> &FailureGenerator {
        &self.inner.failure
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Process collector bound to this state's registry, if default metrics are on.
    pub fn process_collector(&self) -> Option<process::ProcessCollector> {
        self.cfg()
            .metrics
            .default_metrics
            .then(|| process::ProcessCollector::new(Arc::clone(&self.metrics)))
    }
}
