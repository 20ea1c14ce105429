//! Shared application state.
//!
//! The registry is built here once per process and handed to every
//! component that records or scrapes; there is no global instance.

use std::sync::Arc;

use reqmeter_core::{Registry, RequestMetrics};

use crate::config::GatewayConfig;
use crate::demo::{JitterWorkload, Workload};
use crate::error::Result;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    registry: Arc<Registry>,
    requests: RequestMetrics,
    workload: Arc<dyn Workload>,
}

impl AppState {
    /// Build application state with a fresh registry and the config-driven
    /// demo workload. Bad metric definitions fail here, before binding.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let workload = Arc::new(JitterWorkload::from_config(&cfg.demo));
        Self::with_parts(cfg, Arc::new(Registry::new()), workload)
    }

    pub fn with_parts(
        cfg: GatewayConfig,
        registry: Arc<Registry>,
        workload: Arc<dyn Workload>,
    ) -> Result<Self> {
        cfg.validate()?;
        let requests = RequestMetrics::register(&registry, &cfg.metrics.request_metrics())?;
        tracing::debug!(metrics = registry.len(), "request metrics registered");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                requests,
                workload,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn request_metrics(&self) -> &RequestMetrics {
        &self.inner.requests
    }

    pub fn workload(&self) -> Arc<dyn Workload> {
        Arc::clone(&self.inner.workload)
    }
}
