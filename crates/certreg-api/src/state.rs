//! # Application State
//!
//! Shared state for the Axum application, passed to route handlers via the
//! `State` extractor. Cloning is cheap.

use std::sync::Arc;

use certreg_registry::RegistryService;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RegistryService>,
    pub config: Arc<AppConfig>,
    /// Renders `/metrics`. `None` when no recorder is installed, as in tests.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(registry: RegistryService, config: AppConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
