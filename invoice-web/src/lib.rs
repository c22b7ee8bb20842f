pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use config::Settings;
use metrics_exporter_prometheus::PrometheusHandle;
use services::{Authenticator, InvoiceStore};
use std::sync::Arc;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn InvoiceStore>,
    pub authenticator: Arc<dyn Authenticator>,
    /// Present once a Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<dyn InvoiceStore>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            settings,
            store,
            authenticator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
