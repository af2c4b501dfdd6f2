//! Tracing and metrics setup.
//!
//! - JSON format for production environments, pretty format for development
//! - `RUST_LOG`-style filtering via `EnvFilter`
//! - Prometheus recorder for the `metrics` facade, rendered at `/metrics`

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

static PROMETHEUS: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize process-wide tracing and the Prometheus metrics recorder.
///
/// Safe to call once per process; later calls fail because the global
/// subscriber and recorder are already installed.
pub fn init(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS.set(handle);

    Ok(())
}

/// Handle for rendering the Prometheus exposition text.
pub fn metrics_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS.get()
}
