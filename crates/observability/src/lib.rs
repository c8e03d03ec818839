use std::sync::OnceLock;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Logs go to stderr so stdout stays free for evaluations. Keep the guard
/// alive until shutdown or buffered lines are lost.
pub fn init_tracing(service_name: &str) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(service_name)));

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_target(true)
        .with_ansi(false)
        .try_init();

    guard
}

fn default_filter(service_name: &str) -> String {
    format!("{service_name}=info,signal_engine=info,warn")
}

/// Installs the Prometheus recorder once per process.
pub fn init_metrics() -> Result<PrometheusHandle> {
    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install prometheus recorder")?;

    let _ = PROM_HANDLE.set(handle.clone());
    tracing::debug!("prometheus recorder installed");
    Ok(handle)
}

/// Text exposition of everything recorded so far, if metrics were initialised.
pub fn render_metrics() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_scopes_service() {
        assert_eq!(
            default_filter("studio_cli"),
            "studio_cli=info,signal_engine=info,warn"
        );
    }

    #[test]
    fn metrics_recorder_is_installed_once() {
        let first = init_metrics().expect("install");
        let second = init_metrics().expect("reuse");
        metrics::counter!("engine.reset").increment(1);
        let rendered = render_metrics().expect("rendered");
        assert!(rendered.contains("engine_reset"));
        assert_eq!(first.render(), second.render());
    }
}
