use std::{path::Path, sync::Arc, time::Duration};

use metrics::{describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use tracing::{info, warn};

use crate::config::AppConfig;

pub const SCORE_HISTOGRAM: &str = "product_predictions";
pub const CPU_GAUGE: &str = "custom_cpu_usage_percent";
pub const DISK_GAUGE: &str = "custom_disk_usage_percent";
pub const MEMORY_GAUGE: &str = "custom_memory_usage_percent";

const SCORE_BUCKETS: &[f64] = &[0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Optional Prometheus instrumentation. A disabled handle turns every call into a no-op.
#[derive(Clone, Default)]
pub struct Telemetry {
    inner: Option<Arc<Recorder>>,
}

struct Recorder {
    handle: PrometheusHandle,
    system: Mutex<System>,
}

impl Telemetry {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Installs the global Prometheus recorder when metrics are enabled.
    /// Installation failures are logged and leave telemetry disabled.
    pub fn init(config: &AppConfig) -> Self {
        if !config.metrics_enabled {
            info!("Prometheus metrics exporter disabled via configuration");
            return Self::disabled();
        }

        let builder = match PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(SCORE_HISTOGRAM.to_string()), SCORE_BUCKETS)
        {
            Ok(builder) => builder,
            Err(err) => {
                warn!("Failed to configure Prometheus buckets: {}", err);
                return Self::disabled();
            }
        };

        match builder.install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics exporter registered");
                describe_histogram!(SCORE_HISTOGRAM, "Histogram of product prediction scores");
                describe_gauge!(CPU_GAUGE, "CPU usage percent");
                describe_gauge!(DISK_GAUGE, "Disk usage percent");
                describe_gauge!(MEMORY_GAUGE, "Memory usage percent");
                spawn_upkeep(handle.clone());
                Self {
                    inner: Some(Arc::new(Recorder {
                        handle,
                        system: Mutex::new(System::new()),
                    })),
                }
            }
            Err(err) => {
                warn!("Failed to install Prometheus metrics exporter: {}", err);
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn record_scores<I>(&self, scores: I)
    where
        I: IntoIterator<Item = f64>,
    {
        if self.inner.is_none() {
            return;
        }
        for score in scores {
            histogram!(SCORE_HISTOGRAM).record(score);
        }
    }

    /// Samples CPU, root disk and memory usage into their gauges.
    pub fn refresh_host_gauges(&self) {
        let Some(recorder) = self.inner.as_ref() else {
            return;
        };
        let mut system = recorder.system.lock();

        system.refresh_cpu();
        gauge!(CPU_GAUGE).set(f64::from(system.global_cpu_info().cpu_usage()));

        system.refresh_memory();
        gauge!(MEMORY_GAUGE).set(usage_percent(system.used_memory(), system.total_memory()));

        system.refresh_disks_list();
        let root = system
            .disks()
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"));
        if let Some(disk) = root {
            let used = disk.total_space().saturating_sub(disk.available_space());
            gauge!(DISK_GAUGE).set(usage_percent(used, disk.total_space()));
        }
    }

    /// Prometheus text exposition, or `None` when disabled.
    pub fn render(&self) -> Option<String> {
        self.inner.as_ref().map(|recorder| recorder.handle.render())
    }
}

/// Drains histogram samples periodically so they don't pile up between scrapes.
fn spawn_upkeep(handle: PrometheusHandle) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("no tokio runtime; Prometheus upkeep runs only on scrape");
        return;
    };
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            ticker.tick().await;
            handle.run_upkeep();
        }
    });
}

fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_skips_recorder() {
        let telemetry = Telemetry::init(&AppConfig::default());
        assert!(!telemetry.is_enabled());
        telemetry.record_scores([0.2, 0.9]);
        telemetry.refresh_host_gauges();
        assert!(telemetry.render().is_none());
    }

    #[test]
    fn usage_percent_handles_zero_total() {
        assert_eq!(usage_percent(5, 0), 0.0);
        assert_eq!(usage_percent(25, 100), 25.0);
    }
}
