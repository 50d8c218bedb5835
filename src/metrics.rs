//! Metrics collection and export for connection pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a single pool
///
/// # Examples
///
/// ```
/// use esox_connpool::PoolMetrics;
///
/// let metrics = PoolMetrics::default();
/// assert_eq!(metrics.export()["total_acquired"], "0");
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Target the pool connects to
    pub target: String,

    /// Number of connection slots
    pub capacity: usize,

    /// Slots currently holding a healthy connection
    pub healthy_connections: usize,

    /// Total successful acquisitions
    pub total_acquired: usize,

    /// Acquisitions served without taking the replacement lock
    pub fast_path_hits: usize,

    /// Slots repaired with a fresh connection
    pub replacements: usize,

    /// Dial attempts, including the initial ones
    pub dials: usize,

    /// Dial attempts that failed
    pub dial_failures: usize,

    /// Connections closed by the pool
    pub connections_closed: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("target".to_string(), self.target.clone());
        metrics.insert("capacity".to_string(), self.capacity.to_string());
        metrics.insert("healthy_connections".to_string(), self.healthy_connections.to_string());
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("fast_path_hits".to_string(), self.fast_path_hits.to_string());
        metrics.insert("replacements".to_string(), self.replacements.to_string());
        metrics.insert("dials".to_string(), self.dials.to_string());
        metrics.insert("dial_failures".to_string(), self.dial_failures.to_string());
        metrics.insert("connections_closed".to_string(), self.connections_closed.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics of several pools in Prometheus exposition format
    ///
    /// Every series carries a `target` label, `tags` are added as constant
    /// labels.
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_connpool::{MetricsExporter, PoolMetrics};
    /// use std::collections::HashMap;
    ///
    /// let metrics = PoolMetrics {
    ///     target: "10.0.0.1:50051".to_string(),
    ///     capacity: 4,
    ///     ..Default::default()
    /// };
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&[metrics], Some(&tags)).unwrap();
    /// assert!(output.contains("connpool_capacity"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        pools: &[PoolMetrics],
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

        let const_labels = tags.cloned().unwrap_or_default();
        let opts = |name: &str, help: &str| Opts::new(name, help).const_labels(const_labels.clone());
        let registry = Registry::new();

        let capacity = IntGaugeVec::new(opts("connpool_capacity", "Connection slots per pool"), &["target"])?;
        let healthy = IntGaugeVec::new(
            opts("connpool_connections_healthy", "Slots holding a healthy connection"),
            &["target"],
        )?;
        let acquired = IntCounterVec::new(
            opts("connpool_acquired_total", "Total connections acquired"),
            &["target"],
        )?;
        let fast_path = IntCounterVec::new(
            opts("connpool_fast_path_total", "Acquisitions served without locking"),
            &["target"],
        )?;
        let replacements = IntCounterVec::new(
            opts("connpool_replacements_total", "Broken or empty slots repaired"),
            &["target"],
        )?;
        let dials = IntCounterVec::new(opts("connpool_dials_total", "Dial attempts"), &["target"])?;
        let dial_failures = IntCounterVec::new(
            opts("connpool_dial_failures_total", "Failed dial attempts"),
            &["target"],
        )?;
        let closed = IntCounterVec::new(
            opts("connpool_connections_closed_total", "Connections closed by the pool"),
            &["target"],
        )?;

        registry.register(Box::new(capacity.clone()))?;
        registry.register(Box::new(healthy.clone()))?;
        registry.register(Box::new(acquired.clone()))?;
        registry.register(Box::new(fast_path.clone()))?;
        registry.register(Box::new(replacements.clone()))?;
        registry.register(Box::new(dials.clone()))?;
        registry.register(Box::new(dial_failures.clone()))?;
        registry.register(Box::new(closed.clone()))?;

        for pool in pools {
            let labels = [pool.target.as_str()];
            capacity.with_label_values(&labels).set(pool.capacity as i64);
            healthy.with_label_values(&labels).set(pool.healthy_connections as i64);
            acquired.with_label_values(&labels).inc_by(pool.total_acquired as u64);
            fast_path.with_label_values(&labels).inc_by(pool.fast_path_hits as u64);
            replacements.with_label_values(&labels).inc_by(pool.replacements as u64);
            dials.with_label_values(&labels).inc_by(pool.dials as u64);
            dial_failures.with_label_values(&labels).inc_by(pool.dial_failures as u64);
            closed.with_label_values(&labels).inc_by(pool.connections_closed as u64);
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub fast_path_hits: AtomicUsize,
    pub replacements: AtomicUsize,
    pub dials: AtomicUsize,
    pub dial_failures: AtomicUsize,
    pub connections_closed: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self, target: &str, capacity: usize, healthy: usize) -> PoolMetrics {
        PoolMetrics {
            target: target.to_string(),
            capacity,
            healthy_connections: healthy,
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            fast_path_hits: self.fast_path_hits.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            dials: self.dials.load(Ordering::Relaxed),
            dial_failures: self.dial_failures.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
        }
    }
}
