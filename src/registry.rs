//! Registry of connection pools keyed by target

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::metrics::PoolMetrics;
use crate::pool::ConnectionPool;
use crate::tcp::TcpConnector;
use crate::transport::{Connector, DialOption};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "metrics")]
use std::collections::HashMap;

/// Lazily creates one [`ConnectionPool`] per target and hands out its connections
///
/// Construct one registry for the application and share it by cloning; clones
/// share the same pools. Pools live as long as the registry.
///
/// # Examples
///
/// ```no_run
/// use esox_connpool::{PoolConfiguration, PoolRegistry};
///
/// let registry = PoolRegistry::with_tcp(PoolConfiguration::new().with_pool_size(4));
///
/// let conn = registry.get_connection("127.0.0.1:50051").unwrap();
/// println!("connected to {}", conn.peer_addr());
/// ```
pub struct PoolRegistry<C: Connector> {
    pools: Arc<DashMap<String, Arc<ConnectionPool<C>>>>,
    connector: Arc<C>,
    pool_size: usize,
    dial_options: Arc<[DialOption]>,
}

impl<C: Connector> Clone for PoolRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            pools: Arc::clone(&self.pools),
            connector: Arc::clone(&self.connector),
            pool_size: self.pool_size,
            dial_options: Arc::clone(&self.dial_options),
        }
    }
}

impl PoolRegistry<TcpConnector> {
    /// Create a registry dialing plain TCP
    pub fn with_tcp(config: PoolConfiguration) -> Self {
        Self::new(TcpConnector, config)
    }
}

impl<C: Connector> PoolRegistry<C> {
    /// Create an empty registry
    ///
    /// A pool size of 0 becomes 10, and empty dial options become insecure
    /// transport credentials.
    pub fn new(connector: C, config: PoolConfiguration) -> Self {
        Self {
            pools: Arc::new(DashMap::new()),
            connector: Arc::new(connector),
            pool_size: config.effective_pool_size(),
            dial_options: config.effective_dial_options().into(),
        }
    }

    /// Get a connection to `target`, creating its pool on first use
    ///
    /// Fails with [`PoolError::Dial`] when the pool cannot be built, in which
    /// case nothing is registered for `target`, or when a broken connection
    /// cannot be replaced.
    pub fn get_connection(&self, target: &str) -> PoolResult<Arc<C::Connection>> {
        if let Some(pool) = self.pool(target) {
            return pool.acquire();
        }

        self.create_pool(target)?.acquire()
    }

    /// Get a connection without blocking the async runtime
    ///
    /// Dialing is blocking, so the lookup runs on tokio's blocking pool.
    pub async fn get_connection_async(&self, target: &str) -> PoolResult<Arc<C::Connection>> {
        let registry = self.clone();
        let target = target.to_string();

        tokio::task::spawn_blocking(move || registry.get_connection(&target))
            .await
            .map_err(|_| PoolError::Cancelled)?
    }

    fn create_pool(&self, target: &str) -> PoolResult<Arc<ConnectionPool<C>>> {
        let built = Arc::new(ConnectionPool::new(
            self.pool_size,
            target,
            Arc::clone(&self.connector),
            self.dial_options.to_vec(),
        )?);

        let existing = match self.pools.entry(target.to_string()) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&built));
                None
            }
        };

        match existing {
            Some(winner) => {
                // Our pool was never shared, nobody else can hold its connections
                debug!(target_addr = target, "pool created concurrently, discarding duplicate");
                built.close_all();
                Ok(winner)
            }
            None => {
                info!(target_addr = target, capacity = built.capacity(), "registered connection pool");
                Ok(built)
            }
        }
    }

    /// Pool registered for `target`, if any
    pub fn pool(&self, target: &str) -> Option<Arc<ConnectionPool<C>>> {
        self.pools.get(target).map(|entry| Arc::clone(entry.value()))
    }

    /// Targets with a registered pool
    pub fn targets(&self) -> Vec<String> {
        self.pools.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered pools
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Connector shared by all pools
    pub fn connector(&self) -> &Arc<C> {
        &self.connector
    }

    /// Metrics of every registered pool
    pub fn get_metrics(&self) -> Vec<PoolMetrics> {
        self.pools.iter().map(|entry| entry.value().get_metrics()).collect()
    }

    /// Export metrics of every pool in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        crate::metrics::MetricsExporter::export_prometheus(&self.get_metrics(), tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConnector;
    use crate::transport::{Connection, ConnectivityState, TransportCredentials};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn mock_registry(pool_size: usize) -> PoolRegistry<MockConnector> {
        PoolRegistry::new(MockConnector::new(), PoolConfiguration::new().with_pool_size(pool_size))
    }

    #[test]
    fn test_sequential_calls_share_pool() {
        let registry = mock_registry(2);

        let first = registry.get_connection("svc:1").unwrap();
        let second = registry.get_connection("svc:1").unwrap();
        let third = registry.get_connection("svc:1").unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.connector().dials(), 2);
        assert_eq!((first.id, second.id, third.id), (0, 1, 0));
    }

    #[test]
    fn test_each_target_gets_own_pool() {
        let registry = mock_registry(2);

        registry.get_connection("svc:1").unwrap();
        registry.get_connection("svc:2").unwrap();

        let mut targets = registry.targets();
        targets.sort();
        assert_eq!(targets, vec!["svc:1".to_string(), "svc:2".to_string()]);
        assert_eq!(registry.connector().dials(), 4);
    }

    #[test]
    fn test_default_configuration_applied() {
        let registry = PoolRegistry::new(MockConnector::new(), PoolConfiguration::new().with_pool_size(0));

        registry.get_connection("svc:1").unwrap();

        assert_eq!(registry.pool("svc:1").unwrap().capacity(), 10);
        let options = registry.connector().seen_options();
        assert_eq!(options.len(), 10);
        assert!(options.iter().all(|opts| {
            opts == &vec![DialOption::TransportCredentials(TransportCredentials::Insecure)]
        }));
    }

    #[test]
    fn test_failed_construction_registers_nothing() {
        let registry = PoolRegistry::new(MockConnector::failing_after(1), PoolConfiguration::new().with_pool_size(3));

        let err = registry.get_connection("svc:1").unwrap_err();

        assert!(err.is_dial());
        assert!(registry.pool("svc:1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_first_use_keeps_single_pool() {
        let connector = MockConnector::new().with_delay(Duration::from_millis(5));
        let registry = PoolRegistry::new(connector, PoolConfiguration::new().with_pool_size(2));

        let workers = 8;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let registry = registry.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.get_connection("svc:1").unwrap()
                })
            })
            .collect();

        let conns: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        // Only the registered pool's connections are handed out and left open
        assert!(conns.iter().all(|conn| conn.state() == ConnectivityState::Ready));
        let opened = registry.connector().opened();
        let open = opened.iter().filter(|conn| conn.closes() == 0).count();
        assert_eq!(open, 2);
        let closed = opened.iter().filter(|conn| conn.closes() == 1).count();
        assert_eq!(open + closed, opened.len());
        assert_eq!(opened.len() % 2, 0);
    }

    #[test]
    fn test_registry_repairs_connections() {
        let registry = mock_registry(1);
        let conn = registry.get_connection("svc:1").unwrap();
        conn.set_state(ConnectivityState::Shutdown);

        let fresh = registry.get_connection("svc:1").unwrap();

        assert_ne!(fresh.id, conn.id);
        assert_eq!(conn.closes(), 1);
        assert_eq!(registry.get_metrics()[0].replacements, 1);
    }

    #[tokio::test]
    async fn test_async_get_connection() {
        let registry = mock_registry(3);

        let conn = registry.get_connection_async("svc:1").await.unwrap();

        assert_eq!(conn.id, 0);
        assert_eq!(registry.len(), 1);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_export_prometheus() {
        let registry = mock_registry(2);
        registry.get_connection("svc:1").unwrap();

        let output = registry.export_metrics_prometheus(None).unwrap();

        assert!(output.contains("connpool_capacity{target=\"svc:1\"} 2"));
        assert!(output.contains("connpool_acquired_total{target=\"svc:1\"} 1"));
    }
}
