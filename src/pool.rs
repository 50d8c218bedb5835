//! Round-robin connection pool for a single target

use crate::config::DEFAULT_POOL_SIZE;
use crate::errors::{PoolError, PoolResult};
use crate::health::HealthStatus;
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::transport::{Connection, Connector, DialOption};

use arc_swap::ArcSwapOption;
use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed set of connections to one target, handed out round-robin
///
/// Every slot is dialed when the pool is created. Afterwards a slot is only
/// touched when an [`acquire`](ConnectionPool::acquire) lands on it and finds
/// its connection broken or missing; the connection is then closed and
/// replaced under the pool lock. Healthy acquisitions never lock.
///
/// Connections are shared with callers as `Arc`s. Callers must not close them,
/// the pool closes a connection right before it replaces it.
///
/// # Examples
///
/// ```no_run
/// use esox_connpool::{ConnectionPool, TcpConnector};
/// use std::sync::Arc;
///
/// let pool = ConnectionPool::new(4, "127.0.0.1:50051", Arc::new(TcpConnector), Vec::new()).unwrap();
/// let conn = pool.acquire().unwrap();
/// println!("using {}", conn.peer_addr());
/// ```
pub struct ConnectionPool<C: Connector> {
    target: String,
    capacity: usize,
    slots: Box<[ArcSwapOption<C::Connection>]>,
    cursor: CachePadded<AtomicUsize>,
    connector: Arc<C>,
    dial_options: Arc<[DialOption]>,
    replace_lock: Mutex<()>,
    metrics: MetricsTracker,
}

impl<C: Connector> ConnectionPool<C> {
    /// Create a pool of `capacity` connections to `target`
    ///
    /// A capacity of 0 falls back to the default of 10. All connections are
    /// dialed before this returns. If any dial fails the connections opened so
    /// far are closed and the dial error is returned.
    pub fn new(
        capacity: usize,
        target: impl Into<String>,
        connector: Arc<C>,
        dial_options: Vec<DialOption>,
    ) -> PoolResult<Self> {
        let target = target.into();
        let capacity = if capacity == 0 { DEFAULT_POOL_SIZE } else { capacity };
        let metrics = MetricsTracker::new();

        let mut opened: Vec<Arc<C::Connection>> = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            metrics.dials.fetch_add(1, Ordering::Relaxed);
            match connector.dial(&target, &dial_options) {
                Ok(conn) => opened.push(Arc::new(conn)),
                Err(e) => {
                    warn!(target_addr = %target, opened = opened.len(), error = %e, "initial dial failed, closing pool");
                    for conn in &opened {
                        conn.close();
                    }
                    return Err(PoolError::dial(&target, e));
                }
            }
        }

        let slots = opened
            .into_iter()
            .map(|conn| ArcSwapOption::new(Some(conn)))
            .collect();

        debug!(target_addr = %target, capacity, "connection pool created");

        Ok(Self {
            target,
            capacity,
            slots,
            cursor: CachePadded::new(AtomicUsize::new(0)),
            connector,
            dial_options: dial_options.into(),
            replace_lock: Mutex::new(()),
            metrics,
        })
    }

    /// Get the next connection in round-robin order
    ///
    /// Returns the slot's connection if it is healthy. Otherwise the broken
    /// connection is closed and exactly one caller dials a replacement; others
    /// landing on the same slot wait for it and reuse the new connection. A
    /// failed dial leaves the slot empty and is returned as-is, it is not
    /// retried here.
    pub fn acquire(&self) -> PoolResult<Arc<C::Connection>> {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.capacity;
        let slot = &self.slots[idx];

        let current = slot.load_full();
        if let Some(conn) = &current
            && conn.state().is_healthy()
        {
            self.metrics.fast_path_hits.fetch_add(1, Ordering::Relaxed);
            self.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(conn));
        }

        if let Some(stale) = current {
            self.discard(idx, stale);
        }

        let _guard = self.replace_lock.lock();

        // Someone may have repaired the slot while we waited
        let current = slot.load_full();
        if let Some(conn) = &current
            && conn.state().is_healthy()
        {
            self.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(conn));
        }

        if let Some(stale) = current {
            self.discard(idx, stale);
        }

        self.metrics.dials.fetch_add(1, Ordering::Relaxed);
        match self.connector.dial(&self.target, &self.dial_options) {
            Ok(conn) => {
                let conn = Arc::new(conn);
                slot.store(Some(Arc::clone(&conn)));
                self.metrics.replacements.fetch_add(1, Ordering::Relaxed);
                self.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
                debug!(target_addr = %self.target, slot = idx, "replaced connection");
                Ok(conn)
            }
            Err(e) => {
                self.metrics.dial_failures.fetch_add(1, Ordering::Relaxed);
                warn!(target_addr = %self.target, slot = idx, error = %e, "failed to replace connection");
                Err(PoolError::dial(&self.target, e))
            }
        }
    }

    /// Empty slot `idx` if it still holds `stale`, closing it
    ///
    /// Only the caller whose swap succeeds closes the connection, so a handle
    /// is closed once no matter how many callers saw it broken.
    fn discard(&self, idx: usize, stale: Arc<C::Connection>) {
        let current = Some(stale);
        let previous = self.slots[idx].compare_and_swap(&current, None::<Arc<C::Connection>>);

        let swapped = match (&*previous, &current) {
            (Some(prev), Some(stale)) => Arc::ptr_eq(prev, stale),
            _ => false,
        };

        if swapped && let Some(stale) = current {
            debug!(target_addr = %self.target, slot = idx, state = %stale.state(), "closing broken connection");
            stale.close();
            self.metrics.connections_closed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Close every connection and leave all slots empty
    ///
    /// Used when a freshly built pool loses the race to be registered and was
    /// never shared.
    pub(crate) fn close_all(&self) {
        let _guard = self.replace_lock.lock();
        for slot in self.slots.iter() {
            if let Some(conn) = slot.swap(None) {
                conn.close();
                self.metrics.connections_closed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Target this pool dials
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Dial options used for every connection
    pub fn dial_options(&self) -> &[DialOption] {
        &self.dial_options
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        let (healthy, unhealthy, empty) = self.count_slots();
        HealthStatus::new(healthy, unhealthy, empty)
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        let (healthy, _, _) = self.count_slots();
        self.metrics.get_metrics(&self.target, self.capacity, healthy)
    }

    fn count_slots(&self) -> (usize, usize, usize) {
        let mut healthy = 0;
        let mut unhealthy = 0;
        let mut empty = 0;

        for slot in self.slots.iter() {
            match &*slot.load() {
                Some(conn) if conn.state().is_healthy() => healthy += 1,
                Some(_) => unhealthy += 1,
                None => empty += 1,
            }
        }

        (healthy, unhealthy, empty)
    }
}
