//! # EsoxSolutions.ConnectionPool (Rust Port)
//!
//! Client-side connection pool for outbound RPC connections. For every
//! target it keeps a fixed number of persistent connections, hands them out
//! round-robin and replaces broken ones the next time they come up.
//!
//! ## Features
//!
//! - Lock-free round-robin acquisition on healthy pools
//! - Lazy, caller-driven replacement of broken connections, no background threads
//! - Double-checked replacement so concurrent callers dial a slot only once
//! - One pool per target, created on first use
//! - Pluggable transport via the [`Connector`] and [`Connection`] traits
//! - Plain TCP transport included
//! - Health status and Prometheus metrics export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use esox_connpool::{check_state, PoolConfiguration, PoolRegistry};
//!
//! let registry = PoolRegistry::with_tcp(PoolConfiguration::new().with_pool_size(8));
//!
//! let conn = registry.get_connection("127.0.0.1:50051").unwrap();
//! assert!(check_state(&*conn).is_ok());
//! // Use the connection, the pool keeps ownership and closes it when needed
//! ```

mod pool;
mod registry;
mod config;
mod metrics;
mod health;
mod transport;
mod tcp;
mod errors;

#[cfg(test)]
mod mock;

pub use pool::ConnectionPool;
pub use registry::PoolRegistry;
pub use config::{PoolConfiguration, DEFAULT_POOL_SIZE};
pub use metrics::PoolMetrics;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use health::{check_state, HealthStatus};
pub use transport::{Connection, ConnectivityState, Connector, DialOption, TransportCredentials};
pub use tcp::{TcpConnection, TcpConnector, TransportError};
pub use errors::{PoolError, PoolResult};
