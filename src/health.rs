//! Health checks for connections and pools

use crate::errors::{PoolError, PoolResult};
use crate::transport::Connection;

/// Check whether a connection is usable
///
/// Returns [`PoolError::ConnectionBroken`] when the connection reports
/// `TransientFailure` or `Shutdown`. This only reads cached transport state.
///
/// # Examples
///
/// ```
/// use esox_connpool::{check_state, Connection, ConnectivityState, PoolError};
///
/// struct Closed;
///
/// impl Connection for Closed {
///     fn state(&self) -> ConnectivityState { ConnectivityState::Shutdown }
///     fn close(&self) {}
/// }
///
/// assert!(matches!(check_state(&Closed), Err(PoolError::ConnectionBroken)));
/// ```
pub fn check_state<C: Connection + ?Sized>(conn: &C) -> PoolResult<()> {
    if conn.state().is_healthy() {
        Ok(())
    } else {
        Err(PoolError::ConnectionBroken)
    }
}

/// Health status of a connection pool
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether every slot holds a healthy connection
    pub is_healthy: bool,

    /// Number of slots in the pool
    pub capacity: usize,

    /// Slots holding a healthy connection
    pub healthy_slots: usize,

    /// Slots holding a connection in TransientFailure or Shutdown
    pub unhealthy_slots: usize,

    /// Slots without a connection (last replacement dial failed)
    pub empty_slots: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    pub(crate) fn new(healthy: usize, unhealthy: usize, empty: usize) -> Self {
        let capacity = healthy + unhealthy + empty;
        let mut warnings = Vec::new();

        if unhealthy > 0 {
            warnings.push(format!("{} of {} connections are broken", unhealthy, capacity));
        }
        if empty > 0 {
            warnings.push(format!("{} of {} slots are empty", empty, capacity));
        }

        Self {
            is_healthy: warnings.is_empty(),
            capacity,
            healthy_slots: healthy,
            unhealthy_slots: unhealthy,
            empty_slots: empty,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ConnectivityState;

    struct Fixed(ConnectivityState);

    impl Connection for Fixed {
        fn state(&self) -> ConnectivityState {
            self.0
        }

        fn close(&self) {}
    }

    #[test]
    fn test_check_state_only_fails_for_broken_states() {
        assert!(check_state(&Fixed(ConnectivityState::Idle)).is_ok());
        assert!(check_state(&Fixed(ConnectivityState::Connecting)).is_ok());
        assert!(check_state(&Fixed(ConnectivityState::Ready)).is_ok());
        assert!(matches!(
            check_state(&Fixed(ConnectivityState::TransientFailure)),
            Err(PoolError::ConnectionBroken)
        ));
        assert!(matches!(
            check_state(&Fixed(ConnectivityState::Shutdown)),
            Err(PoolError::ConnectionBroken)
        ));
    }

    #[test]
    fn test_health_status_warnings() {
        let status = HealthStatus::new(3, 0, 0);
        assert!(status.is_healthy());
        assert_eq!(status.capacity, 3);

        let status = HealthStatus::new(1, 1, 1);
        assert!(!status.is_healthy());
        assert_eq!(status.warnings.len(), 2);
    }
}
