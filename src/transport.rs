//! Transport abstraction the pool dials through
//!
//! The pool never speaks a wire protocol itself. It only needs to open a
//! connection, read its cached connectivity state and close it. Anything that
//! can do those three things can be pooled, see [`crate::TcpConnector`] for a
//! plain TCP implementation.

use std::error;
use std::fmt;
use std::time::Duration;

/// Connectivity state reported by a transport connection
///
/// # Examples
///
/// ```
/// use esox_connpool::ConnectivityState;
///
/// assert!(ConnectivityState::Ready.is_healthy());
/// assert!(ConnectivityState::Idle.is_healthy());
/// assert!(!ConnectivityState::Shutdown.is_healthy());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectivityState {
    /// Not connected, will connect on demand
    Idle,

    /// Connection is being established
    Connecting,

    /// Connection is established and usable
    Ready,

    /// Connection failed and the transport is backing off
    TransientFailure,

    /// Connection was closed and can never be used again
    Shutdown,
}

impl ConnectivityState {
    /// Whether a connection in this state may be handed out
    pub fn is_healthy(self) -> bool {
        !matches!(self, ConnectivityState::TransientFailure | ConnectivityState::Shutdown)
    }

    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            ConnectivityState::Idle => 0,
            ConnectivityState::Connecting => 1,
            ConnectivityState::Ready => 2,
            ConnectivityState::TransientFailure => 3,
            ConnectivityState::Shutdown => 4,
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectivityState::Idle,
            1 => ConnectivityState::Connecting,
            2 => ConnectivityState::Ready,
            3 => ConnectivityState::TransientFailure,
            _ => ConnectivityState::Shutdown,
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectivityState::Idle => "IDLE",
            ConnectivityState::Connecting => "CONNECTING",
            ConnectivityState::Ready => "READY",
            ConnectivityState::TransientFailure => "TRANSIENT_FAILURE",
            ConnectivityState::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

/// Credentials used to secure the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCredentials {
    /// Plaintext, no TLS
    Insecure,

    /// TLS, verifying the peer against `server_name`
    Tls { server_name: String },
}

/// Option applied to every dial of a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialOption {
    TransportCredentials(TransportCredentials),

    /// Upper bound for establishing a single connection
    ConnectTimeout(Duration),

    /// Disable Nagle's algorithm on the socket
    NoDelay(bool),
}

/// A live connection owned by a pool
///
/// Implementations must make [`state`](Connection::state) a cheap read of
/// cached state. The pool calls it on every acquisition.
pub trait Connection: Send + Sync + 'static {
    /// Current connectivity state, without any network round trip
    fn state(&self) -> ConnectivityState;

    /// Release the transport resources held by this connection
    fn close(&self);
}

/// Factory for connections to a target
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by `dial`
    type Connection: Connection;

    /// Error returned when a dial fails
    type Error: error::Error + Send + Sync + 'static;

    /// Establish a new connection to `target`
    ///
    /// Timeouts and cancellation are entirely the connector's business, the
    /// pool adds none of its own.
    fn dial(&self, target: &str, options: &[DialOption]) -> Result<Self::Connection, Self::Error>;
}
