//! Plain TCP transport

use crate::transport::{Connection, ConnectivityState, Connector, DialOption, TransportCredentials};

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Errors raised while dialing over TCP
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Target {0} did not resolve to any address")]
    InvalidTarget(String),

    #[error("Transport credentials {0:?} are not supported over plain TCP")]
    UnsupportedCredentials(TransportCredentials),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Connector opening blocking TCP streams
///
/// # Examples
///
/// ```no_run
/// use esox_connpool::{Connector, TcpConnector};
///
/// let conn = TcpConnector.dial("127.0.0.1:50051", &[]).unwrap();
/// println!("connected to {}", conn.peer_addr());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Connection = TcpConnection;
    type Error = TransportError;

    fn dial(&self, target: &str, options: &[DialOption]) -> Result<TcpConnection, TransportError> {
        let mut timeout = None;
        let mut nodelay = None;

        for option in options {
            match option {
                DialOption::TransportCredentials(TransportCredentials::Insecure) => {}
                DialOption::TransportCredentials(creds) => {
                    return Err(TransportError::UnsupportedCredentials(creds.clone()));
                }
                DialOption::ConnectTimeout(t) => timeout = Some(*t),
                DialOption::NoDelay(flag) => nodelay = Some(*flag),
            }
        }

        let stream = connect(target, timeout)?;
        if let Some(flag) = nodelay {
            stream.set_nodelay(flag)?;
        }

        let peer = stream.peer_addr()?;
        trace!(target_addr = target, %peer, "tcp connection established");

        Ok(TcpConnection {
            stream,
            peer,
            state: AtomicU8::new(ConnectivityState::Ready.as_u8()),
        })
    }
}

fn connect(target: &str, timeout: Option<Duration>) -> Result<TcpStream, TransportError> {
    let addrs: Vec<SocketAddr> = target.to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(TransportError::InvalidTarget(target.to_string()));
    }

    let mut last_err = None;
    for addr in &addrs {
        let attempt = match timeout {
            Some(t) => TcpStream::connect_timeout(addr, t),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }

    match last_err {
        Some(e) => Err(TransportError::Io(e)),
        None => Err(TransportError::InvalidTarget(target.to_string())),
    }
}

/// A pooled TCP stream with a cached connectivity state
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer: SocketAddr,
    state: AtomicU8,
}

impl TcpConnection {
    /// The underlying stream, `&TcpStream` implements `Read` and `Write`
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Address of the remote end
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of the socket
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Record that I/O on this connection failed
    ///
    /// The pool replaces the connection the next time its slot comes up.
    pub fn mark_transient_failure(&self) {
        let _ = self.state.compare_exchange(
            ConnectivityState::Ready.as_u8(),
            ConnectivityState::TransientFailure.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

impl Connection for TcpConnection {
    fn state(&self) -> ConnectivityState {
        ConnectivityState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn close(&self) {
        let previous = self.state.swap(ConnectivityState::Shutdown.as_u8(), Ordering::AcqRel);
        if previous != ConnectivityState::Shutdown.as_u8() {
            // The peer may already be gone
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }
}
