//! Counting in-memory transport used by the unit tests

use crate::transport::{Connection, ConnectivityState, Connector, DialOption};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("mock dial to {0} refused")]
pub struct MockDialError(pub String);

#[derive(Debug)]
pub struct MockState {
    state: AtomicU8,
    closes: AtomicUsize,
}

impl MockState {
    pub fn set_state(&self, state: ConnectivityState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MockConnection {
    pub id: usize,
    pub shared: Arc<MockState>,
}

impl MockConnection {
    pub fn set_state(&self, state: ConnectivityState) {
        self.shared.set_state(state);
    }

    pub fn closes(&self) -> usize {
        self.shared.closes()
    }
}

impl Connection for MockConnection {
    fn state(&self) -> ConnectivityState {
        ConnectivityState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    fn close(&self) {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        self.shared.set_state(ConnectivityState::Shutdown);
    }
}

/// Hands out connections with sequential ids starting at 0
#[derive(Default)]
pub struct MockConnector {
    dials: AtomicUsize,
    refuse: AtomicBool,
    fail_after: Option<usize>,
    delay: Option<Duration>,
    opened: Mutex<Vec<Arc<MockState>>>,
    seen_options: Mutex<Vec<Vec<DialOption>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dials succeed `n` times, then fail
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// State of every connection opened so far, in dial order
    pub fn opened(&self) -> Vec<Arc<MockState>> {
        self.opened.lock().clone()
    }

    pub fn seen_options(&self) -> Vec<Vec<DialOption>> {
        self.seen_options.lock().clone()
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;
    type Error = MockDialError;

    fn dial(&self, target: &str, options: &[DialOption]) -> Result<MockConnection, MockDialError> {
        let attempt = self.dials.fetch_add(1, Ordering::SeqCst);
        self.seen_options.lock().push(options.to_vec());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let over_limit = self.fail_after.is_some_and(|n| attempt >= n);
        if over_limit || self.refuse.load(Ordering::SeqCst) {
            return Err(MockDialError(target.to_string()));
        }

        let shared = Arc::new(MockState {
            state: AtomicU8::new(ConnectivityState::Ready.as_u8()),
            closes: AtomicUsize::new(0),
        });

        let mut opened = self.opened.lock();
        let id = opened.len();
        opened.push(Arc::clone(&shared));

        Ok(MockConnection { id, shared })
    }
}
