//! Pool configuration options

use crate::transport::{DialOption, TransportCredentials};

/// Number of connections per target when none is configured
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Configuration applied to every pool created by a [`crate::PoolRegistry`]
///
/// # Examples
///
/// ```
/// use esox_connpool::{DialOption, PoolConfiguration};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_pool_size(20)
///     .with_dial_option(DialOption::ConnectTimeout(Duration::from_secs(2)));
///
/// assert_eq!(config.pool_size, 20);
/// assert_eq!(config.dial_options.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration {
    /// Number of connections kept per target, 0 means the default
    pub pool_size: usize,

    /// Options passed to every dial, empty means insecure transport
    pub dial_options: Vec<DialOption>,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            dial_options: Vec::new(),
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of connections per target
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_connpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_pool_size(0);
    /// assert_eq!(config.effective_pool_size(), 10);
    /// ```
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Append a dial option
    pub fn with_dial_option(mut self, option: DialOption) -> Self {
        self.dial_options.push(option);
        self
    }

    /// Replace all dial options
    pub fn with_dial_options(mut self, options: Vec<DialOption>) -> Self {
        self.dial_options = options;
        self
    }

    /// Pool size actually used, falling back to [`DEFAULT_POOL_SIZE`]
    pub fn effective_pool_size(&self) -> usize {
        if self.pool_size == 0 {
            DEFAULT_POOL_SIZE
        } else {
            self.pool_size
        }
    }

    /// Dial options actually used
    ///
    /// An empty list dials with insecure transport credentials, since the
    /// transport requires credentials to be chosen explicitly.
    pub fn effective_dial_options(&self) -> Vec<DialOption> {
        if self.dial_options.is_empty() {
            vec![DialOption::TransportCredentials(TransportCredentials::Insecure)]
        } else {
            self.dial_options.clone()
        }
    }
}
