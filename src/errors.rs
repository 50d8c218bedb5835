//! Error types for the connection pool

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("Failed to dial {target}: {source}")]
    Dial {
        target: String,
        source: Arc<dyn StdError + Send + Sync>,
    },

    #[error("Connection is broken - state is Shutdown or TransientFailure")]
    ConnectionBroken,

    #[error("Operation was cancelled")]
    Cancelled,
}

impl PoolError {
    pub(crate) fn dial<E>(target: &str, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        PoolError::Dial {
            target: target.to_string(),
            source: Arc::new(source),
        }
    }

    /// Whether this error came from a failed dial
    pub fn is_dial(&self) -> bool {
        matches!(self, PoolError::Dial { .. })
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
