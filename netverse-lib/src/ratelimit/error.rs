use thiserror::Error;

use crate::ratelimit::GovernorKey;

/// Errors that can occur during rate limiting operations
#[derive(Error, Debug)]
pub enum RateLimitError {
    /// The overflow queue of a key already holds `capacity` operations
    #[error("Overflow queue for {key} is full ({capacity} pending operations)")]
    QueueFull {
        /// The key whose queue is full
        key: GovernorKey,
        /// Configured queue size of that key
        capacity: usize,
    },

    /// A queued operation was discarded before it could run,
    /// e.g. because the runtime shut down while it was waiting
    #[error("Queued operation for {key} was dropped before it could run")]
    QueueDropped {
        /// The key the operation was queued for
        key: GovernorKey,
    },

    /// User specified limits the governor cannot work with
    #[error("Invalid rate limit configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration
        reason: String,
    },
}
