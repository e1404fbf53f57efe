//! Error types for txring operations.

use thiserror::Error;

/// Errors raised while validating a [`Config`](crate::Config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The ring size exponent is zero or too large.
    #[error("ring_bits {bits} out of range (expected 1..={max})")]
    RingBitsOutOfRange {
        /// The rejected exponent.
        bits: u8,
        /// The largest accepted exponent.
        max: u8,
    },

    /// A transfer limit of zero would never drain the ring.
    #[error("max_transfer must be at least 1")]
    ZeroMaxTransfer,
}

/// Errors returned by producer-side operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TxError {
    /// Another producer handle is still alive for this ring.
    #[error("ring already has a live producer")]
    ProducerTaken,

    /// The block does not fit in the free space (all-or-nothing push).
    #[error("ring is full: {requested} bytes requested, {available} free")]
    Full {
        /// Bytes the caller tried to enqueue.
        requested: usize,
        /// Free bytes at the time of the attempt.
        available: usize,
    },
}

impl TxError {
    /// Returns `true` if retrying later can succeed (e.g., `Full`).
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full { .. })
    }
}

/// Reasons a [`TransferEngine`](crate::TransferEngine) declines a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartError {
    /// The peripheral is still busy with another request.
    #[error("transfer engine busy")]
    Busy,

    /// The peripheral (or its driver task) is gone.
    #[error("transfer engine disconnected")]
    Disconnected,
}
