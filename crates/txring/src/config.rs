use crate::ConfigError;
use std::time::Duration;

/// Largest supported ring size as power of 2 (16M slots).
pub const MAX_RING_BITS: u8 = 24;

/// How long a blocking flush waits for the ring to drain by default.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Configuration for a [`TxRing`](crate::TxRing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Ring buffer size as power of 2 (default: 10 = 1024 bytes)
    pub ring_bits: u8,
    /// Longest span handed to the transfer engine in one request.
    ///
    /// DMA peripherals count transfers in a fixed-width register, so a
    /// single request cannot exceed it (default: 65535, a 16-bit counter).
    pub max_transfer: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
    /// Upper bound for `io::Write::flush` and `TxLogger` flushes
    pub flush_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(ring_bits: u8, max_transfer: usize, enable_metrics: bool) -> Self {
        Self {
            ring_bits,
            max_transfer,
            enable_metrics,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    /// Returns the capacity of the ring buffer (slots, including the
    /// reserved one).
    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.ring_bits
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }

    /// Returns how many bytes the ring can hold at once.
    ///
    /// One slot is kept free so that `write == read` always means empty.
    #[inline]
    pub const fn usable_capacity(&self) -> usize {
        self.capacity() - 1
    }

    /// Sets the ring size as a power of 2.
    pub const fn with_ring_bits(mut self, ring_bits: u8) -> Self {
        self.ring_bits = ring_bits;
        self
    }

    /// Sets the per-request transfer limit.
    pub const fn with_max_transfer(mut self, max_transfer: usize) -> Self {
        self.max_transfer = max_transfer;
        self
    }

    /// Enables or disables metrics collection.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Sets how long blocking flushes wait.
    pub const fn with_flush_timeout(mut self, flush_timeout: Duration) -> Self {
        self.flush_timeout = flush_timeout;
        self
    }

    /// Checks that the configuration describes a usable ring.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_bits == 0 || self.ring_bits > MAX_RING_BITS {
            return Err(ConfigError::RingBitsOutOfRange {
                bits: self.ring_bits,
                max: MAX_RING_BITS,
            });
        }
        if self.max_transfer == 0 {
            return Err(ConfigError::ZeroMaxTransfer);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_bits: 10, // 1K slots
            max_transfer: u16::MAX as usize,
            enable_metrics: false,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }
}

/// Small console ring (256 bytes) for memory-constrained targets
pub const SMALL_CONFIG: Config = Config::new(8, u16::MAX as usize, false);

/// Debug console ring (1K bytes, metrics on for field diagnostics)
pub const CONSOLE_CONFIG: Config = Config::new(10, u16::MAX as usize, true);

/// Bulk output ring (16K bytes)
pub const LARGE_CONFIG: Config = Config::new(14, u16::MAX as usize, false);
