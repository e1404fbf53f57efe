use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the transmit path.
///
/// Every counter is an independent atomic bumped with `Relaxed` ordering;
/// they are diagnostics, not synchronization. Only updated when
/// `Config::enable_metrics` is set.
#[derive(Debug, Default)]
pub struct Metrics {
    bytes_pushed: AtomicU64,
    bytes_dropped: AtomicU64,
    transfers_started: AtomicU64,
    transfers_completed: AtomicU64,
    bytes_transferred: AtomicU64,
    start_rejections: AtomicU64,
    spurious_completions: AtomicU64,
    length_mismatches: AtomicU64,
}

/// Plain copy of [`Metrics`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Bytes accepted into the ring.
    pub bytes_pushed: u64,
    /// Bytes discarded because the ring was full.
    pub bytes_dropped: u64,
    /// Transfers accepted by the engine.
    pub transfers_started: u64,
    /// Completions that advanced the read cursor.
    pub transfers_completed: u64,
    /// Bytes released by completions.
    pub bytes_transferred: u64,
    /// Start requests the engine declined.
    pub start_rejections: u64,
    /// Completions received while nothing was in flight.
    pub spurious_completions: u64,
    /// Completions whose reported length differed from the request.
    pub length_mismatches: u64,
}

impl Metrics {
    /// Creates a set of counters, all zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_bytes_pushed(&self, n: u64) {
        self.bytes_pushed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_bytes_dropped(&self, n: u64) {
        self.bytes_dropped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_transfer_started(&self) {
        self.transfers_started.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_transfer_completed(&self, bytes: u64) {
        self.transfers_completed.fetch_add(1, Ordering::Relaxed);
        self.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_start_rejection(&self) {
        self.start_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_spurious_completion(&self) {
        self.spurious_completions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_length_mismatch(&self) {
        self.length_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter into a [`MetricsSnapshot`].
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_pushed: self.bytes_pushed.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
            transfers_started: self.transfers_started.load(Ordering::Relaxed),
            transfers_completed: self.transfers_completed.load(Ordering::Relaxed),
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
            start_rejections: self.start_rejections.load(Ordering::Relaxed),
            spurious_completions: self.spurious_completions.load(Ordering::Relaxed),
            length_mismatches: self.length_mismatches.load(Ordering::Relaxed),
        }
    }
}
