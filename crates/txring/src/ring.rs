use crate::engine::{TransferEngine, TransferSpan};
use crate::invariants::{
    debug_assert_advance_within_unread, debug_assert_cursor_in_range, debug_assert_slot_reserved,
    debug_assert_span_contiguous,
};
use crate::{Config, ConfigError, Metrics, MetricsSnapshot, Producer, TxError};
use crossbeam_utils::{Backoff, CachePadded};
use log::{debug, trace, warn};
use std::cell::UnsafeCell;
use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// The ring is touched from two contexts: the producer (ordinary program flow
// calling push) and the completion handler (an interrupt, or a driver thread
// on a host). Nothing here takes a lock; every shared field is a single
// atomic with a fixed set of writers.
//
// ## Cursors
//
// `write` and `read` are wrapped slot indices in `[0, capacity)`. One slot is
// always left free, so `write == read` means empty and the usable size is
// `capacity - 1`.
//
// - `write`: only the producer stores it.
// - `read`: only the completion handler stores it, and only while a transfer
//   is in flight.
//
// **Producer (push):**
// 1. Load `write` with Relaxed (only producer writes it)
// 2. Load `read` with Acquire (synchronizes with completion's Release;
//    the engine is done reading slots before `read` moves past them)
// 3. Copy bytes into free slots (never inside the in-flight span)
// 4. Store `write` with Release (publishes bytes to the drain)
// 5. Run the drain
//
// **Completion:**
// 1. Take `pending` with an AcqRel swap (0 means nothing outstanding)
// 2. Store `read` with Release (hands the slots back to the producer)
// 3. Release `in_flight` with an AcqRel swap
// 4. Run the drain
//
// ## Drain
//
// The drain runs from both contexts, so the in-flight flag is *claimed*
// with `swap(true)`: whoever reads back `false` owns the right to start a
// transfer. A caller that reads back `true` has still written to the flag,
// and every release is a `swap(false)` as well. With claim and release both
// read-modify-writes on the same location, the releasing side always
// acquires from any claim attempt that preceded it, and so sees the bytes
// that attempt published. Either the late pusher claims the flag itself or
// the releasing side re-reads `write` and finds its bytes: a push racing
// with a completion cannot leave data stranded.
//
// The flag is therefore never checked with a plain load on the drain path;
// a load that reads `true` and gives up would create no such edge.
//
// =============================================================================

/// Whether a transfer is currently owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// No transfer outstanding; the ring may still hold data.
    Idle,
    /// A span has been handed to the engine and not yet completed.
    Transferring,
}

/// DMA-drained transmit ring - the core building block.
///
/// Bytes are pushed by a single [`Producer`] and drained by a
/// [`TransferEngine`] one contiguous span at a time. Each completion
/// advances the read cursor and immediately starts the next span, so output
/// keeps flowing without the producer ever waiting.
///
/// # Example
///
/// ```
/// use txring_rs::sim::ManualDma;
/// use txring_rs::{Config, TxRing};
///
/// let ring = TxRing::new(Config::new(3, 64, true), ManualDma::new()).unwrap();
/// let producer = ring.producer().unwrap();
///
/// // Capacity 8 keeps one slot free: 7 bytes fit, the rest are dropped.
/// assert_eq!(producer.push(b"0123456789"), 7);
///
/// // The push started a transfer for the contiguous span.
/// let span = ring.engine().take_request().unwrap();
/// assert_eq!((span.offset(), span.len()), (0, 7));
///
/// // The engine's interrupt handler reports completion.
/// // SAFETY: the engine is done reading the span.
/// unsafe { ring.on_transfer_complete(span.len()) };
/// assert!(ring.is_drained());
/// assert_eq!(ring.metrics().bytes_dropped, 3);
/// ```
#[repr(C)]
pub struct TxRing<E> {
    // === PRODUCER HOT === (cache-line padded)
    /// Next free slot (written by producer, read by drain)
    write: CachePadded<AtomicUsize>,

    // === COMPLETION HOT === (cache-line padded)
    /// Oldest unsent slot (written by completion, read by producer and drain)
    read: CachePadded<AtomicUsize>,

    // === TRANSFER STATE ===
    /// True while a span is owned by the engine (claimed by drain, cleared by completion)
    in_flight: CachePadded<AtomicBool>,
    /// Length of the outstanding request; 0 when none
    pending: AtomicUsize,

    // === COLD STATE ===
    /// Whether a `Producer` handle is alive
    producer_taken: AtomicBool,
    /// Thread-safe metrics (uses atomics internally)
    metrics: Metrics,
    config: Config,
    engine: E,

    // === DATA BUFFER ===
    /// Byte storage. `UnsafeCell` per slot so the producer can fill free
    /// slots while the engine reads the in-flight span.
    storage: Box<[UnsafeCell<u8>]>,
}

// Safety: the storage is only written by the single producer, and only in
// slots outside the unread region; everything else is atomics. The engine
// is shared between both contexts, hence `E: Sync`.
unsafe impl<E: Sync> Sync for TxRing<E> {}

impl<E: TransferEngine> TxRing<E> {
    /// Creates a ring bound to `engine`, empty and idle.
    ///
    /// This is the channel's one-time initialization; the ring lives as long
    /// as the output channel that owns it.
    pub fn new(config: Config, engine: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = config.capacity();

        let storage = (0..capacity)
            .map(|_| UnsafeCell::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            write: CachePadded::new(AtomicUsize::new(0)),
            read: CachePadded::new(AtomicUsize::new(0)),
            in_flight: CachePadded::new(AtomicBool::new(false)),
            pending: AtomicUsize::new(0),
            producer_taken: AtomicBool::new(false),
            metrics: Metrics::new(),
            config,
            engine,
            storage,
        })
    }

    /// Registers the ring's single producer.
    ///
    /// Returns `TxError::ProducerTaken` while another handle is alive.
    pub fn producer(&self) -> Result<Producer<'_, E>, TxError> {
        self.producer_taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TxError::ProducerTaken)?;
        Ok(Producer::new(self))
    }

    pub(crate) fn release_producer(&self) {
        self.producer_taken.store(false, Ordering::Release);
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the number of slots, including the reserved one.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// Returns the configuration the ring was built with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the bound transfer engine.
    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the number of bytes not yet confirmed sent (includes the in-flight span).
    #[inline]
    pub fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read) & self.mask()
    }

    /// Returns true if every pushed byte has been released by a completion.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.write.load(Ordering::Acquire) == self.read.load(Ordering::Acquire)
    }

    /// Returns true if the next pushed byte would be dropped.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.config.usable_capacity()
    }

    /// Returns how many bytes a push could accept right now.
    #[inline]
    pub fn free(&self) -> usize {
        self.config.usable_capacity() - self.len()
    }

    /// Returns whether a transfer is outstanding.
    #[inline]
    pub fn state(&self) -> TransferState {
        if self.in_flight.load(Ordering::Acquire) {
            TransferState::Transferring
        } else {
            TransferState::Idle
        }
    }

    /// Returns true when the ring is empty and no transfer is outstanding.
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.state() == TransferState::Idle && self.is_empty()
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    // ---------------------------------------------------------------------
    // PRODUCER API (reached through `Producer`)
    // ---------------------------------------------------------------------

    /// Free slots as seen from the producer's own write cursor.
    #[inline]
    fn free_from(&self, write: usize) -> usize {
        let read = self.read.load(Ordering::Acquire);
        self.config.usable_capacity() - (write.wrapping_sub(read) & self.mask())
    }

    /// Copies as much of `data` as fits, drops the rest, then drains.
    pub(crate) fn push(&self, data: &[u8]) -> usize {
        let write = self.write.load(Ordering::Relaxed);
        let accepted = data.len().min(self.free_from(write));

        if accepted > 0 {
            self.copy_in(write, &data[..accepted]);
        }

        if self.config.enable_metrics {
            self.metrics.add_bytes_pushed(accepted as u64);
            self.metrics.add_bytes_dropped((data.len() - accepted) as u64);
        }

        self.try_start_transfer();
        accepted
    }

    /// Copies all of `data` or nothing, then drains.
    pub(crate) fn push_all(&self, data: &[u8]) -> Result<(), TxError> {
        let write = self.write.load(Ordering::Relaxed);
        let available = self.free_from(write);

        let result = if data.len() > available {
            Err(TxError::Full {
                requested: data.len(),
                available,
            })
        } else {
            if !data.is_empty() {
                self.copy_in(write, data);
            }
            if self.config.enable_metrics {
                self.metrics.add_bytes_pushed(data.len() as u64);
            }
            Ok(())
        };

        self.try_start_transfer();
        result
    }

    /// Internal: write `data` at `write` (wrapping) and publish the new cursor.
    ///
    /// Caller has checked that `data.len()` fits in the free space.
    fn copy_in(&self, write: usize, data: &[u8]) {
        let capacity = self.capacity();
        let read = self.read.load(Ordering::Acquire);

        // INV-CUR-02: One Slot Reserved - never fill the last free slot
        debug_assert_slot_reserved!((write.wrapping_sub(read) & self.mask()) + data.len(), capacity);

        let (before_wrap, after_wrap) = data.split_at(data.len().min(capacity - write));

        // SAFETY: Storage access is safe because:
        // 1. `write < capacity`, and the two segments cover `[write, capacity)`
        //    and `[0, after_wrap.len())`, both inside the allocation
        // 2. These slots are free: the caller checked `data.len()` against the
        //    space left before `read`, so none of them is unread or in flight
        // 3. Only the producer writes slots, and there is one producer
        // 4. The Release store to `write` below publishes the bytes
        unsafe {
            let base = self.base_ptr();
            ptr::copy_nonoverlapping(before_wrap.as_ptr(), base.add(write), before_wrap.len());
            ptr::copy_nonoverlapping(after_wrap.as_ptr(), base, after_wrap.len());
        }

        let new_write = (write + data.len()) & self.mask();

        // INV-CUR-01: Cursor Range
        debug_assert_cursor_in_range!("write", new_write, capacity);

        self.write.store(new_write, Ordering::Release);
    }

    #[inline]
    fn base_ptr(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.storage.as_ptr())
    }

    // ---------------------------------------------------------------------
    // DRAIN
    // ---------------------------------------------------------------------

    /// Starts a transfer for the next contiguous span, if possible.
    ///
    /// A no-op (returning `false`) while a transfer is in flight or when the
    /// ring is empty. Otherwise the span runs from the read cursor up to the
    /// write cursor, or up to the physical end of storage when the unread
    /// region wraps; the post-wrap part goes out after this one completes.
    /// Spans are also capped at `Config::max_transfer`.
    ///
    /// If the engine declines, the flag is reset so a later push or
    /// completion can retry. The rejection is counted, never returned.
    pub fn try_start_transfer(&self) -> bool {
        loop {
            if self.write.load(Ordering::Acquire) == self.read.load(Ordering::Acquire) {
                return false;
            }

            if self.in_flight.swap(true, Ordering::AcqRel) {
                // Another context owns the drain; our write to the flag makes
                // its release see the bytes published before this call.
                return false;
            }

            let read = self.read.load(Ordering::Acquire);
            let write = self.write.load(Ordering::Acquire);
            if write == read {
                // Drained by someone else between the check and the claim.
                self.in_flight.swap(false, Ordering::AcqRel);
                continue;
            }

            let len = self.span_len(read, write);

            // INV-SPAN-01: Span Never Crosses Wrap
            debug_assert_span_contiguous!(read, len, self.capacity());

            self.pending.store(len, Ordering::Release);

            // SAFETY: `read < capacity` (INV-CUR-01), so the address is in bounds.
            let span = TransferSpan::new(unsafe { self.base_ptr().add(read) }, read, len);

            return match self.engine.start_transfer(span) {
                Ok(()) => {
                    if self.config.enable_metrics {
                        self.metrics.add_transfer_started();
                    }
                    trace!("{}: started transfer [{}, {})", self.engine.name(), read, read + len);
                    true
                }
                Err(err) => {
                    self.pending.store(0, Ordering::Release);
                    self.in_flight.swap(false, Ordering::AcqRel);
                    if self.config.enable_metrics {
                        self.metrics.add_start_rejection();
                    }
                    debug!(
                        "{}: transfer of {} bytes rejected ({}), will retry",
                        self.engine.name(),
                        len,
                        err
                    );
                    false
                }
            };
        }
    }

    /// Length of the contiguous unread run starting at `read`.
    #[inline]
    fn span_len(&self, read: usize, write: usize) -> usize {
        let contiguous = if write > read {
            write - read
        } else {
            self.capacity() - read
        };
        contiguous.min(self.config.max_transfer)
    }

    // ---------------------------------------------------------------------
    // COMPLETION
    // ---------------------------------------------------------------------

    /// Called by the engine (typically from its interrupt handler) when the
    /// transfer it accepted has finished.
    ///
    /// Advances the read cursor, clears the in-flight flag and starts the
    /// next span if data remains. The reported length is clamped to what was
    /// requested; a mismatch is counted and logged. A completion while
    /// nothing is in flight is ignored.
    ///
    /// # Safety
    ///
    /// The call hands the in-flight span's slots back to the producer, which
    /// may overwrite them immediately. The caller must ensure that nothing
    /// reads the outstanding [`TransferSpan`] after this call: in practice,
    /// only the engine that accepted the span reports its completion, once,
    /// after it has finished reading. Calls with nothing in flight are
    /// detected and ignored.
    ///
    /// Reporting completion is not something safe code can do on the
    /// engine's behalf:
    ///
    /// ```compile_fail
    /// use txring_rs::sim::ManualDma;
    /// use txring_rs::{Config, TxRing};
    ///
    /// let ring = TxRing::new(Config::default(), ManualDma::new()).unwrap();
    /// ring.on_transfer_complete(4);
    /// ```
    pub unsafe fn on_transfer_complete(&self, bytes_transferred: usize) {
        if !self.in_flight.load(Ordering::Acquire) {
            self.spurious_completion(bytes_transferred);
            return;
        }

        // Taking `pending` makes a duplicate completion for the same request
        // (or one that lands while a drain is still claiming) see 0.
        let requested = self.pending.swap(0, Ordering::AcqRel);
        if requested == 0 {
            self.spurious_completion(bytes_transferred);
            return;
        }

        let advance = if bytes_transferred == requested {
            requested
        } else {
            if self.config.enable_metrics {
                self.metrics.add_length_mismatch();
            }
            warn!(
                "{}: completion reported {} bytes for a {}-byte transfer, clamping",
                self.engine.name(),
                bytes_transferred,
                requested
            );
            bytes_transferred.min(requested)
        };

        let capacity = self.capacity();
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);

        // INV-SPAN-02: Completion Stays Within Unread Data
        debug_assert_advance_within_unread!(advance, write.wrapping_sub(read) & self.mask());

        let new_read = (read + advance) & self.mask();

        // INV-CUR-01: Cursor Range
        debug_assert_cursor_in_range!("read", new_read, capacity);

        self.read.store(new_read, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_transfer_completed(advance as u64);
        }

        self.in_flight.swap(false, Ordering::AcqRel);
        self.try_start_transfer();
    }

    fn spurious_completion(&self, bytes_transferred: usize) {
        if self.config.enable_metrics {
            self.metrics.add_spurious_completion();
        }
        warn!(
            "{}: ignoring completion of {} bytes with no transfer in flight",
            self.engine.name(),
            bytes_transferred
        );
    }

    // ---------------------------------------------------------------------
    // FLUSH
    // ---------------------------------------------------------------------

    /// Polls for the ring to drain with a short adaptive backoff. Spins,
    /// yields, then gives up.
    ///
    /// Best effort: the backoff completes after a few microseconds, far less
    /// than a single byte takes on a slow line, so this only reports `true`
    /// when the ring is already (nearly) drained. Use
    /// [`flush_timeout`](Self::flush_timeout) to actually wait. Each round
    /// also retries the drain, so data held back by a rejected start goes
    /// out once the engine accepts again. Not for use in completion context.
    pub fn flush_with_backoff(&self) -> bool {
        let backoff = Backoff::new();
        while !self.is_drained() {
            if backoff.is_completed() {
                return false;
            }
            self.try_start_transfer();
            backoff.snooze();
        }
        true
    }

    /// Waits up to `timeout` for the ring to drain.
    ///
    /// Returns `true` once everything pushed so far has been sent, `false`
    /// if the deadline passes first. Like [`flush_with_backoff`](Self::flush_with_backoff)
    /// it retries the drain on every round. Never call it from completion
    /// context: the completion it waits for could not run.
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();
        while !self.is_drained() {
            if Instant::now() >= deadline {
                return false;
            }
            self.try_start_transfer();
            backoff.snooze();
        }
        true
    }
}

impl<E> Drop for TxRing<E> {
    fn drop(&mut self) {
        if *self.in_flight.get_mut() {
            warn!("transmit ring dropped with a transfer in flight");
        }
    }
}

impl<E: TransferEngine> fmt::Debug for TxRing<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxRing")
            .field("engine", &self.engine.name())
            .field("capacity", &self.capacity())
            .field("write", &self.write.load(Ordering::Relaxed))
            .field("read", &self.read.load(Ordering::Relaxed))
            .field("state", &self.state())
            .finish()
    }
}
