//! The producer handle and the output-redirection glue built on it.
//!
//! A [`Producer`] is what formatted-print and logging code holds instead of
//! a global console handle. It implements [`core::fmt::Write`] so `write!`
//! and `writeln!` go straight into the ring, and [`std::io::Write`] for code
//! that expects a byte stream. Neither ever blocks on the hardware.

use crate::{TransferEngine, TxError, TxRing};
use std::cell::Cell;
use std::fmt;
use std::io;
use std::marker::PhantomData;

/// Exclusive write access to a [`TxRing`].
///
/// Obtained from [`TxRing::producer`]; at most one exists per ring at a
/// time. The handle can be moved to another thread but not shared, which is
/// what keeps the write cursor single-writer.
pub struct Producer<'a, E: TransferEngine> {
    ring: &'a TxRing<E>,
    /// `!Sync`: two contexts pushing through one handle would race on the storage.
    _not_sync: PhantomData<Cell<()>>,
}

impl<'a, E: TransferEngine> Producer<'a, E> {
    pub(crate) fn new(ring: &'a TxRing<E>) -> Self {
        Self {
            ring,
            _not_sync: PhantomData,
        }
    }

    /// Enqueues as much of `data` as fits and kicks the drain.
    ///
    /// Bytes beyond the free space are silently dropped (and counted in
    /// metrics). Returns how many bytes were accepted.
    ///
    /// # Example
    /// ```ignore
    /// let sent = producer.push(b"hello\r\n");
    /// if sent < 7 {
    ///     // Ring was full; the tail of the message is gone
    /// }
    /// ```
    #[inline]
    pub fn push(&self, data: &[u8]) -> usize {
        self.ring.push(data)
    }

    /// Enqueues all of `data` or nothing.
    ///
    /// Returns `TxError::Full` without touching the ring when the block does
    /// not fit. Useful for framed output that must not be cut in half.
    #[inline]
    pub fn push_all(&self, data: &[u8]) -> Result<(), TxError> {
        self.ring.push_all(data)
    }

    /// Returns the ring this producer writes to.
    #[inline]
    pub fn ring(&self) -> &'a TxRing<E> {
        self.ring
    }
}

impl<E: TransferEngine> Drop for Producer<'_, E> {
    fn drop(&mut self) {
        self.ring.release_producer();
    }
}

impl<E: TransferEngine> fmt::Debug for Producer<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("ring", self.ring).finish()
    }
}

/// Character sink for `write!`. Overflow truncates silently, never errors.
impl<E: TransferEngine> fmt::Write for Producer<'_, E> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s.as_bytes());
        Ok(())
    }
}

/// Byte sink. `write` always reports the full length, like a libc `_write`
/// hook: dropped bytes are a ring policy, not an I/O error, and reporting
/// a short write would make `write_all` spin on a full ring.
impl<E: TransferEngine> io::Write for Producer<'_, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    /// Waits up to `Config::flush_timeout` for the ring to drain.
    fn flush(&mut self) -> io::Result<()> {
        if self.ring.flush_timeout(self.ring.config().flush_timeout) {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "transmit ring still draining",
            ))
        }
    }
}
