//! The seam between the ring and the block-transfer hardware.
//!
//! A [`TransferEngine`] is anything that can move a contiguous run of bytes
//! to an output sink asynchronously: a UART TX DMA channel, a USB endpoint,
//! or one of the simulators in [`crate::sim`]. The ring hands it a
//! [`TransferSpan`] and expects exactly one call to
//! [`TxRing::on_transfer_complete`](crate::TxRing::on_transfer_complete)
//! for every request it accepts.

use crate::StartError;

/// A read-only view of committed ring storage handed to the engine.
///
/// The span stays valid until the engine reports completion for it. The
/// producer never writes into an in-flight span, so the bytes do not change
/// underneath the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSpan {
    ptr: *const u8,
    offset: usize,
    len: usize,
}

// SAFETY: the span is an address/length pair describing bytes the ring will
// not touch until the transfer completes. Moving it to the context that
// drives the peripheral (or a simulator thread) is the whole point.
unsafe impl Send for TransferSpan {}
unsafe impl Sync for TransferSpan {}

impl TransferSpan {
    pub(crate) fn new(ptr: *const u8, offset: usize, len: usize) -> Self {
        Self { ptr, offset, len }
    }

    /// Source address to program into the peripheral.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Offset of the first byte inside the ring storage.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes to move.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the span is empty (never true for spans the ring starts).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Views the span as a byte slice.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - the ring that produced this span is still alive, and
    /// - completion for this span has not been reported yet.
    ///
    /// After completion the slots may be overwritten by the producer.
    #[inline]
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        std::slice::from_raw_parts(self.ptr, self.len)
    }
}

/// An asynchronous one-shot block mover.
///
/// `start_transfer` is called from whichever context runs the drain: the
/// producer's or the completion handler's. It must not block.
///
/// # Contract
///
/// - Returning `Ok(())` means the transfer was accepted. The engine must
///   later call `TxRing::on_transfer_complete` exactly once for it, after
///   it has stopped reading the span.
/// - Returning `Err` means nothing was started and no completion will
///   follow. The ring retries on the next push or completion.
pub trait TransferEngine: Send + Sync {
    /// Requests an asynchronous move of `span.len()` bytes from `span.as_ptr()`.
    fn start_transfer(&self, span: TransferSpan) -> Result<(), StartError>;

    /// Returns the engine name for debugging.
    fn name(&self) -> &str {
        "transfer-engine"
    }
}

impl<E: TransferEngine + ?Sized> TransferEngine for &E {
    fn start_transfer(&self, span: TransferSpan) -> Result<(), StartError> {
        (**self).start_transfer(span)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<E: TransferEngine + ?Sized> TransferEngine for Box<E> {
    fn start_transfer(&self, span: TransferSpan) -> Result<(), StartError> {
        (**self).start_transfer(span)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
