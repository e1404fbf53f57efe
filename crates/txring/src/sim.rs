//! Simulated transfer engines for host testing.
//!
//! - [`ManualDma`] queues every accepted span and lets the caller decide
//!   when (and with what length) completion fires. Deterministic; used by
//!   the unit and property tests.
//! - [`ThreadedDma`] hands spans to a worker thread that copies them into a
//!   [`Sink`] and reports completion from that thread, the way a DMA
//!   interrupt preempts the producer on real hardware.

use crate::{Config, ConfigError, StartError, TransferEngine, TransferSpan, TxRing};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MANUAL ENGINE
// =============================================================================

/// Engine that records requests and completes only when told to.
#[derive(Debug, Default)]
pub struct ManualDma {
    requests: Mutex<VecDeque<TransferSpan>>,
    reject: Mutex<Option<StartError>>,
}

impl ManualDma {
    /// Creates an engine with no outstanding requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `start_transfer` fail with `err`.
    pub fn reject_next(&self, err: StartError) {
        *lock(&self.reject) = Some(err);
    }

    /// Number of accepted requests not yet taken.
    pub fn requests(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Pops the oldest accepted request.
    pub fn take_request(&self) -> Option<TransferSpan> {
        lock(&self.requests).pop_front()
    }

    /// Runs every request to completion, returning the bytes in send order.
    ///
    /// Each span is copied out before its completion is reported, then the
    /// completion's restart is picked up on the next loop iteration.
    pub fn drain_into_vec(&self, ring: &TxRing<ManualDma>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(span) = self.take_request() {
            // SAFETY: `ring` is borrowed for the whole call and this span's
            // completion has not been reported yet. The span is copied out
            // before its completion hands the slots back to the producer.
            unsafe {
                out.extend_from_slice(span.as_slice());
                ring.on_transfer_complete(span.len());
            }
        }
        out
    }
}

impl TransferEngine for ManualDma {
    fn start_transfer(&self, span: TransferSpan) -> Result<(), StartError> {
        if let Some(err) = lock(&self.reject).take() {
            return Err(err);
        }
        lock(&self.requests).push_back(span);
        Ok(())
    }

    fn name(&self) -> &str {
        "manual-dma"
    }
}

// =============================================================================
// THREADED ENGINE
// =============================================================================

/// Output collected by a [`ThreadedDma`] worker.
#[derive(Debug, Clone, Default)]
pub struct Sink {
    inner: Arc<(Mutex<Vec<u8>>, Condvar)>,
}

impl Sink {
    fn extend(&self, bytes: &[u8]) {
        let (data, ready) = &*self.inner;
        lock(data).extend_from_slice(bytes);
        ready.notify_all();
    }

    /// Copy of everything received so far.
    pub fn contents(&self) -> Vec<u8> {
        lock(&self.inner.0).clone()
    }

    /// Number of bytes received so far.
    pub fn len(&self) -> usize {
        lock(&self.inner.0).len()
    }

    /// Returns true if nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks until at least `len` bytes arrived or `timeout` passes.
    pub fn wait_for(&self, len: usize, timeout: Duration) -> bool {
        let (data, ready) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut guard = lock(data);
        while guard.len() < len {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = ready
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

/// Engine backed by a worker thread standing in for the DMA interrupt.
///
/// The worker holds only a weak reference to the ring; once the last
/// `Arc<TxRing>` is dropped the channel closes and the worker exits.
#[derive(Debug)]
pub struct ThreadedDma {
    jobs: Sender<TransferSpan>,
}

impl ThreadedDma {
    /// Builds a ring bound to a fresh worker thread.
    ///
    /// `byte_time` is slept per transferred byte to model the line rate
    /// (`Duration::ZERO` for as fast as possible).
    pub fn spawn(config: Config, byte_time: Duration) -> Result<(Arc<TxRing<Self>>, Sink), ConfigError> {
        let (jobs, rx) = mpsc::channel::<TransferSpan>();
        let ring = Arc::new(TxRing::new(config, Self { jobs })?);
        let sink = Sink::default();

        let weak = Arc::downgrade(&ring);
        let worker_sink = sink.clone();
        thread::spawn(move || {
            while let Ok(span) = rx.recv() {
                let Some(ring) = weak.upgrade() else {
                    break;
                };
                if !byte_time.is_zero() {
                    thread::sleep(byte_time * span.len() as u32);
                }
                // SAFETY: we hold a strong reference, so the storage is alive.
                // This worker is the engine that accepted the span: it reads
                // the bytes, then reports completion exactly once.
                unsafe {
                    worker_sink.extend(span.as_slice());
                    ring.on_transfer_complete(span.len());
                }
            }
        });

        Ok((ring, sink))
    }
}

impl TransferEngine for ThreadedDma {
    fn start_transfer(&self, span: TransferSpan) -> Result<(), StartError> {
        self.jobs.send(span).map_err(|_| StartError::Disconnected)
    }

    fn name(&self) -> &str {
        "threaded-dma"
    }
}
