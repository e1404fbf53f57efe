//! Property-based tests for the transmit ring.
//!
//! Random sequences of pushes and completions are run against a `VecDeque`
//! model of the unread bytes. The ring must agree with the model after every
//! step, and the bytes that reach the sink must be exactly the accepted ones,
//! in order.

use proptest::prelude::*;
use std::collections::VecDeque;
use txring_rs::sim::ManualDma;
use txring_rs::{Config, StartError, TransferSpan, TransferState, TxRing};

#[derive(Debug, Clone)]
enum Op {
    Push(Vec<u8>),
    Complete,
    CompletePartial(usize),
    RejectNext,
    Spurious(usize),
    Kick,
}

fn core_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(any::<u8>(), 0..12).prop_map(Op::Push),
        2 => Just(Op::Complete),
        1 => (1usize..8).prop_map(Op::CompletePartial),
    ]
}

fn faulty_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(any::<u8>(), 0..12).prop_map(Op::Push),
        2 => Just(Op::Complete),
        1 => Just(Op::RejectNext),
        1 => (0usize..8).prop_map(Op::Spurious),
        1 => Just(Op::Kick),
    ]
}

fn new_ring(bits: u8) -> TxRing<ManualDma> {
    TxRing::new(Config::new(bits, usize::MAX, true), ManualDma::new()).unwrap()
}

/// Copies out the first `n` bytes of an outstanding span and completes it.
fn finish(ring: &TxRing<ManualDma>, span: TransferSpan, n: usize, sink: &mut Vec<u8>) {
    // SAFETY: the ring is alive and this span has not been completed; the
    // bytes are copied out before the completion releases them.
    unsafe {
        sink.extend_from_slice(&span.as_slice()[..n]);
        ring.on_transfer_complete(n);
    }
}

/// Completes every remaining span (retrying rejected starts) until drained.
fn drain(ring: &TxRing<ManualDma>, mut outstanding: Option<TransferSpan>, sink: &mut Vec<u8>) {
    loop {
        if let Some(span) = outstanding.take().or_else(|| ring.engine().take_request()) {
            finish(ring, span, span.len(), sink);
            continue;
        }
        if ring.is_drained() {
            break;
        }
        ring.try_start_transfer();
    }
}

// =============================================================================
// Order and accounting
// "bytes observed at the sink, in order, equal bytes accepted, in order"
// =============================================================================

proptest! {
    #[test]
    fn prop_sink_matches_accepted_bytes(
        bits in 2u8..6,
        ops in prop::collection::vec(core_op(), 1..80),
    ) {
        let ring = new_ring(bits);
        let producer = ring.producer().unwrap();
        let capacity = ring.capacity();
        let usable = capacity - 1;

        let mut unread: VecDeque<u8> = VecDeque::new();
        let mut accepted = Vec::new();
        let mut sink = Vec::new();
        let mut outstanding: Option<TransferSpan> = None;

        for op in ops {
            match op {
                Op::Push(data) => {
                    let expected = data.len().min(usable - unread.len());
                    let n = producer.push(&data);
                    prop_assert_eq!(n, expected);
                    unread.extend(&data[..n]);
                    accepted.extend_from_slice(&data[..n]);
                }
                Op::Complete | Op::CompletePartial(_) => {
                    if let Some(span) = outstanding.take() {
                        let n = match op {
                            Op::CompletePartial(k) => k.min(span.len()),
                            _ => span.len(),
                        };
                        finish(&ring, span, n, &mut sink);
                        unread.drain(..n);
                    }
                }
                _ => unreachable!(),
            }

            if let Some(span) = ring.engine().take_request() {
                prop_assert!(outstanding.is_none(), "second transfer started while in flight");
                prop_assert!(span.offset() + span.len() <= capacity, "span crosses wrap");
                prop_assert!(span.len() <= unread.len());
                let front: Vec<u8> = unread.iter().take(span.len()).copied().collect();
                // SAFETY: the ring is alive and this span has not been completed.
                prop_assert_eq!(unsafe { span.as_slice() }.to_vec(), front);
                outstanding = Some(span);
            }

            prop_assert_eq!(ring.engine().requests(), 0);
            prop_assert_eq!(ring.len(), unread.len());
            // Never stuck: unread data always has a transfer behind it.
            prop_assert!(unread.is_empty() || ring.state() == TransferState::Transferring);
            prop_assert_eq!(ring.state() == TransferState::Transferring, outstanding.is_some());
        }

        drain(&ring, outstanding, &mut sink);
        prop_assert_eq!(sink, accepted);
    }
}

// =============================================================================
// Overflow
// "exactly the bytes up to the limit are accepted; excess bytes are dropped"
// =============================================================================

proptest! {
    #[test]
    fn prop_overflow_accepts_prefix_up_to_usable(
        bits in 2u8..6,
        pushes in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..20), 1..10),
    ) {
        let ring = new_ring(bits);
        let producer = ring.producer().unwrap();
        let usable = ring.capacity() - 1;

        let all: Vec<u8> = pushes.concat();
        let total: usize = pushes.iter().map(|p| producer.push(p)).sum();

        let limit = all.len().min(usable);
        prop_assert_eq!(total, limit);
        prop_assert_eq!(ring.metrics().bytes_dropped as usize, all.len() - limit);

        let mut sink = Vec::new();
        drain(&ring, None, &mut sink);
        prop_assert_eq!(&sink[..], &all[..limit]);
    }
}

// =============================================================================
// Drain idempotence
// "calling the start operation when already in-flight or when empty has no
//  observable effect on state"
// =============================================================================

proptest! {
    #[test]
    fn prop_drain_is_idempotent(
        bits in 2u8..6,
        data in prop::collection::vec(any::<u8>(), 0..40),
        kicks in 1usize..5,
    ) {
        let ring = new_ring(bits);
        let producer = ring.producer().unwrap();
        producer.push(&data);

        let len = ring.len();
        let state = ring.state();
        let started = ring.metrics().transfers_started;

        for _ in 0..kicks {
            prop_assert!(!ring.try_start_transfer());
        }

        prop_assert_eq!(ring.len(), len);
        prop_assert_eq!(ring.state(), state);
        prop_assert_eq!(ring.metrics().transfers_started, started);
        prop_assert!(ring.engine().requests() <= 1);
    }
}

// =============================================================================
// Fault absorption
// Rejected starts and spurious completions never lose or corrupt bytes.
// =============================================================================

proptest! {
    #[test]
    fn prop_faults_never_lose_accepted_bytes(
        bits in 2u8..6,
        ops in prop::collection::vec(faulty_op(), 1..80),
    ) {
        let ring = new_ring(bits);
        let producer = ring.producer().unwrap();

        let mut accepted = Vec::new();
        let mut sink = Vec::new();
        let mut outstanding: Option<TransferSpan> = None;
        let mut spurious = 0u64;

        for op in ops {
            match op {
                Op::Push(data) => {
                    let n = producer.push(&data);
                    accepted.extend_from_slice(&data[..n]);
                }
                Op::Complete => {
                    if let Some(span) = outstanding.take() {
                        finish(&ring, span, span.len(), &mut sink);
                    }
                }
                Op::RejectNext => ring.engine().reject_next(StartError::Busy),
                Op::Spurious(n) => {
                    if outstanding.is_none() {
                        let len = ring.len();
                        // SAFETY: nothing is in flight, so no span is being read.
                        unsafe { ring.on_transfer_complete(n) };
                        spurious += 1;
                        prop_assert_eq!(ring.len(), len);
                    }
                }
                Op::Kick => {
                    ring.try_start_transfer();
                }
                Op::CompletePartial(_) => unreachable!(),
            }

            if let Some(span) = ring.engine().take_request() {
                prop_assert!(outstanding.is_none());
                outstanding = Some(span);
            }
        }

        drain(&ring, outstanding, &mut sink);
        prop_assert_eq!(sink, accepted);
        prop_assert_eq!(ring.metrics().spurious_completions, spurious);
    }
}
