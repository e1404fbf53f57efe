//! Scenario tests for the transmit ring.
//!
//! Each test drives a ring with `ManualDma`, so every transfer request and
//! completion happens at a known point and can be checked exactly.

use txring_rs::sim::ManualDma;
use txring_rs::{Config, StartError, TransferState, TxRing};

/// 8 slots, one reserved: 7 usable bytes.
fn ring8() -> TxRing<ManualDma> {
    TxRing::new(Config::new(3, usize::MAX, true), ManualDma::new()).unwrap()
}

/// Reports completion for the span the test just finished with.
fn complete(ring: &TxRing<ManualDma>, n: usize) {
    // SAFETY: scenarios never touch a span after completing it.
    unsafe { ring.on_transfer_complete(n) }
}

/// Returns `(offset, len)` of the outstanding request, completing it in full.
fn complete_next(ring: &TxRing<ManualDma>) -> Option<(usize, usize)> {
    let span = ring.engine().take_request()?;
    complete(ring, span.len());
    Some((span.offset(), span.len()))
}

#[test]
fn push_five_then_complete_leaves_ring_empty() {
    let ring = ring8();
    let producer = ring.producer().unwrap();

    assert_eq!(producer.push(b"ABCDE"), 5);
    assert_eq!(complete_next(&ring), Some((0, 5)));

    assert!(ring.is_drained());
    assert_eq!(ring.engine().requests(), 0);
    assert_eq!(complete_next(&ring), None);
}

#[test]
fn linear_region_is_sent_in_one_span() {
    let ring = ring8();
    let producer = ring.producer().unwrap();

    // read = write = 2
    producer.push(b"..");
    complete_next(&ring);

    // write = 6, read = 2: no wrap between them
    producer.push(b"ABCD");
    assert_eq!(complete_next(&ring), Some((2, 4)));
    assert!(ring.is_drained());
}

#[test]
fn wrapped_region_is_sent_in_two_spans() {
    let ring = ring8();
    let producer = ring.producer().unwrap();

    producer.push(b"..");
    complete_next(&ring);

    // From offset 2, seven bytes wrap: write ends at 1.
    assert_eq!(producer.push(b"ABCDEFG"), 7);

    let first = ring.engine().take_request().unwrap();
    assert_eq!((first.offset(), first.len()), (2, 6));
    // SAFETY: ring alive, span not yet completed.
    assert_eq!(unsafe { first.as_slice() }, b"ABCDEF");
    complete(&ring, first.len());

    let second = ring.engine().take_request().unwrap();
    assert_eq!((second.offset(), second.len()), (0, 1));
    // SAFETY: ring alive, span not yet completed.
    assert_eq!(unsafe { second.as_slice() }, b"G");
    complete(&ring, second.len());

    assert!(ring.is_drained());
}

#[test]
fn ten_bytes_into_seven_slots_drops_last_three() {
    let ring = ring8();
    let producer = ring.producer().unwrap();

    assert_eq!(producer.push(b"0123456789"), 7);
    let sent = ring.engine().drain_into_vec(&ring);

    assert_eq!(sent, b"0123456");
    let m = ring.metrics();
    assert_eq!(m.bytes_pushed, 7);
    assert_eq!(m.bytes_dropped, 3);
    assert_eq!(m.bytes_transferred, 7);
}

#[test]
fn in_flight_span_is_never_overwritten() {
    let ring = ring8();
    let producer = ring.producer().unwrap();

    producer.push(b"ABC");
    let span = ring.engine().take_request().unwrap();

    // Fill the rest while the first span is in flight.
    assert_eq!(producer.push(b"defghij"), 4);
    // SAFETY: ring alive, span not yet completed.
    assert_eq!(unsafe { span.as_slice() }, b"ABC");
    complete(&ring, span.len());

    assert_eq!(ring.engine().drain_into_vec(&ring), b"defg");
}

#[test]
fn completion_restarts_until_empty() {
    let ring = ring8();
    let producer = ring.producer().unwrap();

    producer.push(b"ab");
    producer.push(b"cd");
    producer.push(b"ef");

    assert_eq!(complete_next(&ring), Some((0, 2)));
    assert_eq!(ring.state(), TransferState::Transferring);
    assert_eq!(complete_next(&ring), Some((2, 4)));
    assert_eq!(ring.state(), TransferState::Idle);
    assert!(ring.is_drained());
}

#[test]
fn rejected_start_is_retried_by_next_completion_or_push() {
    let ring = ring8();
    let producer = ring.producer().unwrap();

    producer.push(b"ab");
    ring.engine().reject_next(StartError::Busy);
    producer.push(b"cd");

    // The completion's restart is rejected: nothing outstanding, data kept.
    assert_eq!(complete_next(&ring), Some((0, 2)));
    assert_eq!(ring.state(), TransferState::Idle);
    assert_eq!(ring.len(), 2);
    assert_eq!(ring.metrics().start_rejections, 1);

    // An explicit drain (or the next push) picks it up.
    assert!(ring.try_start_transfer());
    assert_eq!(complete_next(&ring), Some((2, 2)));
    assert!(ring.is_drained());
}

#[test]
fn many_wraps_preserve_byte_order() {
    let ring = ring8();
    let producer = ring.producer().unwrap();
    let mut expected = Vec::new();
    let mut sent = Vec::new();

    for round in 0u8..20 {
        let chunk: Vec<u8> = (0..5).map(|i| round * 5 + i).collect();
        assert_eq!(producer.push(&chunk), 5);
        expected.extend_from_slice(&chunk);
        sent.extend(ring.engine().drain_into_vec(&ring));
    }

    assert_eq!(sent, expected);
    assert_eq!(ring.metrics().bytes_dropped, 0);
}
