//! Debug assertion macros for transmit ring invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.
//!
//! Used by `TxRing<E>`.

// =============================================================================
// INV-CUR-01: Cursor Range
// =============================================================================

/// Assert that a cursor is a valid slot index.
///
/// **Invariant**: `0 ≤ cursor < capacity`
///
/// Used in: `push()` and `on_transfer_complete()` before publishing a cursor
macro_rules! debug_assert_cursor_in_range {
    ($name:literal, $cursor:expr, $capacity:expr) => {
        debug_assert!(
            $cursor < $capacity,
            "INV-CUR-01 violated: {} cursor {} outside capacity {}",
            $name,
            $cursor,
            $capacity
        )
    };
}

// =============================================================================
// INV-CUR-02: One Slot Reserved
// =============================================================================

/// Assert that a push leaves at least one slot free.
///
/// **Invariant**: `unread ≤ capacity - 1`, so `write == read` only when empty
///
/// Used in: `push()` after computing the new write cursor
macro_rules! debug_assert_slot_reserved {
    ($unread:expr, $capacity:expr) => {
        debug_assert!(
            $unread < $capacity,
            "INV-CUR-02 violated: {} unread bytes in ring of capacity {}",
            $unread,
            $capacity
        )
    };
}

// =============================================================================
// INV-SPAN-01: Span Never Crosses Wrap
// =============================================================================

/// Assert that a transfer span stays inside the physical storage.
///
/// **Invariant**: `offset + len ≤ capacity` and `len > 0`
///
/// Used in: `try_start_transfer()` before handing the span to the engine
macro_rules! debug_assert_span_contiguous {
    ($offset:expr, $len:expr, $capacity:expr) => {
        debug_assert!(
            $len > 0 && $offset + $len <= $capacity,
            "INV-SPAN-01 violated: span [{}, {}) crosses end of storage ({})",
            $offset,
            $offset + $len,
            $capacity
        )
    };
}

// =============================================================================
// INV-SPAN-02: Completion Stays Within Unread Data
// =============================================================================

/// Assert that a completion never releases bytes that were not written.
///
/// **Invariant**: `advance ≤ unread` at completion time
///
/// Used in: `on_transfer_complete()` before advancing the read cursor
macro_rules! debug_assert_advance_within_unread {
    ($advance:expr, $unread:expr) => {
        debug_assert!(
            $advance <= $unread,
            "INV-SPAN-02 violated: releasing {} bytes with only {} unread",
            $advance,
            $unread
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_advance_within_unread;
pub(crate) use debug_assert_cursor_in_range;
pub(crate) use debug_assert_slot_reserved;
pub(crate) use debug_assert_span_contiguous;
