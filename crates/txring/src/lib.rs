//! txring - Non-blocking DMA-Drained Transmit Ring
//!
//! Redirects synchronous character output (`write!`, logging) into a byte
//! ring that a DMA-class peripheral drains in the background. The producer
//! never waits on the hardware: it copies bytes into free slots and, if the
//! peripheral is idle, starts a transfer for the next contiguous span. Each
//! transfer-complete interrupt advances the read cursor and starts the next
//! span, so the ring empties itself.
//!
//! # Key Features
//!
//! - Lock-free: one atomic per shared field, single writer per cursor
//! - Spans never cross the wrap boundary (simple DMA addressing)
//! - Drop-newest overflow policy, counted in metrics
//! - Rejected starts and spurious or misreported completions are absorbed
//! - `fmt::Write` / `io::Write` / `log::Log` glue, no global singleton
//!
//! # Example
//!
//! ```
//! use std::fmt::Write;
//! use txring_rs::sim::ManualDma;
//! use txring_rs::{Config, TxRing};
//!
//! let ring = TxRing::new(Config::default(), ManualDma::new()).unwrap();
//! let mut console = ring.producer().unwrap();
//!
//! writeln!(console, "boot ok, {} tasks", 3).unwrap();
//!
//! // Stand-in for the DMA interrupt: finish every transfer in order.
//! let sent = ring.engine().drain_into_vec(&ring);
//! assert_eq!(sent, b"boot ok, 3 tasks\n");
//! ```

mod config;
mod engine;
mod error;
mod invariants;
mod logger;
mod metrics;
mod producer;
mod ring;
pub mod sim;

pub use config::{
    Config, CONSOLE_CONFIG, DEFAULT_FLUSH_TIMEOUT, LARGE_CONFIG, MAX_RING_BITS, SMALL_CONFIG,
};
pub use engine::{TransferEngine, TransferSpan};
pub use error::{ConfigError, StartError, TxError};
pub use logger::TxLogger;
pub use metrics::{Metrics, MetricsSnapshot};
pub use producer::Producer;
pub use ring::{TransferState, TxRing};
