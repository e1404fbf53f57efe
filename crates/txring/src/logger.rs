//! `log` facade backend that writes records into a transmit ring.
//!
//! Installing a [`TxLogger`] turns every `info!`/`warn!`/... in the program
//! into non-blocking DMA output. Records that arrive while the logger is
//! already writing are dropped rather than deadlocking.
//!
//! The ring's own diagnostics (targets under this crate) are never written
//! back into it: a completion's restart logs a `trace!`, and sending that
//! line would need another transfer, which logs again.

use crate::{Producer, TransferEngine, TxError, TxRing};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fmt::Write as _;
use std::sync::Mutex;

/// Logger that formats records into a [`TxRing`].
pub struct TxLogger<E: TransferEngine + 'static> {
    producer: Mutex<Producer<'static, E>>,
    level: LevelFilter,
}

impl<E: TransferEngine + 'static> TxLogger<E> {
    /// Takes the ring's producer slot for the logger.
    pub fn new(ring: &'static TxRing<E>, level: LevelFilter) -> Result<Self, TxError> {
        Ok(Self {
            producer: Mutex::new(ring.producer()?),
            level,
        })
    }

    /// Installs this logger as the global `log` backend.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

/// True for records emitted by this crate itself.
fn is_own_target(target: &str) -> bool {
    let krate = module_path!().split("::").next().unwrap_or_default();
    target
        .strip_prefix(krate)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl<E: TransferEngine + 'static> Log for TxLogger<E> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level && !is_own_target(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Busy means re-entered from inside our own push.
        let Ok(mut producer) = self.producer.try_lock() else {
            return;
        };
        writeln!(
            producer,
            "[{:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        )
        .ok();
    }

    fn flush(&self) {
        if let Ok(producer) = self.producer.try_lock() {
            let ring = producer.ring();
            ring.flush_timeout(ring.config().flush_timeout);
        }
    }
}
