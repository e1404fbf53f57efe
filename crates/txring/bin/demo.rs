//! Console redirection demo.
//!
//! A `ThreadedDma` worker plays a 115200-baud UART: each byte takes ~87us
//! on the wire. The program prints through the ring with `writeln!` and the
//! `log` macros and never waits for the line; the worker's completion
//! "interrupt" keeps the ring draining in the background.

use log::{info, warn, LevelFilter};
use std::error::Error;
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use txring_rs::sim::ThreadedDma;
use txring_rs::{TransferEngine, TxLogger, TxRing, CONSOLE_CONFIG};

const BYTE_TIME: Duration = Duration::from_micros(87);

fn main() -> Result<(), Box<dyn Error>> {
    println!("txring Console Demo");
    println!("===================\n");

    let (ring, sink) = ThreadedDma::spawn(CONSOLE_CONFIG, BYTE_TIME)?;
    // The logger needs the ring for the rest of the program.
    let ring: &'static TxRing<ThreadedDma> = Box::leak(Box::new(ring));

    println!("Configuration:");
    println!("  Ring capacity: {} bytes ({} usable)", ring.capacity(), ring.config().usable_capacity());
    println!("  Max transfer: {} bytes", ring.config().max_transfer);
    println!("  Engine: {}\n", ring.engine().name());

    // Plain formatted output through a producer handle.
    let start = Instant::now();
    {
        let mut console = ring.producer()?;
        for task in 0..4 {
            writeln!(console, "task {} ready", task)?;
        }
    }
    let queued = ring.len();
    println!(
        "Queued {} bytes in {:?} (wire time ~{:?})",
        queued,
        start.elapsed(),
        BYTE_TIME * queued as u32
    );

    // Same ring, now behind the `log` facade.
    TxLogger::new(ring, LevelFilter::Info)?.install()?;
    info!("logger attached");
    for i in 0..40 {
        info!("sample {} = {}", i, i * i);
    }
    warn!("this line may be cut short if the ring filled up");
    log::logger().flush();

    let pushed = ring.metrics().bytes_pushed as usize;
    if !sink.wait_for(pushed, Duration::from_secs(10)) {
        println!("timed out waiting for the line to drain");
    }

    println!("\n--- wire output ---");
    print!("{}", String::from_utf8_lossy(&sink.contents()));
    println!("-------------------\n");

    let m = ring.metrics();
    println!("Metrics:");
    println!("  Bytes pushed:       {}", m.bytes_pushed);
    println!("  Bytes dropped:      {}", m.bytes_dropped);
    println!("  Bytes transferred:  {}", m.bytes_transferred);
    println!("  Transfers started:  {}", m.transfers_started);
    println!("  Start rejections:   {}", m.start_rejections);

    Ok(())
}
