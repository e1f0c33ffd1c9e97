//! Saturates every core for a while so the monitor has something to react to.
//!
//! Usage: `cargo run --example stress [seconds]` (defaults to 60).

use std::hint::black_box;
use std::thread;
use std::time::{Duration, Instant};

fn burn(deadline: Instant) -> u64 {
    let mut acc = 0u64;
    while Instant::now() < deadline {
        for j in 0..1_000_000u64 {
            acc = acc.wrapping_add(black_box(j * j / (j + 1)));
        }
    }
    acc
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let seconds = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>()?,
        None => 60,
    };
    let workers = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    let deadline = Instant::now() + Duration::from_secs(seconds);

    println!("Starting CPU stress test on {workers} cores for {seconds}s");
    let handles: Vec<_> = (0..workers)
        .map(|id| {
            thread::spawn(move || {
                println!("Starting worker {id}");
                burn(deadline)
            })
        })
        .collect();

    println!("Stress test running, press Ctrl+C to stop early...");
    for handle in handles {
        let _ = black_box(handle.join());
    }
    println!("Stress test completed");

    Ok(())
}
