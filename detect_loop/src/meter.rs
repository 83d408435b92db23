//! Cycle and inference rate metering.
//!
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::{task::JoinHandle, time::interval};

pub static METER: Meter = Meter::new();

#[derive(Default)]
pub struct Meter {
    cycles: AtomicU64,
    inferences: AtomicU64,
}

impl Meter {
    pub const fn new() -> Meter {
        Meter {
            cycles: AtomicU64::new(0),
            inferences: AtomicU64::new(0),
        }
    }

    /// Count one loop invocation, gated or not.
    pub fn tick_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one completed inference.
    pub fn tick_inference(&self) {
        self.inferences.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_reset_cycles(&self) -> u64 {
        self.cycles.swap(0, Ordering::Relaxed)
    }

    pub fn get_reset_inferences(&self) -> u64 {
        self.inferences.swap(0, Ordering::Relaxed)
    }
}

pub fn spawn_meter_logger() -> JoinHandle<()> {
    tokio::spawn(async {
        let mut log_interval = interval(Duration::from_secs(2));
        log_interval.tick().await;

        loop {
            let start = Instant::now();
            log_interval.tick().await;

            let cycles = METER.get_reset_cycles();
            let inferences = METER.get_reset_inferences();
            let elapsed = start.elapsed().as_secs_f32();
            let cycles_per_sec = cycles as f32 / elapsed;
            let inferences_per_sec = inferences as f32 / elapsed;

            if cycles > 0 {
                log::info!("Cycles per second: {cycles_per_sec:.2}");
            }
            if inferences > 0 {
                log::info!("Inferences per second: {inferences_per_sec:.2}");
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counters_reset_on_read() {
        let meter = Meter::new();
        meter.tick_cycle();
        meter.tick_cycle();
        meter.tick_inference();

        assert_eq!(meter.get_reset_cycles(), 2);
        assert_eq!(meter.get_reset_cycles(), 0);
        assert_eq!(meter.get_reset_inferences(), 1);
    }
}
