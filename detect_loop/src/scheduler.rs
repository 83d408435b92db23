//! Per-frame scheduling primitive.
//!
use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Cooperative yield point between detection cycles.
///
/// The loop awaits `next_tick` unconditionally once per iteration,
/// whether or not the cycle body ran. Tests substitute a counting
/// implementation.
pub trait FrameScheduler {
    fn next_tick(&mut self) -> impl std::future::Future<Output = ()> + Send;
}

/// Wall-clock scheduler ticking at a fixed rate.
///
/// Missed ticks are skipped rather than bursted, so a slow inference does
/// not cause a backlog of catch-up cycles.
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn from_hz(hz: u32) -> Self {
        let hz = hz.max(1);
        Self::new(Duration::from_secs_f64(1.0 / hz as f64))
    }
}

impl FrameScheduler for IntervalScheduler {
    async fn next_tick(&mut self) {
        self.interval.tick().await;
    }
}
