//! tests/common/harness.rs
use pcc_gradient::{
    ConnectionState, Controller, IntervalReport, MonitorId, RateControl, RateDecision,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Once;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "pcc_gradient=info".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Bits per packet used to turn a rate into a packet count.
const PACKET_BITS: f64 = 10_000.0;

/// A bottleneck link with a fixed capacity. Anything sent above capacity is
/// dropped and queues up, inflating the RTT.
pub struct SimulatedLink {
    pub capacity: f64,
    pub base_rtt: f64,
    /// Interval length in milliseconds.
    pub interval: f64,
    rng: StdRng,
}

impl SimulatedLink {
    pub fn new(capacity: f64, seed: u64) -> Self {
        Self {
            capacity,
            base_rtt: 30.0,
            interval: 1000.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Runs one interval at `rate` Mbit/s and measures it.
    pub fn run(&mut self, id: MonitorId, rate: f64) -> IntervalReport {
        let total = (rate * 1_000_000.0 * self.interval / 1000.0 / PACKET_BITS).round() as u64;
        let overload = ((rate - self.capacity) / rate).max(0.0);
        let noise = self.rng.random_range(0..=1u64);
        let lost = ((total as f64 * overload).round() as u64 + noise).min(total);
        let jitter = self.rng.random_range(0.0..0.5);
        IntervalReport {
            total_packets: total,
            lost_packets: lost,
            elapsed: self.interval,
            interval_id: id,
            ended_id: id,
            rtt: self.base_rtt * (1.0 + overload) + jitter,
        }
    }
}

/// One start/end callback pair, with the states observed around each call.
pub struct Step {
    pub before_start: ConnectionState,
    pub started: RateDecision,
    pub before_end: ConnectionState,
    pub rate_before_end: f64,
    pub ended: RateDecision,
}

/// Drives `controller` over `link` for `intervals` intervals.
pub fn drive(controller: &mut Controller, link: &mut SimulatedLink, intervals: u64) -> Vec<Step> {
    let mut steps = Vec::with_capacity(intervals as usize);
    for n in 0..intervals {
        let id = MonitorId(n);
        let before_start = controller.state();
        let started = controller.on_monitor_start(id);
        let before_end = controller.state();
        let rate_before_end = controller.rate();
        let report = link.run(id, started.rate);
        let ended = RateControl::on_monitor_end(controller, &report);
        steps.push(Step {
            before_start,
            started,
            before_end,
            rate_before_end,
            ended,
        });
    }
    steps
}
