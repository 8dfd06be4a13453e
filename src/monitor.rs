//! Host-side bookkeeping for monitor intervals.
//!
//! A transport that has no interval accounting of its own can use
//! [`MonitorTracker`] to number its intervals, count what was sent and lost
//! while each one ran, and turn that into the [`IntervalReport`] the
//! controller expects. Durations are reported in microseconds.
//!
//! 宿主侧的监控区间记录。时长以微秒为单位报告。

use crate::controller::{IntervalReport, MonitorId};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
struct OpenInterval {
    id: MonitorId,
    started_at: Instant,
    sent: u64,
    lost: u64,
    rtt_sum: Duration,
    rtt_samples: u32,
}

/// Numbers monitor intervals and accumulates their statistics.
///
/// 为监控区间编号并累积其统计信息。
#[derive(Debug, Clone, Default)]
pub struct MonitorTracker {
    next_id: u64,
    open: Option<OpenInterval>,
}

impl MonitorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The interval currently open, if any.
    pub fn current(&self) -> Option<MonitorId> {
        self.open.as_ref().map(|open| open.id)
    }

    /// Opens a new interval at `now` and returns its id. An interval that is
    /// still open is abandoned without a report.
    ///
    /// 在 `now` 打开一个新区间并返回其 id。仍处于打开状态的区间将被放弃。
    pub fn begin(&mut self, now: Instant) -> MonitorId {
        let id = MonitorId(self.next_id);
        self.next_id += 1;
        if let Some(abandoned) = self.open.take() {
            trace!(id = %abandoned.id, "Monitor interval abandoned");
        }
        self.open = Some(OpenInterval {
            id,
            started_at: now,
            sent: 0,
            lost: 0,
            rtt_sum: Duration::ZERO,
            rtt_samples: 0,
        });
        id
    }

    pub fn on_packets_sent(&mut self, count: u64) {
        if let Some(open) = self.open.as_mut() {
            open.sent += count;
        }
    }

    pub fn on_packets_lost(&mut self, count: u64) {
        if let Some(open) = self.open.as_mut() {
            open.lost += count;
        }
    }

    pub fn on_rtt_sample(&mut self, rtt: Duration) {
        if let Some(open) = self.open.as_mut() {
            open.rtt_sum += rtt;
            open.rtt_samples += 1;
        }
    }

    /// Closes the open interval at `now` and reports it. The elapsed time is
    /// at least one microsecond; the RTT is the mean of the samples taken,
    /// or zero if there were none.
    ///
    /// 在 `now` 关闭打开的区间并生成报告。
    pub fn finish(&mut self, now: Instant) -> Option<IntervalReport> {
        let open = self.open.take()?;
        let elapsed = now.saturating_duration_since(open.started_at);
        let rtt = if open.rtt_samples > 0 {
            open.rtt_sum / open.rtt_samples
        } else {
            Duration::ZERO
        };

        let report = IntervalReport {
            total_packets: open.sent,
            lost_packets: open.lost.min(open.sent),
            elapsed: (elapsed.as_secs_f64() * 1_000_000.0).max(1.0),
            interval_id: open.id,
            ended_id: open.id,
            rtt: rtt.as_secs_f64() * 1_000_000.0,
        };
        trace!(
            id = %open.id,
            sent = report.total_packets,
            lost = report.lost_packets,
            elapsed_us = report.elapsed,
            rtt_us = report.rtt,
            "Monitor interval finished"
        );
        Some(report)
    }
}
