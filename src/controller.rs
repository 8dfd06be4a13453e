//! Implements the interval-driven rate controller.
//!
//! The controller is driven entirely by its host: the host announces the
//! start of each monitor interval, runs it at the rate the controller chose,
//! and reports the interval's statistics when it ends. From those reports
//! the controller sequences a doubling startup phase and an open-ended
//! search that maximises the interval utility.
//!
//! 实现由监控区间驱动的速率控制器。
//!
//! 控制器完全由宿主驱动：宿主通知每个监控区间的开始，以控制器选择的速率运行，
//! 并在区间结束时报告统计信息。控制器据此依次执行翻倍启动阶段和最大化效用的
//! 持续搜索。

use crate::config::Config;
use crate::error::Result;
use crate::strategy::{GradientDescent, Proposal, SearchStrategy};
use crate::utility::UtilityEvaluator;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

pub mod history;
pub mod limiter;
pub mod stats;

use history::HistoryTracker;
use limiter::RateLimiter;
use stats::{ControllerStats, Counters};

/// Identifies a monitor interval.
/// 标识一个监控区间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorId(pub u64);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MI#{}", self.0)
    }
}

/// The phase of the control loop.
/// 控制循环的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 启动阶段：每个区间速率翻倍
    /// Startup: the rate doubles every interval
    Start,
    /// 下一个区间将用于探测
    /// The next interval perturbs the rate for the search
    Search,
    /// 一个探测区间正在进行，结束时做出决策
    /// A probe interval is running; its end is evaluated
    Decision,
}

/// Statistics of a completed monitor interval, as measured by the host.
///
/// 宿主测量的已完成监控区间的统计信息。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalReport {
    /// Packets sent during the interval.
    pub total_packets: u64,
    /// Packets of the interval detected as lost.
    pub lost_packets: u64,
    /// Interval duration. Must be positive.
    pub elapsed: f64,
    /// The interval the host is currently running.
    pub interval_id: MonitorId,
    /// The interval this report describes.
    pub ended_id: MonitorId,
    /// RTT sample for the interval, in the same unit as `elapsed`'s clock.
    pub rtt: f64,
}

/// The rate the host should pace at after a callback.
///
/// 回调之后宿主应采用的速率。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateDecision {
    /// 新的发送速率（Mbit/s）
    /// New sending rate (Mbit/s)
    pub rate: f64,
    pub state: ConnectionState,
    /// 速率是否发生了变化
    /// Whether the rate changed
    pub rate_changed: bool,
}

/// The callback contract between a transport and a rate controller.
///
/// 传输层与速率控制器之间的回调契约。
pub trait RateControl: Send + 'static {
    /// Called when the host starts a monitor interval.
    ///
    /// 宿主开始一个监控区间时调用。
    fn on_monitor_start(&mut self, id: MonitorId) -> RateDecision;

    /// Called when a monitor interval ends.
    ///
    /// 一个监控区间结束时调用。
    fn on_monitor_end(&mut self, report: &IntervalReport) -> RateDecision;

    /// Called when packets are detected as lost.
    fn on_loss(&mut self, _lost: &[u32]) {}

    /// Called on a retransmission timeout.
    fn on_timeout(&mut self) {}

    /// Called when an acknowledgement arrives.
    fn on_ack(&mut self, _ack: u32) {}

    /// Gets the current sending rate in Mbit/s.
    ///
    /// 获取当前的发送速率（Mbit/s）。
    fn rate(&self) -> f64;

    /// Mean utility of all completed intervals, or 0 if there are none.
    fn avg_utility(&self) -> f64;
}

/// A utility-maximising rate controller for one connection.
///
/// 单个连接的效用最大化速率控制器。
#[derive(Debug)]
pub struct Controller<S: SearchStrategy = GradientDescent> {
    state: ConnectionState,
    /// The interval currently in flight, if any.
    /// 当前正在进行的区间（如果有）。
    in_flight: Option<MonitorId>,
    /// Best utility seen during the current startup phase.
    /// 当前启动阶段中观察到的最佳效用。
    slow_start_utility: f64,
    utility_sum: f64,
    utility: UtilityEvaluator,
    history: HistoryTracker,
    limiter: RateLimiter,
    strategy: S,
    counters: Counters,
}

impl Controller<GradientDescent> {
    /// Creates a controller searching with gradient descent.
    ///
    /// 创建一个使用梯度下降搜索的控制器。
    pub fn gradient(config: Config) -> Result<Self> {
        let strategy = GradientDescent::new(&config);
        Self::new(config, strategy)
    }
}

impl<S: SearchStrategy> Controller<S> {
    /// Creates a controller with the given search strategy.
    ///
    /// 使用给定的搜索策略创建控制器。
    pub fn new(config: Config, strategy: S) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, strategy))
    }

    fn build(config: Config, strategy: S) -> Self {
        Self {
            state: ConnectionState::Start,
            in_flight: None,
            slow_start_utility: f64::NEG_INFINITY,
            utility_sum: 0.0,
            utility: UtilityEvaluator::new(config.utility),
            history: HistoryTracker::new(config.history),
            limiter: RateLimiter::new(config.rate),
            strategy,
            counters: Counters::default(),
        }
    }

    /// 获取当前速率（Mbit/s）
    /// Get current rate (Mbit/s)
    pub fn rate(&self) -> f64 {
        self.limiter.rate()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn in_flight(&self) -> Option<MonitorId> {
        self.in_flight
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Mean utility of all completed intervals, or 0 if there are none.
    ///
    /// 所有已完成区间的平均效用；如果没有则为 0。
    pub fn avg_utility(&self) -> f64 {
        if self.counters.completed_intervals > 0 {
            self.utility_sum / self.counters.completed_intervals as f64
        } else {
            0.0
        }
    }

    /// The inter-packet period that paces `mss_bytes`-sized packets at the
    /// current rate.
    pub fn send_period(&self, mss_bytes: usize) -> Duration {
        self.limiter.send_period(mss_bytes)
    }

    /// Handles the start of a monitor interval.
    ///
    /// A start while another interval is in flight is ignored.
    ///
    /// 处理监控区间的开始。若已有区间正在进行，则忽略。
    pub fn on_monitor_start(&mut self, id: MonitorId) -> RateDecision {
        let before = self.limiter.rate();

        if let Some(current) = self.in_flight {
            self.counters.ignored_starts += 1;
            trace!(%id, %current, "Interval already in flight, start ignored");
            return self.decision(before);
        }
        self.in_flight = Some(id);

        match self.state {
            ConnectionState::Start => {
                self.limiter.apply(before * 2.0, false);
            }
            ConnectionState::Search => {
                let probe = self.strategy.search(before);
                self.limiter.apply(probe, true);
                self.state = ConnectionState::Decision;
            }
            ConnectionState::Decision => {}
        }

        trace!(%id, state = ?self.state, rate = self.limiter.rate(), "Monitor interval started");
        self.decision(before)
    }

    /// Handles the end of a monitor interval.
    ///
    /// Reports for any interval other than the one in flight are ignored.
    ///
    /// 处理监控区间的结束。非当前进行中区间的报告将被忽略。
    pub fn on_monitor_end(&mut self, report: &IntervalReport) -> RateDecision {
        let before = self.limiter.rate();

        if self.in_flight != Some(report.ended_id) {
            self.counters.stale_reports += 1;
            trace!(
                ended = %report.ended_id,
                in_flight = ?self.in_flight,
                "Stale interval report ignored"
            );
            return self.decision(before);
        }

        let utility = self.utility.evaluate(
            report.total_packets,
            report.lost_packets,
            report.elapsed,
            report.rtt,
        );
        self.utility_sum += utility;
        self.counters.completed_intervals += 1;

        match self.state {
            ConnectionState::Start => {
                if !self.slow_start_continues(utility, report.lost_packets) {
                    self.limiter.apply(before / 2.0, false);
                    self.state = ConnectionState::Search;
                    self.counters.slow_start_exits += 1;
                    debug!(
                        utility,
                        loss = report.lost_packets,
                        rate = self.limiter.rate(),
                        "Slow start ended"
                    );
                }
            }
            ConnectionState::Decision => self.handle_decision(utility, before),
            ConnectionState::Search => {}
        }

        self.in_flight = None;
        self.decision(before)
    }

    /// Forwards a loss notification to the strategy.
    pub fn on_loss(&mut self, lost: &[u32]) {
        self.strategy.on_loss(lost);
    }

    /// Forwards a retransmission timeout to the strategy, which forces its
    /// next decision.
    pub fn on_timeout(&mut self) {
        self.strategy.on_timeout();
    }

    pub fn on_ack(&mut self, ack: u32) {
        self.strategy.on_ack(ack);
    }

    /// 重置控制器状态
    /// Reset controller state
    pub fn reset(&mut self) {
        self.state = ConnectionState::Start;
        self.in_flight = None;
        self.slow_start_utility = f64::NEG_INFINITY;
        self.utility_sum = 0.0;
        self.history.clear();
        self.utility.reset();
        self.limiter.reset();
        self.strategy.reset();
        self.counters = Counters::default();

        debug!("Rate controller reset to initial state");
    }

    /// 获取控制器统计信息
    /// Get controller statistics
    pub fn stats(&self) -> ControllerStats {
        let counters = &self.counters;
        ControllerStats {
            state: self.state,
            rate: self.limiter.rate(),
            avg_utility: self.avg_utility(),
            smoothed_rtt: self.utility.smoothed_rtt(),
            history_len: self.history.len(),
            completed_intervals: counters.completed_intervals,
            slow_start_exits: counters.slow_start_exits,
            fallbacks: counters.fallbacks,
            restarts: counters.restarts,
            stale_reports: counters.stale_reports,
            ignored_starts: counters.ignored_starts,
            strategy: self.strategy.stats(),
        }
    }

    fn handle_decision(&mut self, utility: f64, rate: f64) {
        if self.history.should_fall_back(utility) {
            let factor = self.history.fallback_rate_factor();
            let fallback_rate = self.limiter.apply(rate * factor, true);
            self.history.truncate_after_fallback();
            self.strategy.cancel();
            self.state = ConnectionState::Search;
            self.counters.fallbacks += 1;
            debug!(
                utility,
                from = rate,
                to = fallback_rate,
                "Utility regressed, falling back"
            );
            return;
        }

        self.history.record(utility, rate);
        self.state = ConnectionState::Search;

        match self.strategy.decide(utility, rate) {
            Proposal::Hold => {}
            Proposal::Rate(next) => {
                self.limiter.apply(next, true);
            }
            Proposal::Restart(next) => {
                self.state = ConnectionState::Start;
                self.slow_start_utility = f64::NEG_INFINITY;
                self.limiter.apply(next, false);
                self.counters.restarts += 1;
                debug!(rate = self.limiter.rate(), "Search restarted from slow start");
            }
        }
    }

    /// Whether the startup phase should keep doubling: utility did not drop
    /// and nothing was lost.
    fn slow_start_continues(&mut self, utility: f64, loss: u64) -> bool {
        if self.slow_start_utility > utility || loss > 0 {
            return false;
        }
        self.slow_start_utility = utility;
        true
    }

    fn decision(&self, before: f64) -> RateDecision {
        let rate = self.limiter.rate();
        RateDecision {
            rate,
            state: self.state,
            rate_changed: rate != before,
        }
    }
}

impl<S: SearchStrategy + 'static> RateControl for Controller<S> {
    fn on_monitor_start(&mut self, id: MonitorId) -> RateDecision {
        Controller::on_monitor_start(self, id)
    }

    fn on_monitor_end(&mut self, report: &IntervalReport) -> RateDecision {
        Controller::on_monitor_end(self, report)
    }

    fn on_loss(&mut self, lost: &[u32]) {
        Controller::on_loss(self, lost)
    }

    fn on_timeout(&mut self) {
        Controller::on_timeout(self)
    }

    fn on_ack(&mut self, ack: u32) {
        Controller::on_ack(self, ack)
    }

    fn rate(&self) -> f64 {
        Controller::rate(self)
    }

    fn avg_utility(&self) -> f64 {
        Controller::avg_utility(self)
    }
}

impl Default for Controller<GradientDescent> {
    fn default() -> Self {
        let config = Config::default();
        let strategy = GradientDescent::new(&config);
        Self::build(config, strategy)
    }
}

#[cfg(test)]
mod tests;
