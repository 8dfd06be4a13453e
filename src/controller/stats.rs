//! 控制器统计信息
//! Controller statistics

use super::ConnectionState;
use crate::strategy::StrategyStats;
use std::fmt;

/// Event counters owned by one controller instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub completed_intervals: u64,
    pub slow_start_exits: u64,
    pub fallbacks: u64,
    pub restarts: u64,
    pub stale_reports: u64,
    pub ignored_starts: u64,
}

/// A point-in-time snapshot of a controller.
///
/// 控制器的某一时刻快照。
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStats {
    pub state: ConnectionState,
    /// Current rate, in Mbit/s.
    pub rate: f64,
    pub avg_utility: f64,
    pub smoothed_rtt: f64,
    pub history_len: usize,
    pub completed_intervals: u64,
    pub slow_start_exits: u64,
    pub fallbacks: u64,
    /// Returns to the startup phase requested by the strategy.
    pub restarts: u64,
    /// End notifications whose id did not match the interval in flight.
    pub stale_reports: u64,
    /// Start notifications received while an interval was in flight.
    pub ignored_starts: u64,
    pub strategy: StrategyStats,
}

impl fmt::Display for ControllerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PCC[state:{:?}, rate:{:.3}Mbps, avg_utility:{:.1}, intervals:{}, slow_start_exits:{}, fallbacks:{}, restarts:{}, stale:{}, ignored:{}, {}]",
            self.state,
            self.rate,
            self.avg_utility,
            self.completed_intervals,
            self.slow_start_exits,
            self.fallbacks,
            self.restarts,
            self.stale_reports,
            self.ignored_starts,
            self.strategy
        )
    }
}
