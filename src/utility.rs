//! Scores a completed monitor interval.
//!
//! 为已完成的监控区间打分。
//!
//! The score rewards goodput and penalises two signals: a loss rate above
//! the configured tolerance, and RTT inflation relative to the smoothed
//! baseline. Only relative comparisons between intervals are meaningful.

use crate::config::UtilityConfig;
use tracing::trace;

/// Computes the utility of a monitor interval.
///
/// 计算监控区间的效用。
#[derive(Debug, Clone)]
pub struct UtilityEvaluator {
    /// Smoothed RTT carried between intervals. Zero until the first sample.
    /// 在区间之间传递的平滑 RTT。在第一个样本之前为零。
    smoothed_rtt: f64,
    config: UtilityConfig,
}

impl UtilityEvaluator {
    pub fn new(config: UtilityConfig) -> Self {
        Self {
            smoothed_rtt: 0.0,
            config,
        }
    }

    /// The smoothed RTT the next interval starts from.
    /// 下一个区间开始时使用的平滑 RTT。
    pub fn smoothed_rtt(&self) -> f64 {
        self.smoothed_rtt
    }

    /// Seeds the smoothed RTT, as if a previous interval had reported it.
    pub fn set_smoothed_rtt(&mut self, rtt: f64) {
        self.smoothed_rtt = rtt;
    }

    /// Forgets the smoothed RTT.
    /// 清除平滑 RTT。
    pub fn reset(&mut self) {
        self.smoothed_rtt = 0.0;
    }

    /// Scores one interval.
    ///
    /// `elapsed` must be positive; the host guarantees this. An interval that
    /// sent nothing is treated as lossless.
    ///
    /// 为一个区间打分。`elapsed` 必须为正，由宿主保证。
    pub fn evaluate(&mut self, total: u64, loss: u64, elapsed: f64, rtt: f64) -> f64 {
        let rtt = rtt.max(self.config.rtt_floor);
        self.update_smoothed_rtt(rtt);

        let loss_ratio = if total == 0 {
            0.0
        } else {
            loss as f64 / total as f64
        };
        let goodput = total.saturating_sub(loss) as f64 / elapsed;

        let loss_factor = 1.0
            - 1.0
                / (1.0
                    + (-self.config.loss_steepness * (loss_ratio - self.config.loss_tolerance))
                        .exp());
        let rtt_factor = 1.0
            - 1.0
                / (1.0 + (-self.config.rtt_steepness * (1.0 - self.smoothed_rtt / rtt)).exp());
        let loss_penalty = loss as f64 / elapsed;

        let utility = (goodput * loss_factor * rtt_factor - loss_penalty) / rtt * self.config.scale;

        trace!(
            total,
            loss,
            elapsed,
            rtt,
            utility,
            "Interval utility computed"
        );
        utility
    }

    // The drift clamp only shapes the reference carried into this call; the
    // value used for scoring is snapped to the raw sample afterwards.
    // TODO: decide whether the snap should be dropped so the clamp smooths.
    fn update_smoothed_rtt(&mut self, rtt: f64) {
        let drift = self.config.rtt_drift;
        if self.smoothed_rtt == 0.0 {
            self.smoothed_rtt = rtt;
        }
        if self.smoothed_rtt > (1.0 + drift) * rtt {
            self.smoothed_rtt = (1.0 + drift) * rtt;
        }
        if (1.0 - drift) * self.smoothed_rtt < rtt {
            self.smoothed_rtt = (1.0 - drift) * rtt;
        }
        self.smoothed_rtt = rtt;
    }
}

impl Default for UtilityEvaluator {
    fn default() -> Self {
        Self::new(UtilityConfig::default())
    }
}
