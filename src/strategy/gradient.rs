//! 梯度下降搜索策略
//! Gradient-descent search strategy
//!
//! 职责：
//! - 围绕基准速率进行对称的两阶段探测（先降后升）
//! - 用有限差分估计效用对速率的梯度，并在鲁棒性窗口内取平均
//! - 使用自适应步长和动量将梯度转换为有界的速率变化
//!
//! Each decision consumes a pair of intervals: one probing below the base
//! rate and one probing above it by the same amount. The utility difference
//! between the two is a finite-difference estimate of the gradient.

use super::ring::GradientRing;
use super::{Proposal, SearchStrategy, StrategyStats};
use crate::config::{Config, GradientConfig};
use tracing::{debug, trace};

/// Relative probe size for a given rate. Low rates probe wider because their
/// absolute signal is weaker.
///
/// 给定速率下的相对探测幅度。
pub fn probe_step_ratio(rate: f64) -> f64 {
    if rate < 1.0 {
        0.3
    } else if rate < 2.0 {
        0.25
    } else if rate < 3.0 {
        0.2
    } else if rate < 10.0 {
        0.1
    } else {
        0.05
    }
}

/// Gain applied to the averaged gradient.
///
/// 应用于平均梯度的增益。
pub fn step_gain(rate: f64) -> f64 {
    if rate > 20.0 {
        rate / 1_000_000.0
    } else if rate > 10.0 {
        2.0 * rate / 1_000_000.0
    } else {
        10.0 * rate / 1_000_000.0
    }
}

/// Which side of the base rate the next probe goes to.
/// 下一次探测位于基准速率的哪一侧。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePhase {
    Below,
    Above,
}

/// Gradient-descent search over the sending rate.
///
/// 基于梯度下降的发送速率搜索。
#[derive(Debug, Clone)]
pub struct GradientDescent {
    /// The rate probes bracket, in Mbit/s.
    /// 探测所围绕的基准速率（Mbit/s）。
    base_rate: f64,
    /// Absolute size of the current probe.
    /// 当前探测的绝对幅度。
    pending_delta: f64,
    phase: ProbePhase,
    /// Set until the first probe pair completes; the base rate is taken from
    /// the host while this holds.
    bootstrapping: bool,
    /// Utility of the below-base probe, waiting for its above-base partner.
    start_utility: Option<f64>,
    /// Forces the next decision regardless of the robustness window.
    timed_out: bool,
    gradients: GradientRing,
    /// Number of gradient samples averaged per decision.
    /// 每次决策平均的梯度样本数。
    robustness: usize,
    trend_count: usize,
    /// Consecutive same-direction decisions.
    /// 连续同方向决策的次数。
    momentum: u32,
    /// The change applied by the previous decision.
    last_change: f64,
    min_rate: f64,
    stats: StrategyStats,
    config: GradientConfig,
}

impl GradientDescent {
    pub fn new(config: &Config) -> Self {
        Self {
            base_rate: 0.0,
            pending_delta: 0.0,
            phase: ProbePhase::Below,
            bootstrapping: true,
            start_utility: None,
            timed_out: false,
            gradients: GradientRing::new(config.gradient.buffer_capacity),
            robustness: config.gradient.initial_robustness,
            trend_count: 0,
            momentum: 0,
            last_change: 0.0,
            min_rate: config.rate.min_rate,
            stats: StrategyStats {
                name: "gradient-descent",
                ..Default::default()
            },
            config: config.gradient.clone(),
        }
    }

    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    pub fn robustness(&self) -> usize {
        self.robustness
    }

    pub fn momentum(&self) -> u32 {
        self.momentum
    }

    pub fn last_change(&self) -> f64 {
        self.last_change
    }

    pub fn phase(&self) -> ProbePhase {
        self.phase
    }

    /// Runs one decision from a completed probe pair.
    ///
    /// `start_utility` belongs to the below-base probe and `end_utility` to
    /// the above-base one. With `timed_out` set the decision is taken even if
    /// the robustness window has not filled yet.
    ///
    /// 根据一对已完成的探测执行一次决策。
    pub fn decide_pair(
        &mut self,
        start_utility: f64,
        end_utility: f64,
        timed_out: bool,
    ) -> Proposal {
        let gradient = -(start_utility - end_utility) / (2.0 * probe_step_ratio(self.base_rate));
        self.gradients.push(gradient);

        self.trend_count += 1;
        if self.trend_count < self.robustness && !timed_out {
            trace!(
                gradient,
                samples = self.trend_count,
                robustness = self.robustness,
                "Gradient sampled, waiting for more"
            );
            return Proposal::Hold;
        }
        self.trend_count = 0;

        let average = self.gradients.average_last(self.robustness);
        let raw_change = step_gain(self.base_rate) * average;
        if raw_change * self.last_change >= 0.0 {
            self.momentum = self.momentum.saturating_add(1);
        } else {
            self.momentum = 0;
        }
        let momentum = f64::from(self.momentum);
        let (change, enforced) = self.bounded_change(raw_change * (momentum * momentum + 1.0));
        if enforced {
            self.stats.enforced_changes += 1;
        }

        self.base_rate += change;
        self.stats.decisions += 1;

        let lower_probe = self.base_rate * (1.0 - probe_step_ratio(self.base_rate));
        let proposal = if lower_probe < self.min_rate {
            debug!(
                base_rate = self.base_rate,
                "Search collapsed toward the rate floor, restarting"
            );
            self.stats.restarts += 1;
            self.restart_search();
            Proposal::Restart(self.base_rate)
        } else {
            debug!(
                gradient = average,
                change,
                momentum = self.momentum,
                base_rate = self.base_rate,
                "Gradient decision"
            );
            Proposal::Rate(self.base_rate)
        };

        // Truncation is intended: only rates at or below 3 Mbit/s reach the cap.
        let window = (1.0 + 3.0 / self.base_rate) as usize;
        self.robustness = window.clamp(1, self.config.max_robustness);
        self.last_change = change;
        self.pending_delta = 0.0;
        proposal
    }

    /// Snaps `change` into `[min, max]` relative magnitude of the base rate,
    /// keeping its sign. A zero change counts as positive. Returns whether the
    /// change was altered.
    ///
    /// 将 `change` 限制在基准速率的 `[min, max]` 相对幅度内，保留符号。
    pub fn bounded_change(&self, change: f64) -> (f64, bool) {
        let min = self.config.min_change_ratio * self.base_rate;
        let max = self.config.max_change_ratio * self.base_rate;
        if change >= 0.0 {
            if change < min {
                return (min, true);
            }
            if change > max {
                return (max, true);
            }
        } else {
            if change > -min {
                return (-min, true);
            }
            if change < -max {
                return (-max, true);
            }
        }
        (change, false)
    }

    fn restart_search(&mut self) {
        self.bootstrapping = true;
        self.phase = ProbePhase::Below;
        self.start_utility = None;
        self.trend_count = 0;
        self.momentum = 0;
        self.gradients.clear();
    }
}

impl SearchStrategy for GradientDescent {
    fn search(&mut self, current_rate: f64) -> f64 {
        match self.phase {
            ProbePhase::Below => {
                if self.bootstrapping {
                    self.base_rate = current_rate;
                }
                self.pending_delta = probe_step_ratio(self.base_rate) * self.base_rate;
                let probe = self.base_rate - self.pending_delta;
                trace!(base_rate = self.base_rate, probe, "Probing below base rate");
                probe
            }
            ProbePhase::Above => {
                self.bootstrapping = false;
                let probe = self.base_rate + self.pending_delta;
                trace!(base_rate = self.base_rate, probe, "Probing above base rate");
                probe
            }
        }
    }

    fn decide(&mut self, utility: f64, _current_rate: f64) -> Proposal {
        match self.phase {
            ProbePhase::Below => {
                self.start_utility = Some(utility);
                self.phase = ProbePhase::Above;
                Proposal::Hold
            }
            ProbePhase::Above => {
                self.phase = ProbePhase::Below;
                let Some(start_utility) = self.start_utility.take() else {
                    return Proposal::Hold;
                };
                let timed_out = std::mem::take(&mut self.timed_out);
                self.decide_pair(start_utility, utility, timed_out)
            }
        }
    }

    fn cancel(&mut self) {
        self.phase = ProbePhase::Below;
        self.start_utility = None;
    }

    fn on_timeout(&mut self) {
        self.timed_out = true;
    }

    fn reset(&mut self) {
        let stats_name = self.stats.name;
        self.base_rate = 0.0;
        self.pending_delta = 0.0;
        self.timed_out = false;
        self.robustness = self.config.initial_robustness;
        self.last_change = 0.0;
        self.restart_search();
        self.stats = StrategyStats {
            name: stats_name,
            ..Default::default()
        };
    }

    fn stats(&self) -> StrategyStats {
        self.stats.clone()
    }

    fn name(&self) -> &'static str {
        self.stats.name
    }
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
