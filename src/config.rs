//! 定义了速率控制器的可配置参数。
//! Defines configurable parameters for the rate controller.

use crate::error::{Error, Result};

/// A structure containing all configurable parameters for a controller.
///
/// 包含所有控制器可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Rate bounds and per-interval step limits.
    /// 速率边界和每个区间的步长限制。
    pub rate: RateConfig,

    /// Utility/rate history used by the fallback safeguard.
    /// 回退保护使用的效用/速率历史。
    pub history: HistoryConfig,

    /// Parameters of the gradient-descent search.
    /// 梯度下降搜索的参数。
    pub gradient: GradientConfig,

    /// Constants of the utility function.
    /// 效用函数的常量。
    pub utility: UtilityConfig,
}

/// Rate bounds and per-interval step limits. All rates are in Mbit/s.
///
/// 速率边界和每个区间的步长限制。所有速率单位均为 Mbit/s。
#[derive(Debug, Clone)]
pub struct RateConfig {
    /// The rate floor. The controller never emits a rate below this.
    /// 速率下限。控制器输出的速率永远不会低于此值。
    pub min_rate: f64,
    /// The link capacity ceiling.
    /// 链路容量上限。
    pub link_capacity: f64,
    /// The rate a new connection starts its doubling probe from.
    /// 新连接开始翻倍探测时的速率。
    pub initial_rate: f64,
    /// Maximum increase per interval outside of the startup phase.
    /// 启动阶段之外每个区间的最大增幅。
    pub max_step_up: f64,
    /// Maximum decrease per interval outside of the startup phase.
    /// 启动阶段之外每个区间的最大降幅。
    pub max_step_down: f64,
}

/// Utility/rate history parameters.
///
/// 效用/速率历史参数。
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Number of (utility, rate) pairs retained. Oldest entries are evicted.
    /// 保留的（效用，速率）对的数量。最旧的条目被淘汰。
    pub capacity: usize,
    /// How many intervals back the fallback test looks. The history is
    /// truncated to this many entries after a fallback fires.
    ///
    /// 回退测试回看的区间数。回退触发后，历史被截断为该数量的条目。
    pub fallback_index: usize,
    /// The historical utility must exceed the current one by this factor for
    /// a fallback to fire.
    /// 历史效用必须超过当前效用的此倍数才会触发回退。
    pub fallback_ratio: f64,
    /// The current rate is multiplied by this factor when a fallback fires.
    /// 回退触发时当前速率乘以此因子。
    pub fallback_rate_factor: f64,
}

/// Gradient-descent search parameters.
///
/// 梯度下降搜索参数。
#[derive(Debug, Clone)]
pub struct GradientConfig {
    /// Capacity of the circular gradient buffer.
    /// 循环梯度缓冲区的容量。
    pub buffer_capacity: usize,
    /// Robustness window used before the first decision.
    /// 第一次决策之前使用的鲁棒性窗口。
    pub initial_robustness: usize,
    /// Upper bound of the adaptive robustness window.
    /// 自适应鲁棒性窗口的上限。
    pub max_robustness: usize,
    /// Smallest applied change, relative to the base rate.
    /// 相对于基准速率的最小变化量。
    pub min_change_ratio: f64,
    /// Largest applied change, relative to the base rate.
    /// 相对于基准速率的最大变化量。
    pub max_change_ratio: f64,
}

/// Utility function constants.
///
/// 效用函数常量。
#[derive(Debug, Clone)]
pub struct UtilityConfig {
    /// Fixed multiplier applied to every utility for numeric conditioning.
    /// 应用于每个效用值的固定乘数，用于数值调节。
    pub scale: f64,
    /// Loss ratio at which the loss sigmoid crosses one half.
    /// 丢包 sigmoid 穿过 1/2 时的丢包率。
    pub loss_tolerance: f64,
    /// Steepness of the loss sigmoid.
    /// 丢包 sigmoid 的陡峭度。
    pub loss_steepness: f64,
    /// Steepness of the RTT-inflation sigmoid.
    /// RTT 膨胀 sigmoid 的陡峭度。
    pub rtt_steepness: f64,
    /// RTT samples below this are floored to it.
    /// 低于此值的 RTT 样本会被提升到此值。
    pub rtt_floor: f64,
    /// Maximum relative movement of the smoothed RTT per interval.
    /// 每个区间平滑 RTT 的最大相对变化。
    pub rtt_drift: f64,
}

impl Config {
    /// Checks that the parameters describe a controller that can run.
    ///
    /// 检查参数是否描述了一个可以运行的控制器。
    pub fn validate(&self) -> Result<()> {
        let rate = &self.rate;
        if !(rate.min_rate.is_finite() && rate.link_capacity.is_finite())
            || rate.min_rate <= 0.0
            || rate.min_rate > rate.link_capacity
        {
            return Err(Error::InvalidRateBounds {
                min: rate.min_rate,
                max: rate.link_capacity,
            });
        }
        if !(rate.min_rate..=rate.link_capacity).contains(&rate.initial_rate) {
            return Err(Error::InvalidInitialRate(rate.initial_rate));
        }
        if !(rate.max_step_up > 0.0 && rate.max_step_down > 0.0) {
            return Err(Error::InvalidRateStep {
                up: rate.max_step_up,
                down: rate.max_step_down,
            });
        }

        let history = &self.history;
        if history.capacity == 0 || history.fallback_index >= history.capacity {
            return Err(Error::InvalidHistory {
                capacity: history.capacity,
                fallback_index: history.fallback_index,
            });
        }

        let gradient = &self.gradient;
        if gradient.buffer_capacity == 0 {
            return Err(Error::InvalidGradientBuffer);
        }
        for window in [gradient.initial_robustness, gradient.max_robustness] {
            if window == 0 || window > gradient.buffer_capacity {
                return Err(Error::InvalidRobustness {
                    window,
                    capacity: gradient.buffer_capacity,
                });
            }
        }
        if !(gradient.min_change_ratio >= 0.0
            && gradient.min_change_ratio <= gradient.max_change_ratio)
        {
            return Err(Error::InvalidChangeBounds {
                min: gradient.min_change_ratio,
                max: gradient.max_change_ratio,
            });
        }
        Ok(())
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            min_rate: 0.01,
            link_capacity: 1024.0,
            initial_rate: 5.0,
            max_step_up: 0.2,
            max_step_down: 5.0,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 9,
            fallback_index: 8,
            fallback_ratio: 1.3,
            fallback_rate_factor: 0.85,
        }
    }
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 100,
            initial_robustness: 2,
            max_robustness: 2,
            min_change_ratio: 0.005,
            max_change_ratio: 0.1,
        }
    }
}

impl Default for UtilityConfig {
    fn default() -> Self {
        Self {
            scale: 1000.0 * 10000.0,
            loss_tolerance: 0.005,
            loss_steepness: 100.0,
            rtt_steepness: 10.0,
            rtt_floor: 1.0,
            rtt_drift: 0.001,
        }
    }
}
