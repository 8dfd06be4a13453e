//! 搜索策略抽象接口
//! Search Strategy Abstract Interfaces
//!
//! 职责：
//! - 定义控制器在 SEARCH/DECISION 阶段调用的策略 trait
//! - 让不同的速率搜索算法可以在不修改状态机的情况下替换

use std::fmt;

pub mod gradient;
pub mod ring;

pub use gradient::GradientDescent;

/// What a strategy wants the controller to do after a decision interval.
///
/// 策略在决策区间之后希望控制器执行的操作。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proposal {
    /// Not enough evidence yet; keep probing.
    /// 证据尚不充分，继续探测。
    Hold,
    /// Move to this rate. The controller applies the step band.
    /// 移动到此速率。控制器会应用步长限制。
    Rate(f64),
    /// The search collapsed toward the floor: return to the startup phase
    /// and set this rate without the step band.
    ///
    /// 搜索向下限坍缩：回到启动阶段并在不受步长限制的情况下设置此速率。
    Restart(f64),
}

/// 策略统计信息
/// Strategy statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyStats {
    pub name: &'static str,
    /// Decisions that moved the base rate.
    pub decisions: u64,
    /// Decisions whose change was snapped to the min/max bound.
    pub enforced_changes: u64,
    /// Decisions that sent the controller back to startup.
    pub restarts: u64,
}

impl fmt::Display for StrategyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[decisions:{}, enforced:{}, restarts:{}]",
            self.name, self.decisions, self.enforced_changes, self.restarts
        )
    }
}

/// 速率搜索策略核心trait
/// Core rate search strategy trait
///
/// The controller calls `search` when a SEARCH interval starts and `decide`
/// when the following DECISION interval ends. It never shares a strategy
/// between connections.
pub trait SearchStrategy: fmt::Debug + Send {
    /// Returns the probe rate for the interval that is about to start.
    /// `current_rate` is the rate the host is currently sending at.
    ///
    /// 返回即将开始的区间的探测速率。
    fn search(&mut self, current_rate: f64) -> f64;

    /// Consumes the utility of the interval that just ended.
    ///
    /// 处理刚结束的区间的效用。
    fn decide(&mut self, utility: f64, current_rate: f64) -> Proposal;

    /// Discards any half-collected probe, e.g. after a fallback.
    /// 丢弃任何未完成的探测，例如在回退之后。
    fn cancel(&mut self) {}

    /// 处理丢包事件
    /// Handle packet loss notification
    fn on_loss(&mut self, _lost: &[u32]) {}

    /// 处理超时事件
    /// Handle retransmission timeout
    fn on_timeout(&mut self) {}

    /// 处理ACK
    /// Handle acknowledgement
    fn on_ack(&mut self, _ack: u32) {}

    /// Returns the strategy to its freshly-constructed state.
    /// 将策略恢复到刚构造时的状态。
    fn reset(&mut self);

    fn stats(&self) -> StrategyStats;

    /// 获取算法名称
    /// Get algorithm name
    fn name(&self) -> &'static str;
}
