//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.
//!
//! The control loop itself never fails: bad inputs are clamped or ignored.
//! Errors only surface when a controller is built from a configuration
//! that cannot describe a working controller.

use thiserror::Error;

/// The primary error type for the rate control library.
/// 速率控制库的主要错误类型。
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// The rate floor is not positive, or lies above the link capacity.
    /// 速率下限不为正，或高于链路容量。
    #[error("invalid rate bounds: min {min} Mbps, capacity {max} Mbps")]
    InvalidRateBounds { min: f64, max: f64 },

    /// The initial rate lies outside the configured bounds.
    /// 初始速率超出配置的边界。
    #[error("initial rate {0} Mbps is outside the configured bounds")]
    InvalidInitialRate(f64),

    /// The per-interval step limits must both be positive.
    /// 每个区间的步长限制必须都为正。
    #[error("invalid rate steps: up {up} Mbps, down {down} Mbps")]
    InvalidRateStep { up: f64, down: f64 },

    /// The fallback lookback does not fit in the history window.
    /// 回退回看索引不在历史窗口范围内。
    #[error("fallback index {fallback_index} does not fit a history of {capacity}")]
    InvalidHistory {
        capacity: usize,
        fallback_index: usize,
    },

    /// The gradient buffer must hold at least one sample.
    /// 梯度缓冲区必须至少容纳一个样本。
    #[error("gradient buffer capacity must be positive")]
    InvalidGradientBuffer,

    /// A robustness window is zero or larger than the gradient buffer.
    /// 鲁棒性窗口为零或大于梯度缓冲区。
    #[error("robustness window {window} must be within 1..={capacity}")]
    InvalidRobustness { window: usize, capacity: usize },

    /// The relative change clamps are negative or crossed.
    /// 相对变化量的限制为负或相互交叉。
    #[error("invalid change bounds: min {min}, max {max}")]
    InvalidChangeBounds { min: f64, max: f64 },
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
