//! Clamps requested rates before they reach the host.
//!
//! 在请求的速率到达宿主之前对其进行限制。

use crate::config::RateConfig;
use std::time::Duration;
use tracing::trace;

/// Rate-setting policy: floor, ceiling and, outside startup, an asymmetric
/// per-interval step band around the current rate.
///
/// 速率设置策略：下限、上限，以及（启动阶段之外）围绕当前速率的非对称步长带。
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// The rate last handed to the host, in Mbit/s.
    /// 最后交给宿主的速率（Mbit/s）。
    rate: f64,
    config: RateConfig,
}

impl RateLimiter {
    pub fn new(config: RateConfig) -> Self {
        Self {
            rate: config.initial_rate,
            config,
        }
    }

    /// The current rate, in Mbit/s.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn min_rate(&self) -> f64 {
        self.config.min_rate
    }

    pub fn link_capacity(&self) -> f64 {
        self.config.link_capacity
    }

    /// Clamps `requested` and stores the result as the current rate.
    ///
    /// With `bounded` set, the change from the current rate is limited to
    /// `max_step_up` for increases and `max_step_down` for decreases.
    ///
    /// 限制 `requested` 并将结果存储为当前速率。
    pub fn apply(&mut self, requested: f64, bounded: bool) -> f64 {
        let mut rate = requested
            .max(self.config.min_rate)
            .min(self.config.link_capacity);

        if bounded {
            if rate > self.rate + self.config.max_step_up {
                rate = self.rate + self.config.max_step_up;
            } else if rate < self.rate - self.config.max_step_down {
                rate = self.rate - self.config.max_step_down;
            }
        }

        trace!(requested, applied = rate, bounded, "Rate applied");
        self.rate = rate;
        rate
    }

    /// Forgets the current rate and starts over from the initial rate.
    pub fn reset(&mut self) {
        self.rate = self.config.initial_rate;
    }

    /// The inter-packet send period that paces `mss_bytes`-sized packets at
    /// the current rate.
    ///
    /// 以当前速率发送 `mss_bytes` 大小数据包时的包间发送间隔。
    pub fn send_period(&self, mss_bytes: usize) -> Duration {
        // bits / (Mbit/s) = microseconds
        Duration::from_secs_f64(mss_bytes as f64 * 8.0 / self.rate / 1_000_000.0)
    }
}
