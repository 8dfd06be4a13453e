//! 最近效用和速率的有界历史
//! Bounded history of recent utilities and rates
//!
//! 职责：
//! - 保存最近若干区间的（效用，速率）对
//! - 判断搜索是否漂移到了有害区域（回退测试）
//! - 回退后截断历史

use crate::config::HistoryConfig;
use std::collections::VecDeque;

/// One recorded decision interval.
/// 一个已记录的决策区间。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub utility: f64,
    pub rate: f64,
}

/// Fixed-capacity, oldest-evicted buffer of (utility, rate) pairs.
///
/// 固定容量、淘汰最旧条目的（效用，速率）对缓冲区。
#[derive(Debug, Clone)]
pub struct HistoryTracker {
    entries: VecDeque<HistoryEntry>,
    config: HistoryConfig,
}

impl HistoryTracker {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity + 1),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Factor applied to the current rate when a fallback fires.
    pub fn fallback_rate_factor(&self) -> f64 {
        self.config.fallback_rate_factor
    }

    /// Iterates entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Appends an entry, evicting the oldest one on overflow.
    ///
    /// 追加一个条目，溢出时淘汰最旧的条目。
    pub fn record(&mut self, utility: f64, rate: f64) {
        self.entries.push_back(HistoryEntry { utility, rate });
        while self.entries.len() > self.config.capacity {
            self.entries.pop_front();
        }
    }

    /// The entry recorded `fallback_index` intervals before the newest one,
    /// if the history is full enough to hold it.
    ///
    /// 在最新条目之前 `fallback_index` 个区间记录的条目（如果存在）。
    pub fn lookback(&self) -> Option<&HistoryEntry> {
        let back = self.config.fallback_index;
        if self.entries.len() < back + 1 {
            return None;
        }
        self.entries.get(self.entries.len() - 1 - back)
    }

    /// Whether `utility` has degraded enough relative to the lookback entry
    /// that the search should be abandoned.
    ///
    /// 判断 `utility` 相对于回看条目是否已经下降到需要放弃搜索的程度。
    pub fn should_fall_back(&self, utility: f64) -> bool {
        match self.lookback() {
            Some(past) => {
                utility < past.utility && past.utility > self.config.fallback_ratio * utility
            }
            None => false,
        }
    }

    /// Drops the newest entries until at most `fallback_index` remain.
    ///
    /// 删除最新的条目，直到最多剩下 `fallback_index` 个。
    pub fn truncate_after_fallback(&mut self) {
        self.entries.truncate(self.config.fallback_index);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
