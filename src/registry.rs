//! 按连接管理控制器
//! Per-connection controller registry
//!
//! 职责：
//! - 为每个连接持有一个独立的控制器
//! - 在多线程宿主中串行化同一连接的回调
//!
//! Every callback holds the connection's entry lock from start to finish, so
//! a probe and the decision that follows it can never interleave with
//! another callback for the same connection.

use crate::controller::{Controller, IntervalReport, MonitorId, RateDecision};
use crate::controller::stats::ControllerStats;
use crate::strategy::{GradientDescent, SearchStrategy};
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use tracing::debug;

/// Controllers keyed by connection.
///
/// 以连接为键的控制器集合。
pub struct ControllerRegistry<K, S: SearchStrategy = GradientDescent> {
    controllers: DashMap<K, Controller<S>>,
}

impl<K, S> ControllerRegistry<K, S>
where
    K: Eq + Hash + fmt::Debug,
    S: SearchStrategy,
{
    pub fn new() -> Self {
        Self {
            controllers: DashMap::new(),
        }
    }

    /// Registers a controller for `key`, returning the one it replaces.
    pub fn insert(&self, key: K, controller: Controller<S>) -> Option<Controller<S>> {
        debug!(connection = ?key, "Rate controller registered");
        self.controllers.insert(key, controller)
    }

    pub fn remove(&self, key: &K) -> Option<Controller<S>> {
        let removed = self.controllers.remove(key).map(|(_, controller)| controller);
        if removed.is_some() {
            debug!(connection = ?key, "Rate controller removed");
        }
        removed
    }

    pub fn contains(&self, key: &K) -> bool {
        self.controllers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Runs `f` against the controller for `key` while holding its lock.
    ///
    /// 在持有 `key` 对应控制器锁的情况下运行 `f`。
    pub fn with<R>(&self, key: &K, f: impl FnOnce(&mut Controller<S>) -> R) -> Option<R> {
        self.controllers.get_mut(key).map(|mut entry| f(entry.value_mut()))
    }

    pub fn on_monitor_start(&self, key: &K, id: MonitorId) -> Option<RateDecision> {
        self.with(key, |controller| controller.on_monitor_start(id))
    }

    pub fn on_monitor_end(&self, key: &K, report: &IntervalReport) -> Option<RateDecision> {
        self.with(key, |controller| controller.on_monitor_end(report))
    }

    pub fn on_timeout(&self, key: &K) -> bool {
        self.with(key, |controller| controller.on_timeout()).is_some()
    }

    pub fn rate(&self, key: &K) -> Option<f64> {
        self.controllers.get(key).map(|entry| entry.rate())
    }

    pub fn stats(&self, key: &K) -> Option<ControllerStats> {
        self.controllers.get(key).map(|entry| entry.stats())
    }
}

impl<K, S> Default for ControllerRegistry<K, S>
where
    K: Eq + Hash + fmt::Debug,
    S: SearchStrategy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, S> fmt::Debug for ControllerRegistry<K, S>
where
    K: Eq + Hash + fmt::Debug,
    S: SearchStrategy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("connections", &self.controllers.len())
            .finish()
    }
}
