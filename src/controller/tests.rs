//! Controller 状态机的全面测试
//! Comprehensive tests for the Controller state machine

use super::{ConnectionState, Controller, IntervalReport, MonitorId, RateControl};
use crate::config::Config;
use crate::error::Error;
use crate::strategy::gradient::ProbePhase;
use crate::strategy::{Proposal, SearchStrategy, StrategyStats};
use crate::utility::UtilityEvaluator;
use std::collections::VecDeque;

fn assert_f64_eq(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "Floats not equal: {} vs {}", a, b);
}

fn report(id: u64, total: u64, loss: u64) -> IntervalReport {
    IntervalReport {
        total_packets: total,
        lost_packets: loss,
        elapsed: 1.0,
        interval_id: MonitorId(id),
        ended_id: MonitorId(id),
        rtt: 10.0,
    }
}

fn run_interval<S: SearchStrategy>(controller: &mut Controller<S>, id: u64, total: u64, loss: u64) {
    controller.on_monitor_start(MonitorId(id));
    controller.on_monitor_end(&report(id, total, loss));
}

/// Leaves slow start after two intervals: 5 -> 10 -> 20, then halves to 10.
fn leave_slow_start<S: SearchStrategy>(controller: &mut Controller<S>) {
    run_interval(controller, 1, 100, 0);
    run_interval(controller, 2, 100, 1);
    assert_eq!(controller.state(), ConnectionState::Search);
    assert_f64_eq(controller.rate(), 10.0);
}

/// A strategy that replays scripted proposals.
#[derive(Debug, Default)]
struct Scripted {
    probe: f64,
    proposals: VecDeque<Proposal>,
    cancels: u32,
    timeouts: u32,
    lost: usize,
    acks: Vec<u32>,
}

impl Scripted {
    fn new(probe: f64, proposals: Vec<Proposal>) -> Self {
        Self {
            probe,
            proposals: proposals.into(),
            ..Default::default()
        }
    }
}

impl SearchStrategy for Scripted {
    fn search(&mut self, _current_rate: f64) -> f64 {
        self.probe
    }

    fn decide(&mut self, _utility: f64, _current_rate: f64) -> Proposal {
        self.proposals.pop_front().unwrap_or(Proposal::Hold)
    }

    fn cancel(&mut self) {
        self.cancels += 1;
    }

    fn on_loss(&mut self, lost: &[u32]) {
        self.lost += lost.len();
    }

    fn on_timeout(&mut self) {
        self.timeouts += 1;
    }

    fn on_ack(&mut self, ack: u32) {
        self.acks.push(ack);
    }

    fn reset(&mut self) {
        *self = Self::new(self.probe, Vec::new());
    }

    fn stats(&self) -> StrategyStats {
        StrategyStats {
            name: "scripted",
            ..Default::default()
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn scripted(probe: f64, proposals: Vec<Proposal>) -> Controller<Scripted> {
    Controller::new(Config::default(), Scripted::new(probe, proposals))
        .expect("default config is valid")
}

/// 测试默认构造和初始状态
#[test]
fn test_default_construction() {
    let controller: Controller = Controller::default();
    assert_eq!(controller.state(), ConnectionState::Start);
    assert_f64_eq(controller.rate(), 5.0);
    assert_eq!(controller.in_flight(), None);
    assert_f64_eq(controller.avg_utility(), 0.0);
    assert_f64_eq(controller.stats().smoothed_rtt, 0.0);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = Config::default();
    config.rate.min_rate = 0.0;
    assert!(matches!(
        Controller::gradient(config),
        Err(Error::InvalidRateBounds { .. })
    ));
}

#[test]
fn test_start_phase_doubles_rate() {
    let mut controller: Controller = Controller::default();
    let decision = controller.on_monitor_start(MonitorId(1));

    assert_f64_eq(decision.rate, 10.0);
    assert!(decision.rate_changed);
    assert_eq!(decision.state, ConnectionState::Start);
    assert_eq!(controller.in_flight(), Some(MonitorId(1)));
}

/// 区间进行中时，新的开始通知被忽略
#[test]
fn test_overlapping_start_is_ignored() {
    let mut controller: Controller = Controller::default();
    controller.on_monitor_start(MonitorId(1));
    let decision = controller.on_monitor_start(MonitorId(2));

    assert_f64_eq(decision.rate, 10.0);
    assert!(!decision.rate_changed);
    assert_eq!(controller.in_flight(), Some(MonitorId(1)));
    assert_eq!(controller.stats().ignored_starts, 1);
}

/// 不匹配的结束通知被忽略
#[test]
fn test_stale_end_is_ignored() {
    let mut controller: Controller = Controller::default();

    // nothing in flight yet
    controller.on_monitor_end(&report(1, 100, 0));
    assert_eq!(controller.stats().stale_reports, 1);

    controller.on_monitor_start(MonitorId(2));
    let decision = controller.on_monitor_end(&report(1, 100, 50));
    assert!(!decision.rate_changed);
    assert_eq!(controller.in_flight(), Some(MonitorId(2)));
    assert_eq!(controller.stats().stale_reports, 2);
    assert_eq!(controller.stats().completed_intervals, 0);
}

#[test]
fn test_end_matches_on_ended_id() {
    let mut controller: Controller = Controller::default();
    controller.on_monitor_start(MonitorId(4));
    let mut late = report(4, 100, 0);
    late.interval_id = MonitorId(5);

    controller.on_monitor_end(&late);
    assert_eq!(controller.in_flight(), None);
    assert_eq!(controller.stats().completed_intervals, 1);
}

/// 慢启动：效用递增且无丢包时持续翻倍，效用回退时减半
#[test]
fn test_slow_start_doubles_until_utility_regresses() {
    let mut controller: Controller = Controller::default();

    for (id, total) in [(1, 100), (2, 200), (3, 400), (4, 800)] {
        run_interval(&mut controller, id, total, 0);
        assert_eq!(controller.state(), ConnectionState::Start);
    }
    assert_f64_eq(controller.rate(), 80.0);

    run_interval(&mut controller, 5, 600, 0);
    assert_eq!(controller.state(), ConnectionState::Search);
    // doubled to 160 for the interval, then halved
    assert_f64_eq(controller.rate(), 80.0);
    assert_eq!(controller.stats().slow_start_exits, 1);
}

#[test]
fn test_slow_start_exits_on_first_loss() {
    let mut controller: Controller = Controller::default();
    run_interval(&mut controller, 1, 1000, 1);

    assert_eq!(controller.state(), ConnectionState::Search);
    assert_f64_eq(controller.rate(), 5.0);
}

/// 连续无丢包翻倍后，第一次丢包即停止并减半
#[test]
fn test_slow_start_stops_on_loss_after_clean_doublings() {
    let mut controller: Controller = Controller::default();

    for (id, total) in [(1, 100), (2, 200), (3, 400)] {
        run_interval(&mut controller, id, total, 0);
        assert_eq!(controller.state(), ConnectionState::Start);
    }
    assert_f64_eq(controller.rate(), 40.0);

    // utility still improves, but a single lost packet ends the startup
    run_interval(&mut controller, 4, 800, 1);
    assert_eq!(controller.state(), ConnectionState::Search);
    // doubled to 80 for the interval, then halved
    assert_f64_eq(controller.rate(), 40.0);
    assert_eq!(controller.stats().slow_start_exits, 1);
    assert_eq!(controller.stats().completed_intervals, 4);
}

#[test]
fn test_slow_start_is_capped_by_link_capacity() {
    let mut controller: Controller = Controller::default();
    for id in 1..=12 {
        run_interval(&mut controller, id, 100 * id, 0);
    }
    assert_f64_eq(controller.rate(), 1024.0);
}

/// 搜索阶段：先向下探测，再向上探测（受步长限制）
#[test]
fn test_search_cycle_probes_below_then_above() {
    let mut controller: Controller = Controller::default();
    leave_slow_start(&mut controller);

    let decision = controller.on_monitor_start(MonitorId(3));
    assert_eq!(decision.state, ConnectionState::Decision);
    assert_f64_eq(decision.rate, 9.5);

    let decision = controller.on_monitor_end(&report(3, 100, 0));
    assert_eq!(decision.state, ConnectionState::Search);
    assert_eq!(controller.history().len(), 1);
    assert_f64_eq(controller.rate(), 9.5);

    // 10.5 requested, but increases are capped at 0.2 per interval
    let decision = controller.on_monitor_start(MonitorId(4));
    assert_f64_eq(decision.rate, 9.7);
    assert_eq!(controller.strategy().phase(), ProbePhase::Above);

    controller.on_monitor_end(&report(4, 100, 0));
    assert_eq!(controller.history().len(), 2);
    assert_eq!(controller.strategy().phase(), ProbePhase::Below);
}

#[test]
fn test_avg_utility_is_running_mean() {
    let mut controller: Controller = Controller::default();
    let mut evaluator = UtilityEvaluator::default();
    let mut expected = Vec::new();

    for (id, total, loss) in [(1, 100, 0), (2, 300, 0), (3, 200, 2)] {
        expected.push(evaluator.evaluate(total, loss, 1.0, 10.0));
        run_interval(&mut controller, id, total, loss);
    }

    let mean = expected.iter().sum::<f64>() / expected.len() as f64;
    assert!((controller.avg_utility() - mean).abs() < 1e-3);
}

/// 回退：历史效用远高于当前效用时，速率降为85%
#[test]
fn test_fallback_reverts_rate_and_skips_decision() {
    let mut controller: Controller = Controller::default();
    leave_slow_start(&mut controller);
    for _ in 0..9 {
        controller.history.record(1e9, 10.0);
    }

    controller.on_monitor_start(MonitorId(3));
    assert_f64_eq(controller.rate(), 9.5);
    let decision = controller.on_monitor_end(&report(3, 10, 0));

    assert_f64_eq(decision.rate, 9.5 * 0.85);
    assert_eq!(decision.state, ConnectionState::Search);
    assert_eq!(controller.history().len(), 8);
    assert_eq!(controller.in_flight(), None);
    assert_eq!(controller.stats().fallbacks, 1);
    // the probe's utility never reached the strategy
    assert_eq!(controller.strategy().phase(), ProbePhase::Below);
    assert_eq!(controller.strategy().stats().decisions, 0);
}

#[test]
fn test_fallback_cancels_strategy_probe() {
    let mut controller = scripted(9.0, vec![]);
    leave_slow_start(&mut controller);
    for _ in 0..9 {
        controller.history.record(1e9, 10.0);
    }

    run_interval(&mut controller, 3, 10, 0);
    assert_eq!(controller.strategy().cancels, 1);
}

#[test]
fn test_strategy_rate_is_step_bounded() {
    let mut controller = scripted(9.0, vec![Proposal::Rate(100.0)]);
    leave_slow_start(&mut controller);

    run_interval(&mut controller, 3, 100, 0);
    assert_f64_eq(controller.rate(), 9.2);
    assert_eq!(controller.state(), ConnectionState::Search);
}

/// 策略请求重启时回到慢启动，且速率不受步长限制
#[test]
fn test_strategy_restart_returns_to_slow_start() {
    let mut controller = scripted(9.0, vec![Proposal::Restart(50.0)]);
    leave_slow_start(&mut controller);

    run_interval(&mut controller, 3, 100, 0);
    assert_eq!(controller.state(), ConnectionState::Start);
    assert_f64_eq(controller.rate(), 50.0);
    assert_eq!(controller.stats().restarts, 1);

    // the slow-start reference was reset, so a poor first interval continues
    run_interval(&mut controller, 4, 1, 0);
    assert_eq!(controller.state(), ConnectionState::Start);
    assert_f64_eq(controller.rate(), 100.0);
}

#[test]
fn test_hooks_reach_strategy() {
    let mut controller = scripted(9.0, vec![]);
    {
        let host: &mut dyn RateControl = &mut controller;
        host.on_timeout();
        host.on_loss(&[3, 4, 5]);
        host.on_ack(42);
        assert_f64_eq(host.rate(), 5.0);
    }

    let strategy = controller.strategy();
    assert_eq!(strategy.timeouts, 1);
    assert_eq!(strategy.lost, 3);
    assert_eq!(strategy.acks, vec![42]);
}

#[test]
fn test_reset_restores_initial_state() {
    let mut controller: Controller = Controller::default();
    leave_slow_start(&mut controller);
    run_interval(&mut controller, 3, 100, 0);
    assert_f64_eq(controller.stats().smoothed_rtt, 10.0);

    controller.reset();
    assert_eq!(controller.state(), ConnectionState::Start);
    assert_f64_eq(controller.rate(), 5.0);
    assert!(controller.history().is_empty());
    assert_eq!(controller.stats().completed_intervals, 0);
    assert_f64_eq(controller.avg_utility(), 0.0);
}

#[test]
fn test_stats_display() {
    let mut controller: Controller = Controller::default();
    run_interval(&mut controller, 1, 100, 0);

    let stats = controller.stats();
    assert_eq!(stats.completed_intervals, 1);
    assert_f64_eq(stats.smoothed_rtt, 10.0);
    let text = stats.to_string();
    assert!(text.starts_with("PCC[state:Start"), "{}", text);
    assert!(text.contains("gradient-descent"), "{}", text);
}
