#![deny(clippy::expect_used, clippy::unwrap_used)]

//! A utility-driven, gradient-descent rate controller for reliable transports.
//! 面向可靠传输协议的、基于效用和梯度下降的速率控制器。
//!
//! The host transport owns packet scheduling, acknowledgements and loss
//! detection. It announces monitor intervals to a [`Controller`], reports
//! what each interval achieved, and paces at the rate the controller returns.

pub mod config;
pub mod error;

pub mod controller;
pub mod monitor;
pub mod registry;
pub mod strategy;
pub mod utility;

pub use config::Config;
pub use controller::{
    ConnectionState, Controller, IntervalReport, MonitorId, RateControl, RateDecision,
};
pub use error::{Error, Result};
pub use strategy::{GradientDescent, Proposal, SearchStrategy};
