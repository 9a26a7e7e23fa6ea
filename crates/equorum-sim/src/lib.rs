//! # equorum-sim — Deploys Equorum series and drives them through scenarios.
//!
//! - [`series`] pairs a ledger with its router the way a factory would.
//! - [`config`] loads simulation settings from defaults, TOML and environment.
//! - [`scenario`] replays a scripted list of steps against a deployed series.
//! - [`report`] summarises the resulting state and checks its invariants.

pub mod config;
pub mod error;
pub mod report;
pub mod scenario;
pub mod series;
pub mod units;

pub use config::SimConfig;
pub use error::SimError;
pub use report::Report;
pub use scenario::{Scenario, Simulation, Step, StepOutcome, run_scenario};
pub use series::{DeployOptions, Series, deploy_series};
