pub mod api;
pub mod checkmgr;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod telemetry;

// Ports consumed by the check manager and their adapters
pub mod app;
pub mod infra;

pub use checkmgr::{CheckManager, CheckSettings, Strategy, Trap, TrapStatus};
pub use error::{CheckError, Result};
