//! Offline trainers for a binary heart disease risk classifier on the UCI
//! heart disease table, exporting the fitted model to ONNX.

pub mod artifact;
pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod loader;
pub mod matrix;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod onnx;
pub mod pipelines;
pub mod records;
pub mod split;

pub use error::{PipelineError, Result};

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Info-level logging for this crate, overridable through `HEART_LOG`.
pub fn init_logging() {
    let env = Env::new().filter(config::LOG_ENV);
    Builder::new()
        .filter(Some("heart_risk"), LevelFilter::Info)
        .parse_env(env)
        .init();
}
