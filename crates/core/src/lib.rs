pub mod config;
pub mod error;
pub mod matrix;

pub use config::{BenchConfig, ReportFormat};
pub use error::*;
pub use matrix::{Matrix, Weight, DEFAULT_MAX_WEIGHT, INF};
