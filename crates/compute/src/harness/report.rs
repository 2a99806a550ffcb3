use serde::Serialize;
use tilefw_core::ReportFormat;

use crate::strategies::StrategyKind;

/// Outcome of one timed strategy run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub strategy: StrategyKind,
    pub size: usize,
    pub block_size: usize,
    pub x_grain: usize,
    pub y_grain: usize,
    pub threads: usize,
    /// Wall-clock time of the strategy alone, excluding copy and validation.
    pub seconds: f64,
    pub tasks_spawned: u64,
    pub barriers: u64,
    /// Pooled task slots reset for reuse during the run.
    pub tasks_recycled: u64,
    /// Whether the output was compared against the serial baseline.
    pub validated: bool,
}

impl RunReport {
    /// `name size:N block:B x_gs:X y_gs:Y nthreads:T time:S`
    pub fn to_text(&self) -> String {
        format!(
            "{} size:{} block:{} x_gs:{} y_gs:{} nthreads:{} time:{:.6}",
            self.strategy,
            self.size,
            self.block_size,
            self.x_grain,
            self.y_grain,
            self.threads,
            self.seconds
        )
    }

    /// `NAME,N,B,X,Y,T,S`
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{:.4}",
            self.strategy.name().to_ascii_uppercase().replace('-', "_"),
            self.size,
            self.block_size,
            self.x_grain,
            self.y_grain,
            self.threads,
            self.seconds
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn render(&self, format: ReportFormat) -> serde_json::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Csv => Ok(self.to_csv()),
            ReportFormat::Json => self.to_json(),
        }
    }
}
