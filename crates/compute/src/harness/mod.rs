//! Benchmark harness: input generation, timing and validation.

mod report;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tilefw_core::{BenchConfig, FwError, FwResult, Matrix, Weight, DEFAULT_MAX_WEIGHT};
use tracing::{debug, info, warn};

use crate::engine::TaskEngine;
use crate::strategies::{ExecutionStrategy, RunParams, Serial, StrategyKind};

pub use report::RunReport;

/// Deterministic pseudo-random input: weights in `[0, max_weight)`, zero
/// diagonal.
pub fn generate_input(n: usize, seed: u64, max_weight: Weight) -> FwResult<Matrix> {
    Matrix::random(n, seed, max_weight)
}

/// Compare `actual` against `expected` cell by cell.
pub fn validate(expected: &Matrix, actual: &Matrix) -> FwResult<()> {
    if expected.size() != actual.size() {
        return Err(FwError::SizeMismatch {
            expected: expected.size(),
            actual: actual.size(),
        });
    }
    match expected.first_mismatch(actual) {
        None => Ok(()),
        Some((row, col)) => Err(FwError::Mismatch {
            row,
            col,
            expected: expected.get(row, col),
            actual: actual.get(row, col),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub seed: u64,
    pub max_weight: Weight,
    /// Compare every run against the serial baseline.
    pub validate: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_weight: DEFAULT_MAX_WEIGHT,
            validate: true,
        }
    }
}

impl From<&BenchConfig> for HarnessConfig {
    fn from(config: &BenchConfig) -> Self {
        Self {
            seed: config.seed,
            max_weight: config.max_weight,
            validate: config.validate,
        }
    }
}

/// Serial result for one input, kept so a family of strategies validates
/// against a single baseline computation.
struct Baseline {
    input: Matrix,
    output: Matrix,
}

/// Runs strategies on copies of an input and reports their timing.
pub struct Harness<'e> {
    engine: &'e TaskEngine,
    config: HarnessConfig,
    baseline: Option<Baseline>,
}

impl<'e> Harness<'e> {
    pub fn new(engine: &'e TaskEngine, config: HarnessConfig) -> Self {
        Self {
            engine,
            config,
            baseline: None,
        }
    }

    pub fn engine(&self) -> &'e TaskEngine {
        self.engine
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Input of size `n` from the configured seed and weight bound.
    pub fn input(&self, n: usize) -> FwResult<Matrix> {
        generate_input(n, self.config.seed, self.config.max_weight)
    }

    /// Serial result for `input`, computed on first use and cached.
    pub fn baseline(&mut self, input: &Matrix) -> FwResult<&Matrix> {
        let baseline = match self.baseline.take() {
            Some(b) if b.input == *input => b,
            _ => {
                debug!(n = input.size(), "Computing serial baseline");
                let mut output = input.clone();
                Serial.run(self.engine, &mut output, &RunParams::new(1))?;
                Baseline {
                    input: input.clone(),
                    output,
                }
            }
        };
        Ok(&self.baseline.insert(baseline).output)
    }

    /// Run `kind` on a copy of `input`. With validation enabled a wrong
    /// result is an error and no report is produced.
    pub fn run(
        &mut self,
        kind: StrategyKind,
        input: &Matrix,
        params: &RunParams,
    ) -> FwResult<RunReport> {
        let strategy = kind.build();
        strategy.check(input.size(), params)?;

        let mut matrix = input.clone();
        let before = self.engine.metrics();
        let start = Instant::now();
        let stats = strategy.run(self.engine, &mut matrix, params)?;
        let seconds = start.elapsed().as_secs_f64();
        let engine_delta = self.engine.metrics().since(&before);
        if engine_delta.in_flight() > 0 {
            warn!(
                strategy = %kind,
                in_flight = engine_delta.in_flight(),
                "Engine tasks still running after strategy returned"
            );
        }

        if self.config.validate {
            let expected = self.baseline(input)?;
            validate(expected, &matrix)?;
        }

        info!(
            strategy = %kind,
            n = input.size(),
            bs = params.block_size,
            threads = self.engine.threads(),
            seconds,
            tasks = stats.tasks_spawned,
            barriers = stats.barriers,
            recycled = engine_delta.tasks_recycled,
            "Run complete"
        );

        Ok(RunReport {
            strategy: kind,
            size: input.size(),
            block_size: params.block_size,
            x_grain: params.x_grain,
            y_grain: params.y_grain,
            threads: self.engine.threads(),
            seconds,
            tasks_spawned: stats.tasks_spawned,
            barriers: stats.barriers,
            tasks_recycled: engine_delta.tasks_recycled,
            validated: self.config.validate,
        })
    }
}
