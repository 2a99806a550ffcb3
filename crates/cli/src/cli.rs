use clap::{Parser, Subcommand};
use tilefw_compute::{Family, RunParams, StrategyKind};
use tilefw_core::{BenchConfig, ReportFormat, Weight};

/// Benchmark driver for the tiled Floyd-Warshall strategies.
///
/// Generates a seeded random matrix, runs every strategy of the chosen
/// family on a copy of it, validates each result against the serial
/// baseline and prints one timing line per run.
#[derive(Parser, Debug)]
#[command(name = "tilefw-bench", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Seed for the generated input matrix
    #[arg(long, global = true, env = "FW_SEED")]
    pub seed: Option<u64>,

    /// Exclusive upper bound for generated edge weights
    #[arg(long, global = true, env = "FW_MAX_WEIGHT")]
    pub max_weight: Option<Weight>,

    /// Output format: text, csv or json
    #[arg(long, global = true, env = "FW_REPORT_FORMAT")]
    pub format: Option<ReportFormat>,

    /// Skip comparing results against the serial baseline
    #[arg(long, global = true)]
    pub no_validate: bool,

    /// Only run these strategies of the family (repeatable)
    #[arg(long = "strategy", global = true, value_name = "KIND")]
    pub strategies: Vec<StrategyKind>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Tiled loop and task strategies
    Tiled {
        size: usize,
        blocksize: usize,
        x_grain: usize,
        y_grain: usize,
        /// Worker threads (0 = all cores)
        nthreads: usize,
    },
    /// Tile-per-task strategies, fresh and recycled
    Tasks {
        size: usize,
        blocksize: usize,
        /// Worker threads (0 = all cores)
        nthreads: usize,
    },
    /// Serial and forked divide-and-conquer
    Recursive {
        size: usize,
        blocksize: usize,
        /// Worker threads (0 = all cores)
        nthreads: usize,
    },
    /// Untiled row and block loops
    Standard {
        size: usize,
        x_grain: usize,
        y_grain: usize,
        /// Worker threads (0 = all cores)
        nthreads: usize,
    },
}

impl Command {
    pub fn family(&self) -> Family {
        match self {
            Command::Tiled { .. } => Family::Tiled,
            Command::Tasks { .. } => Family::Tasks,
            Command::Recursive { .. } => Family::Recursive,
            Command::Standard { .. } => Family::Standard,
        }
    }

    pub fn size(&self) -> usize {
        match *self {
            Command::Tiled { size, .. }
            | Command::Tasks { size, .. }
            | Command::Recursive { size, .. }
            | Command::Standard { size, .. } => size,
        }
    }

    /// Requested thread count; 0 defers to the environment.
    pub fn threads(&self) -> usize {
        match *self {
            Command::Tiled { nthreads, .. }
            | Command::Tasks { nthreads, .. }
            | Command::Recursive { nthreads, .. }
            | Command::Standard { nthreads, .. } => nthreads,
        }
    }

    pub fn params(&self) -> RunParams {
        match *self {
            Command::Tiled {
                blocksize,
                x_grain,
                y_grain,
                ..
            } => RunParams::new(blocksize).with_grains(x_grain, y_grain),
            Command::Tasks { blocksize, .. } | Command::Recursive { blocksize, .. } => {
                RunParams::new(blocksize)
            }
            // Untiled: every cell is its own block.
            Command::Standard {
                x_grain, y_grain, ..
            } => RunParams::new(1).with_grains(x_grain, y_grain),
        }
    }
}

impl CliArgs {
    /// Overlay command-line flags on the environment defaults.
    pub fn resolve(&self, mut config: BenchConfig) -> BenchConfig {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(max_weight) = self.max_weight {
            config.max_weight = max_weight;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.no_validate {
            config.validate = false;
        }
        if self.command.threads() != 0 {
            config.threads = self.command.threads();
        }
        config
    }

    /// Strategies to run: the whole family, or the `--strategy` subset of it
    /// in family order.
    pub fn selected(&self) -> Result<Vec<StrategyKind>, String> {
        let family = self.command.family();
        let members = family.members();
        if let Some(stray) = self.strategies.iter().find(|k| !members.contains(k)) {
            return Err(format!("strategy '{}' is not part of the {:?} family", stray, family));
        }
        Ok(members
            .iter()
            .copied()
            .filter(|k| self.strategies.is_empty() || self.strategies.contains(k))
            .collect())
    }
}
