use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::matrix::{Weight, DEFAULT_MAX_WEIGHT};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// How benchmark reports are rendered on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format '{}' (expected text, csv or json)", other)),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

/// Benchmark defaults, read from the environment.
///
/// Command-line flags take precedence; these only fill in what was not given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Seed for input generation (`FW_SEED`).
    pub seed: u64,
    /// Exclusive upper bound for generated weights (`FW_MAX_WEIGHT`).
    pub max_weight: Weight,
    /// Compare every run against the serial baseline (`FW_VALIDATE`).
    pub validate: bool,
    /// Output format (`FW_REPORT_FORMAT`).
    pub format: ReportFormat,
    /// Worker threads. 0 = available parallelism (`FW_THREADS`).
    pub threads: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_weight: DEFAULT_MAX_WEIGHT,
            validate: true,
            format: ReportFormat::Text,
            threads: 0,
        }
    }
}

impl BenchConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            seed: env_parse("FW_SEED", defaults.seed),
            max_weight: env_parse("FW_MAX_WEIGHT", defaults.max_weight),
            validate: env_bool("FW_VALIDATE", defaults.validate),
            format: env_parse("FW_REPORT_FORMAT", defaults.format),
            threads: env_parse("FW_THREADS", defaults.threads),
        }
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_threads(&self) -> usize {
        resolve_threads(self.threads)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            seed = self.seed,
            max_weight = self.max_weight,
            validate = self.validate,
            format = %self.format,
            threads = self.resolved_threads(),
            "Bench config loaded"
        );
    }
}

/// Map a requested thread count to a concrete one (0 = all cores).
pub fn resolve_threads(requested: usize) -> usize {
    if requested == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    } else {
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_weight, 1 << 20);
        assert!(config.validate);
        assert_eq!(config.format, ReportFormat::Text);
        assert_eq!(config.threads, 0);
    }

    #[test]
    fn resolved_threads() {
        let mut config = BenchConfig::default();
        // 0 means auto-detect
        assert!(config.resolved_threads() > 0);

        config.threads = 8;
        assert_eq!(config.resolved_threads(), 8);
    }

    #[test]
    fn report_format_parsing() {
        assert_eq!("CSV".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("yaml".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Text.to_string(), "text");
    }
}
