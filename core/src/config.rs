//! Configuration loading
//!
//! Settings are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file (`--config`, `ABACUS_CONFIG_PATH`, or `./abacus.toml`)
//! 3. `ABACUS_<SECTION>__<KEY>` environment variables
//! 4. the legacy deployment variables (`TIME_ADDITION_MS`, `COMPUTING_POWER`, ...)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::parser::DEFAULT_MAX_DEPTH;
use crate::types::Operator;

const ENV_PREFIX: &str = "ABACUS";
const CONFIG_PATH_ENV: &str = "ABACUS_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "abacus.toml";

/// Legacy variable names mapped onto their config keys
const LEGACY_ENV: &[(&str, &str)] = &[
    ("TIME_ADDITION_MS", "timings.addition_ms"),
    ("TIME_SUBTRACTION_MS", "timings.subtraction_ms"),
    ("TIME_MULTIPLICATIONS_MS", "timings.multiplication_ms"),
    ("TIME_DIVISIONS_MS", "timings.division_ms"),
    ("COMPUTING_POWER", "workers.computing_power"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timings: OperationTimings,
    pub workers: WorkerSettings,
    pub evaluation: EvaluationSettings,
}

/// Simulated duration of each operation, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationTimings {
    pub addition_ms: u64,
    pub subtraction_ms: u64,
    pub multiplication_ms: u64,
    pub division_ms: u64,
}

impl OperationTimings {
    pub fn uniform(ms: u64) -> Self {
        Self {
            addition_ms: ms,
            subtraction_ms: ms,
            multiplication_ms: ms,
            division_ms: ms,
        }
    }

    pub fn for_operator(&self, op: Operator) -> Duration {
        let ms = match op {
            Operator::Add => self.addition_ms,
            Operator::Sub => self.subtraction_ms,
            Operator::Mul => self.multiplication_ms,
            Operator::Div => self.division_ms,
        };
        Duration::from_millis(ms)
    }
}

impl Default for OperationTimings {
    fn default() -> Self {
        Self::uniform(100)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Number of in-process agents
    pub computing_power: usize,
    /// Delay between polls when no task is available
    pub poll_interval_ms: u64,
    /// Claims older than this are handed to another agent; unset disables recovery
    pub claim_timeout_ms: Option<u64>,
}

impl WorkerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn claim_timeout(&self) -> Option<Duration> {
        self.claim_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            computing_power: 4,
            poll_interval_ms: 100,
            claim_timeout_ms: None,
        }
    }
}

/// What to do when the right operand of a division is exactly zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivisionByZero {
    /// Fail the expression with `DivisionByZero`
    #[default]
    Error,
    /// Return the left operand without publishing a task (legacy behavior)
    ReturnLeft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Per-task deadline; 0 waits forever
    pub task_timeout_ms: u64,
    pub division_by_zero: DivisionByZero,
    /// Deepest nesting of operations accepted at submission
    pub max_depth: usize,
}

impl EvaluationSettings {
    pub fn task_timeout(&self) -> Option<Duration> {
        match self.task_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            task_timeout_ms: 60_000,
            division_by_zero: DivisionByZero::Error,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers.computing_power == 0 {
            bail!("workers.computing_power must be at least 1");
        }
        if self.workers.poll_interval_ms == 0 {
            bail!("workers.poll_interval_ms must be greater than 0");
        }
        if self.workers.claim_timeout_ms == Some(0) {
            bail!("workers.claim_timeout_ms must be greater than 0 when set");
        }
        if self.evaluation.max_depth == 0 {
            bail!("evaluation.max_depth must be at least 1");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

/// Builder for loading a `Config` with programmatic overrides
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Explicit config file; it must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore environment variables and `.env` (useful in tests)
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            dotenvy::dotenv().ok();
        }

        let explicit_path = self.config_path.or_else(|| {
            if self.skip_env {
                None
            } else {
                env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
            }
        });

        let mut builder = config::Config::builder();

        builder = match &explicit_path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                builder.add_source(config::File::from(path.as_path()).required(true))
            }
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        if !self.skip_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

            for (var, key) in LEGACY_ENV {
                builder = builder
                    .set_override_option(*key, env::var(var).ok())
                    .with_context(|| format!("Invalid value for {}", var))?;
            }
        }

        let config: Config = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::builder().skip_env(true).build().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.workers.computing_power, 4);
        assert_eq!(config.evaluation.division_by_zero, DivisionByZero::Error);
        assert_eq!(
            config.evaluation.task_timeout(),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
[timings]
addition_ms = 5
division_ms = 40

[workers]
computing_power = 2
claim_timeout_ms = 1500

[evaluation]
task_timeout_ms = 0
division_by_zero = "return_left"
"#,
        );

        let config = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .skip_env(true)
            .build()
            .unwrap();

        assert_eq!(config.timings.addition_ms, 5);
        assert_eq!(config.timings.subtraction_ms, 100);
        assert_eq!(
            config.timings.for_operator(Operator::Div),
            Duration::from_millis(40)
        );
        assert_eq!(config.workers.computing_power, 2);
        assert_eq!(
            config.workers.claim_timeout(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(config.evaluation.task_timeout(), None);
        assert_eq!(
            config.evaluation.division_by_zero,
            DivisionByZero::ReturnLeft
        );
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = Config::builder()
            .config_path(Some(PathBuf::from("/nonexistent/abacus.toml")))
            .skip_env(true)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let file = write_config("[workers]\ncomputing_power = 0\n");
        let result = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .skip_env(true)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.timings = OperationTimings::uniform(7);
        config.workers.claim_timeout_ms = Some(250);

        let rendered = config.to_toml().unwrap();
        let file = write_config(&rendered);
        let loaded = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .skip_env(true)
            .build()
            .unwrap();
        assert_eq!(loaded, config);
    }

    /// Sets variables for the duration of a test and removes them on drop
    struct EnvVars(Vec<&'static str>);

    impl EnvVars {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            for (key, value) in vars {
                env::set_var(key, value);
            }
            Self(vars.iter().map(|(key, _)| *key).collect())
        }
    }

    impl Drop for EnvVars {
        fn drop(&mut self) {
            for key in &self.0 {
                env::remove_var(key);
            }
        }
    }

    // The only test in the crate that reads the process environment
    #[test]
    fn test_env_layers_resolve_in_order() {
        let file = write_config(
            r#"
[timings]
addition_ms = 5
subtraction_ms = 6
multiplication_ms = 8

[workers]
computing_power = 2
"#,
        );

        let _env = EnvVars::set(&[
            ("ABACUS_TIMINGS__ADDITION_MS", "7"),
            ("ABACUS_TIMINGS__SUBTRACTION_MS", "11"),
            ("ABACUS_WORKERS__COMPUTING_POWER", "3"),
            ("ABACUS_WORKERS__CLAIM_TIMEOUT_MS", "300"),
            ("ABACUS_EVALUATION__DIVISION_BY_ZERO", "return_left"),
            ("ABACUS_EVALUATION__MAX_DEPTH", "32"),
            ("TIME_ADDITION_MS", "9"),
            ("TIME_DIVISIONS_MS", "13"),
            ("COMPUTING_POWER", "6"),
        ]);

        let config = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .build()
            .unwrap();

        // Legacy variables beat ABACUS_*
        assert_eq!(config.timings.addition_ms, 9);
        assert_eq!(config.workers.computing_power, 6);
        // ABACUS_* beats the file
        assert_eq!(config.timings.subtraction_ms, 11);
        // The file beats the defaults
        assert_eq!(config.timings.multiplication_ms, 8);
        // Legacy variables beat the defaults
        assert_eq!(config.timings.division_ms, 13);

        assert_eq!(config.workers.claim_timeout_ms, Some(300));
        assert_eq!(
            config.evaluation.division_by_zero,
            DivisionByZero::ReturnLeft
        );
        assert_eq!(config.evaluation.max_depth, 32);
        assert_eq!(config.evaluation.task_timeout_ms, 60_000);
    }

    #[test]
    fn test_zero_max_depth_rejected() {
        let file = write_config("[evaluation]\nmax_depth = 0\n");
        let result = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .skip_env(true)
            .build();
        assert!(result.is_err());
    }
}
