//! Benchmark configuration.
//!
//! Values come from three layers, highest precedence first: command-line
//! overrides, an optional TOML file, and the built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::partition::derive_batch_size;
use crate::workload::Workload;

/// Contact points used when none are configured.
pub const DEFAULT_NODES: [&str; 6] = [
    "192.168.101.101:9042",
    "192.168.101.102:9042",
    "192.168.101.103:9042",
    "192.168.101.104:9042",
    "192.168.101.105:9042",
    "192.168.101.106:9042",
];
/// Requests performed when `tasks` is not configured.
pub const DEFAULT_TASKS: i64 = 1_000_000;
/// Concurrent workers when `concurrency` is not configured.
pub const DEFAULT_CONCURRENCY: usize = 1024;
/// Driver request timeout when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Minimum pool size for the untimed pre-population pass.
pub const MIN_PREPOPULATION_WORKERS: usize = 1024;

/// Where requests are sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A real cluster through the ScyllaDB driver.
    #[default]
    Scylla,
    /// The in-process store.
    Memory,
}

/// Fully resolved, validated benchmark settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    /// Contact points as `host:port`.
    pub node_addresses: Vec<String>,
    /// Statements issued per key.
    pub workload: Workload,
    /// Number of keys, `[0, tasks)`. In a mixed run each key costs two
    /// requests.
    pub tasks: i64,
    /// Workers in the timed pool.
    pub concurrency: usize,
    /// Skip dropping/recreating the schema and pre-populating selects.
    pub skip_setup: bool,
    /// Per-request timeout handed to the driver.
    pub request_timeout: Duration,
    /// Request target.
    pub backend: BackendKind,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            node_addresses: DEFAULT_NODES.iter().map(|s| s.to_string()).collect(),
            workload: Workload::Mixed,
            tasks: DEFAULT_TASKS,
            concurrency: DEFAULT_CONCURRENCY,
            skip_setup: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backend: BackendKind::default(),
        }
    }
}

impl BenchConfig {
    /// Keys handed out per claim: `min(256, max(1, tasks / concurrency))`.
    pub fn batch_size(&self) -> i64 {
        derive_batch_size(self.tasks, self.concurrency)
    }

    /// Pool size for the pre-population pass.
    pub fn prepopulation_workers(&self) -> usize {
        self.concurrency.max(MIN_PREPOPULATION_WORKERS)
    }

    /// Whether a selects run must be preceded by the insert pass.
    pub fn needs_prepopulation(&self) -> bool {
        self.workload == Workload::Selects && !self.skip_setup
    }

    /// Checks the invariants the pool relies on.
    pub fn validate(&self) -> Result<()> {
        if self.tasks < 0 {
            return Err(BenchError::InvalidConfig(format!(
                "tasks must be >= 0, got {}",
                self.tasks
            )));
        }
        if self.concurrency == 0 {
            return Err(BenchError::InvalidConfig(
                "concurrency must be >= 1".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(BenchError::InvalidConfig(
                "request timeout must be positive".into(),
            ));
        }
        if self.backend == BackendKind::Scylla {
            if self.node_addresses.is_empty() {
                return Err(BenchError::InvalidConfig(
                    "at least one node address is required".into(),
                ));
            }
            if let Some(bad) = self.node_addresses.iter().find(|a| a.trim().is_empty()) {
                return Err(BenchError::InvalidConfig(format!(
                    "invalid node address '{bad}'"
                )));
            }
        }
        Ok(())
    }

    /// Applies `file` then `overrides` on top of the defaults and validates
    /// the result.
    pub fn resolve(file: &FileConfig, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = Self::default();
        config.apply(&file.bench)?;
        config.apply(overrides)?;
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, layer: &ConfigOverrides) -> Result<()> {
        if let Some(nodes) = layer.nodes.as_deref() {
            self.node_addresses = parse_nodes(nodes);
        }
        if let Some(workload) = layer.workload.as_deref() {
            self.workload = workload.parse()?;
        }
        if let Some(tasks) = layer.tasks {
            self.tasks = tasks;
        }
        if let Some(concurrency) = layer.concurrency {
            self.concurrency = usize::try_from(concurrency).map_err(|_| {
                BenchError::InvalidConfig(format!("concurrency must be >= 1, got {concurrency}"))
            })?;
        }
        if let Some(skip) = layer.skip_setup {
            self.skip_setup = skip;
        }
        if let Some(ms) = layer.request_timeout_ms {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(backend) = layer.backend {
            self.backend = backend;
        }
        Ok(())
    }
}

/// Splits a comma-separated node list, dropping empty entries.
pub fn parse_nodes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One configuration layer. Every field is optional; unset fields fall
/// through to the layer below.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Comma-separated `host:port` list.
    pub nodes: Option<String>,
    /// `inserts`, `selects` or `mixed`.
    pub workload: Option<String>,
    /// Number of keys.
    pub tasks: Option<i64>,
    /// Workers in the timed pool.
    pub concurrency: Option<i64>,
    /// Skip schema setup and pre-population.
    pub skip_setup: Option<bool>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Request target.
    pub backend: Option<BackendKind>,
}

/// Contents of the TOML configuration file.
///
/// ```toml
/// log_level = "info"
///
/// [bench]
/// nodes = "10.0.0.1:9042,10.0.0.2:9042"
/// workload = "selects"
/// tasks = 500000
/// concurrency = 256
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Default tracing filter directive.
    pub log_level: Option<String>,
    /// Benchmark settings.
    pub bench: ConfigOverrides,
}

impl FileConfig {
    /// Loads `explicit`, or the default config path when it exists. An
    /// explicitly named file must exist; a missing default file yields an
    /// empty layer.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => read_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parses TOML text.
    pub fn from_toml(contents: &str, origin: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|source| BenchError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path).map_err(|source| BenchError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    FileConfig::from_toml(&contents, path)
}

/// `$CONFIG_DIR/cqlbench/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("cqlbench").join("config.toml"))
}
