//! Check configuration.
//!
//! Settings are layered, lowest priority first:
//!
//! 1. built-in defaults,
//! 2. an optional config file (any format the `config` crate reads),
//! 3. `IFTRAFFIC_*` environment variables,
//! 4. command-line flags, applied by the binary on the loaded [`Settings`].
//!
//! ```toml
//! data_file = "/var/tmp/traffic_stats.dat"
//! unit = "Mbps"
//! bandwidth = 1000
//! warning = 85
//! critical = 98
//! exclude = ["lo"]
//!
//! [[counters]]
//! name = "rx_bytes"
//! prefix = "in-"
//! ```
//!
//! [`Settings`] is the raw, string-typed form; [`CheckConfig`] is the
//! validated value the engine runs with.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::{Thresholds, Unit};
use crate::error::CheckError;
use crate::filter::InterfaceFilter;
use crate::source::LinkType;

pub const DEFAULT_DATA_FILE: &str = "/var/tmp/traffic_stats.dat";
pub const DEFAULT_WARNING: f64 = 85.0;
pub const DEFAULT_CRITICAL: f64 = 98.0;
/// 100 Mbps, in bytes per second.
pub const DEFAULT_BANDWIDTH: f64 = 1000.0 * 1000.0 * 100.0 / 8.0;

const ENV_PREFIX: &str = "IFTRAFFIC";

/// A kernel counter to report and the label prefix of its metrics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CounterSpec {
    pub name: String,
    pub prefix: String,
}

impl CounterSpec {
    pub fn new(name: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
        }
    }

    /// Metric label for `interface`, e.g. `in-eth0`.
    pub fn label(&self, interface: &str) -> String {
        format!("{}{}", self.prefix, interface)
    }
}

/// Received and transmitted bytes.
pub fn default_counters() -> Vec<CounterSpec> {
    vec![
        CounterSpec::new("rx_bytes", "in-"),
        CounterSpec::new("tx_bytes", "out-"),
    ]
}

/// Raw settings as read from the config file and the environment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_file: PathBuf,
    pub unit: String,
    pub warning: f64,
    pub critical: f64,
    /// Bandwidth ceiling in `unit`. Defaults to 100 Mbps.
    pub bandwidth: Option<f64>,
    pub interfaces: Vec<String>,
    pub exclude: Vec<String>,
    pub excludere: Vec<String>,
    pub linktype: Vec<String>,
    pub counters: Vec<CounterSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            unit: Unit::BYTES_PER_SEC.to_string(),
            warning: DEFAULT_WARNING,
            critical: DEFAULT_CRITICAL,
            bandwidth: None,
            interfaces: Vec::new(),
            exclude: Vec::new(),
            excludere: Vec::new(),
            linktype: Vec::new(),
            counters: default_counters(),
        }
    }
}

impl Settings {
    /// Load settings from an optional config file and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self, CheckError> {
        let mut builder = Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("interfaces")
                    .with_list_parse_key("exclude")
                    .with_list_parse_key("excludere")
                    .with_list_parse_key("linktype"),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// Validated configuration of one check run.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub data_file: PathBuf,
    /// Display unit; rates are converted into it before classification.
    pub unit: Unit,
    pub warning: f64,
    pub critical: f64,
    /// Bandwidth ceiling, in `unit`.
    pub bandwidth: f64,
    pub counters: Vec<CounterSpec>,
    pub filter: InterfaceFilter,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            unit: Unit::BYTES_PER_SEC,
            warning: DEFAULT_WARNING,
            critical: DEFAULT_CRITICAL,
            bandwidth: DEFAULT_BANDWIDTH,
            counters: default_counters(),
            filter: InterfaceFilter::default(),
        }
    }
}

impl CheckConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.bandwidth, self.warning, self.critical)
    }

    /// Name of the check in the plugin output.
    pub fn check_name(&self) -> String {
        format!("Traffic {}", self.unit)
    }
}

impl TryFrom<Settings> for CheckConfig {
    type Error = CheckError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let unit: Unit = settings.unit.parse()?;

        let link_types = settings
            .linktype
            .iter()
            .map(|name| name.parse::<LinkType>().map_err(CheckError::Config))
            .collect::<Result<Vec<_>, _>>()?;

        let filter = InterfaceFilter {
            include: settings.interfaces,
            exclude: settings.exclude,
            exclude_patterns: InterfaceFilter::compile_patterns(settings.excludere.as_slice())?,
            link_types,
        };
        filter.validate()?;

        if settings.counters.is_empty() {
            return Err(CheckError::Config("no counters configured".to_string()));
        }

        // The default ceiling is defined in bytes/sec; an explicit one is
        // already in the display unit.
        let bandwidth = settings
            .bandwidth
            .unwrap_or_else(|| unit.convert(DEFAULT_BANDWIDTH));

        Ok(Self {
            data_file: settings.data_file,
            unit,
            warning: settings.warning,
            critical: settings.critical,
            bandwidth,
            counters: settings.counters,
            filter,
        })
    }
}
