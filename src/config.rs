use crate::initializer::{Placement, UnitDeclaration, UnitId};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BootstrapperConfig {
    pub lifecycle: LifecycleConfig,
    pub logging: LoggingConfig,

    /// Demo units started by the host binary
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// Seconds of grace requested from the host while a transition runs
    #[serde(default = "default_additional_time_secs")]
    pub additional_time_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional log file, rotated daily
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// One simulated unit in the `[[units]]` table
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UnitConfig {
    pub id: UnitId,

    #[serde(default = "default_start_placement")]
    pub start_placement: Placement,

    #[serde(default = "default_stop_placement")]
    pub stop_placement: Placement,

    #[serde(default)]
    pub start_after: Vec<UnitId>,

    #[serde(default)]
    pub stop_after: Vec<UnitId>,

    /// Simulated work when starting, in milliseconds
    #[serde(default)]
    pub start_delay_ms: u64,

    /// Simulated work when stopping, in milliseconds
    #[serde(default)]
    pub stop_delay_ms: u64,

    #[serde(default)]
    pub fail_on_start: bool,

    #[serde(default)]
    pub fail_on_stop: bool,
}

impl UnitConfig {
    pub fn new<I: Into<UnitId>>(id: I) -> Self {
        Self {
            id: id.into(),
            start_placement: default_start_placement(),
            stop_placement: default_stop_placement(),
            start_after: Vec::new(),
            stop_after: Vec::new(),
            start_delay_ms: 0,
            stop_delay_ms: 0,
            fail_on_start: false,
            fail_on_stop: false,
        }
    }

    /// Ordering declaration described by this entry
    pub fn declaration(&self) -> UnitDeclaration {
        let builder = UnitDeclaration::builder(self.id.clone())
            .start_placement(self.start_placement)
            .stop_placement(self.stop_placement);
        let builder = self
            .start_after
            .iter()
            .cloned()
            .fold(builder, |builder, id| builder.start_after(id));
        self.stop_after
            .iter()
            .cloned()
            .fold(builder, |builder, id| builder.stop_after(id))
            .build()
    }
}

impl BootstrapperConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("bootstrapper.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "lifecycle.additional_time_secs",
                default_additional_time_secs(),
            )?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // BOOTSTRAPPER_LOGGING__LEVEL=debug
            .add_source(
                Environment::with_prefix("BOOTSTRAPPER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: BootstrapperConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifecycle.additional_time_secs == 0 {
            return Err(ConfigError::Message(
                "Lifecycle additional_time_secs must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "compact" | "json") {
            return Err(ConfigError::Message(format!(
                "Unknown logging format '{}', expected pretty, compact or json",
                self.logging.format
            )));
        }

        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(&unit.id) {
                return Err(ConfigError::Message(format!(
                    "Unit '{}' is declared more than once",
                    unit.id
                )));
            }
        }

        Ok(())
    }

    pub fn additional_time(&self) -> Duration {
        Duration::from_secs(self.lifecycle.additional_time_secs)
    }
}

impl Default for BootstrapperConfig {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleConfig {
                additional_time_secs: default_additional_time_secs(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
                file: None,
            },
            units: Vec::new(),
        }
    }
}

// Default value functions
fn default_additional_time_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_start_placement() -> Placement {
    Placement::Beginning
}
fn default_stop_placement() -> Placement {
    Placement::Ending
}
