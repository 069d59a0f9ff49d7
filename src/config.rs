//! Configuration for the pinwatch binary.
//!
//! Layered, lowest priority first:
//! - Default values
//! - TOML configuration file (`--config <path>`, else `pinwatch.toml` in the
//!   working directory when present)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `PINWATCH_` and use double
//! underscores to separate nested levels:
//! - `PINWATCH_WATCH__QUIET_WINDOW_MS=100` sets `watch.quiet_window_ms`
//! - `PINWATCH_GPIO__SYSFS_ROOT=/tmp/gpio` sets `gpio.sysfs_root`
//! - `PINWATCH_LOGGING__DEFAULT=debug` sets `logging.default`

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gpio::{Edge, PinId, SysfsLayout};
use crate::watcher::{DebounceScope, DebounceState};

pub const DEFAULT_CONFIG_FILE: &str = "pinwatch.toml";
const ENV_PREFIX: &str = "PINWATCH_";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration file already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// How pins are reached and prepared
    #[serde(default)]
    pub gpio: GpioConfig,

    /// Watch channel and debounce parameters
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pins to watch
    #[serde(default = "default_pins")]
    pub pins: Vec<PinConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GpioConfig {
    /// Root of the sysfs GPIO class directory
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Configuration utility (WiringPi `gpio`)
    #[serde(default = "default_utility")]
    pub utility: PathBuf,

    /// Extra arguments placed before every utility command line
    #[serde(default)]
    pub utility_args: Vec<String>,

    /// Run the utility for every pin before watching
    #[serde(default = "default_true")]
    pub configure: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Capacity of the raw and settled channels
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Quiet window after a forwarded event, in milliseconds
    #[serde(default = "default_quiet_window_ms")]
    pub quiet_window_ms: u64,

    /// Share one window across pins (`global`) or keep one per pin (`per_pin`)
    #[serde(default)]
    pub scope: DebounceScope,

    /// Re-arm the window on every suppressed event
    #[serde(default)]
    pub extend_window: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PinConfig {
    pub name: String,
    pub number: PinId,
    #[serde(default)]
    pub edge: Edge,
}

impl PinConfig {
    pub fn new(name: &str, number: u32, edge: Edge) -> Self {
        Self {
            name: name.to_string(),
            number: PinId::new(number),
            edge,
        }
    }
}

fn default_sysfs_root() -> PathBuf {
    SysfsLayout::default().root().to_path_buf()
}
fn default_utility() -> PathBuf {
    PathBuf::from("gpio")
}
fn default_true() -> bool {
    true
}
fn default_channel_capacity() -> usize {
    1
}
fn default_quiet_window_ms() -> u64 {
    250
}
fn default_log_level() -> String {
    "warn".to_string()
}

/// The Pi keypad bonnet: a five-way joystick and two buttons.
fn default_pins() -> Vec<PinConfig> {
    vec![
        PinConfig::new("left", 27, Edge::Falling),
        PinConfig::new("right", 23, Edge::Falling),
        PinConfig::new("center", 4, Edge::Falling),
        PinConfig::new("up", 17, Edge::Falling),
        PinConfig::new("down", 22, Edge::Falling),
        PinConfig::new("a", 5, Edge::Falling),
        PinConfig::new("b", 6, Edge::Falling),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gpio: GpioConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
            pins: default_pins(),
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            utility: default_utility(),
            utility_args: Vec::new(),
            configure: true,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            quiet_window_ms: default_quiet_window_ms(),
            scope: DebounceScope::Global,
            extend_window: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl GpioConfig {
    pub fn layout(&self) -> SysfsLayout {
        SysfsLayout::new(&self.sysfs_root)
    }
}

impl WatchConfig {
    pub fn quiet_window(&self) -> Duration {
        Duration::from_millis(self.quiet_window_ms)
    }

    /// Fresh debounce state for these parameters.
    pub fn debounce_state(&self) -> DebounceState {
        DebounceState::new(self.quiet_window())
            .with_scope(self.scope)
            .with_extend_window(self.extend_window)
    }
}

impl Settings {
    /// Load from defaults, the config file and the environment.
    ///
    /// `path` must exist when given; otherwise `pinwatch.toml` in the working
    /// directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(SettingsError::Invalid(format!(
                        "configuration file not found: {}",
                        path.display()
                    )));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        }

        let settings: Settings = figment
            .merge(
                Env::prefixed(ENV_PREFIX).map(|key| {
                    key.as_str()
                        .to_lowercase()
                        .replace("__", ".") // Double underscore becomes dot
                        .into()
                }),
            )
            .extract()
            .map_err(Box::new)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load from one file, ignoring the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.watch.channel_capacity == 0 {
            return Err(SettingsError::Invalid(
                "watch.channel_capacity must be at least 1".into(),
            ));
        }
        if self.pins.is_empty() {
            return Err(SettingsError::Invalid("no pins configured".into()));
        }

        let mut names = HashSet::new();
        for pin in &self.pins {
            if !names.insert(pin.name.as_str()) {
                return Err(SettingsError::Invalid(format!(
                    "duplicate pin name '{}'",
                    pin.name
                )));
            }
        }
        Ok(())
    }

    /// Name configured for a pin number, if any.
    pub fn pin_name(&self, pin: PinId) -> Option<&str> {
        self.pins
            .iter()
            .find(|p| p.number == pin)
            .map(|p| p.name.as_str())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Write a default configuration file at `path`.
    pub fn init_config_file(path: &Path, force: bool) -> Result<PathBuf, SettingsError> {
        if !force && path.exists() {
            return Err(SettingsError::AlreadyExists(path.to_path_buf()));
        }
        Settings::default().save(path)?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.gpio.sysfs_root, PathBuf::from("/sys/class/gpio"));
        assert_eq!(settings.watch.channel_capacity, 1);
        assert_eq!(settings.watch.quiet_window(), Duration::from_millis(250));
        assert_eq!(settings.watch.scope, DebounceScope::Global);
        assert_eq!(settings.pins.len(), 7);
        assert_eq!(settings.pin_name(PinId::new(27)), Some("left"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("pinwatch.toml");

        let toml_content = r#"
[gpio]
sysfs_root = "/tmp/gpio"
configure = false

[watch]
channel_capacity = 8
quiet_window_ms = 100
scope = "per_pin"

[logging.modules]
watcher = "debug"

[[pins]]
name = "fire"
number = 12
edge = "both"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.gpio.sysfs_root, PathBuf::from("/tmp/gpio"));
        assert!(!settings.gpio.configure);
        assert_eq!(settings.watch.channel_capacity, 8);
        assert_eq!(settings.watch.scope, DebounceScope::PerPin);
        assert!(!settings.watch.extend_window);
        assert_eq!(settings.logging.modules["watcher"], "debug");
        // Pin table is replaced, not merged.
        assert_eq!(settings.pins, vec![PinConfig::new("fire", 12, Edge::Both)]);
        // Untouched values keep their defaults.
        assert_eq!(settings.gpio.utility, PathBuf::from("gpio"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("pinwatch.toml");
        fs::write(&config_path, "[watch]\nchannel_capacity = 0\n").unwrap();

        assert!(matches!(
            Settings::load_from(&config_path),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_duplicate_pin_names_rejected() {
        let mut settings = Settings::default();
        settings.pins.push(PinConfig::new("left", 9, Edge::Rising));
        assert!(settings.validate().is_err());

        settings.pins.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_init() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("conf").join("pinwatch.toml");

        let mut settings = Settings::default();
        settings.watch.quiet_window_ms = 40;
        settings.save(&config_path).unwrap();
        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded, settings);

        assert!(matches!(
            Settings::init_config_file(&config_path, false),
            Err(SettingsError::AlreadyExists(_))
        ));
        Settings::init_config_file(&config_path, true).unwrap();
        assert_eq!(Settings::load_from(&config_path).unwrap(), Settings::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(Settings::load(Some(missing.as_path())).is_err());
    }
}
