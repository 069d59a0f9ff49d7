//! Edge-triggered GPIO input over Linux sysfs.
//!
//! One blocking watcher per pin feeds a shared bounded channel; a debouncer
//! collapses bursts into single settled events.

pub mod cli;
pub mod config;
pub mod gpio;
pub mod logging;
pub mod watcher;

pub use config::{PinConfig, Settings, SettingsError};
pub use gpio::{Edge, EdgeConfigurator, GpioUtility, PinId, SysfsLayout};
pub use watcher::{
    DebounceScope, Debouncer, PinWatcher, StopSignal, WatchError, WatchRegistry, debounce,
};
