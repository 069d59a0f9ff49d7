use std::path::{Path, PathBuf};

use super::PinId;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Where the kernel exposes exported pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsLayout {
    root: PathBuf,
}

impl SysfsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of an exported pin, `<root>/gpio<N>`.
    pub fn pin_dir(&self, pin: PinId) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    /// The value file the watcher polls.
    pub fn value_path(&self, pin: PinId) -> PathBuf {
        self.pin_dir(pin).join("value")
    }
}

impl Default for SysfsLayout {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}
