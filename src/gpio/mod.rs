//! GPIO primitives shared by the watcher pipeline.
//!
//! Pins are addressed in the platform's native (BCM) numbering and reached
//! through the legacy sysfs interface:
//!
//! ```text
//! <sysfs_root>/gpio<N>/value   <- polled for POLLPRI by the watcher
//! gpio -g mode N in/up         <- EdgeConfigurator, phase 1
//! gpio edge N <edge>           <- EdgeConfigurator, phase 2
//! ```

mod configurator;
mod edge;
mod layout;
mod pin;

pub use configurator::{ConfigureError, ConfigureStep, EdgeConfigurator, GpioUtility};
pub use edge::{Edge, ParseEdgeError};
pub use layout::SysfsLayout;
pub use pin::{ParsePinError, PinId};
