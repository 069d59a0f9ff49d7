//! Edge watching and debouncing for GPIO pins.
//!
//! # Architecture
//!
//! ```text
//! pin 27 ─ PinWatcher (thread, poll POLLPRI) ─┐
//! pin 23 ─ PinWatcher (thread, poll POLLPRI) ─┼─> raw mpsc<PinId> ─> Debouncer (task) ─> settled mpsc<PinId>
//! pin  4 ─ PinWatcher (thread, poll POLLPRI) ─┘
//!          └──────────── WatchRegistry ────────┘
//! ```
//!
//! Watchers block with no timeout and retry failed waits immediately. The
//! channel is bounded: a full channel stalls the producing watcher. A
//! [`StopSignal`] shared by all watchers of a registry ends them together.

mod debouncer;
mod error;
mod observer;
mod pin_watcher;
mod registry;
mod source;
mod stop;

pub use debouncer::{
    Burst, DebounceScope, DebounceState, DebounceStats, Debouncer, Verdict, debounce,
};
pub use error::WatchError;
pub use observer::{TracingObserver, WatchObserver};
pub use pin_watcher::{PinWatcher, WatcherExit};
pub use registry::{WatchRegistry, WatchRegistryBuilder, WatcherHandle};
pub use source::{EdgeSource, Readiness, SourceOpener, SysfsOpener, SysfsValueSource};
pub use stop::StopSignal;
