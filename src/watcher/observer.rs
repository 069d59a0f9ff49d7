//! Observability hook for watcher threads.

use std::io;

use crate::gpio::PinId;

/// Receives notifications from the watcher loop.
///
/// Watchers never give up on a failing wait: they retry immediately and
/// forever. This hook is the only place those failures become visible.
/// Implementations run on the watcher thread and must not block.
pub trait WatchObserver: Send + Sync {
    /// An edge was detected and is about to be forwarded.
    fn on_edge(&self, _pin: PinId) {}

    /// The wait returned without an edge on the pin.
    fn on_spurious_wake(&self, _pin: PinId) {}

    /// The wait failed; `consecutive` counts failures since the last
    /// successful wait, starting at 1.
    fn on_wait_error(&self, _pin: PinId, _error: &io::Error, _consecutive: u64) {}

    /// A successful wait followed `failures` failed ones.
    fn on_recovered(&self, _pin: PinId, _failures: u64) {}

    /// The watcher loop has ended.
    fn on_stopped(&self, _pin: PinId) {}
}

/// Default observer: reports through `tracing`.
///
/// Only the first failure of a run is logged at `warn`; repeats go to `trace`
/// so a persistently failing pin cannot flood the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl WatchObserver for TracingObserver {
    fn on_edge(&self, pin: PinId) {
        tracing::trace!("[watcher] edge on pin {pin}");
    }

    fn on_spurious_wake(&self, pin: PinId) {
        tracing::trace!("[watcher] spurious wake on pin {pin}");
    }

    fn on_wait_error(&self, pin: PinId, error: &io::Error, consecutive: u64) {
        if consecutive == 1 {
            tracing::warn!("[watcher] wait failed on pin {pin}, retrying: {error}");
        } else {
            tracing::trace!("[watcher] wait failed on pin {pin} ({consecutive} in a row): {error}");
        }
    }

    fn on_recovered(&self, pin: PinId, failures: u64) {
        tracing::info!("[watcher] pin {pin} recovered after {failures} failed waits");
    }

    fn on_stopped(&self, pin: PinId) {
        crate::debug_event!("watcher", "stopped", "pin {pin}");
    }
}
