//! The per-pin wait loop.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use super::observer::WatchObserver;
use super::source::{EdgeSource, Readiness};
use super::{StopSignal, WatchError};
use crate::gpio::PinId;

/// Why a watcher loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherExit {
    /// The stop signal was raised.
    Stopped,
    /// Every receiver of the notification channel is gone.
    ConsumerGone,
}

/// Forwards each edge on one pin into the shared notification channel.
pub struct PinWatcher<S: EdgeSource> {
    source: S,
    notify: mpsc::Sender<PinId>,
    stop: StopSignal,
    observer: Arc<dyn WatchObserver>,
}

impl<S: EdgeSource> PinWatcher<S> {
    pub fn new(
        source: S,
        notify: mpsc::Sender<PinId>,
        stop: StopSignal,
        observer: Arc<dyn WatchObserver>,
    ) -> Self {
        Self {
            source,
            notify,
            stop,
            observer,
        }
    }

    /// Run the loop on a dedicated, named OS thread.
    pub fn spawn(self) -> Result<JoinHandle<WatcherExit>, WatchError> {
        let pin = self.source.pin();
        std::thread::Builder::new()
            .name(format!("pinwatch-gpio{pin}"))
            .spawn(move || self.run())
            .map_err(|source| WatchError::SpawnFailed { pin, source })
    }

    /// Block forever forwarding edges, until stopped or nobody listens.
    ///
    /// Failed waits are retried immediately and without limit. A full channel
    /// stalls this loop (backpressure), delaying later edges on the pin.
    pub fn run(mut self) -> WatcherExit {
        let pin = self.source.pin();
        let mut failures: u64 = 0;

        let exit = loop {
            let readiness = match self.source.wait(&self.stop) {
                Ok(readiness) => readiness,
                Err(e) => {
                    failures += 1;
                    self.observer.on_wait_error(pin, &e, failures);
                    continue;
                }
            };

            if failures > 0 {
                self.observer.on_recovered(pin, failures);
                failures = 0;
            }

            match readiness {
                Readiness::Stopped => break WatcherExit::Stopped,
                Readiness::Spurious => self.observer.on_spurious_wake(pin),
                Readiness::Edge => {
                    if let Err(e) = self.source.acknowledge() {
                        crate::debug_event!("watcher", "acknowledge failed", "pin {pin}: {e}");
                    }
                    self.observer.on_edge(pin);
                    if self.notify.blocking_send(pin).is_err() {
                        break WatcherExit::ConsumerGone;
                    }
                }
            }
        };

        self.observer.on_stopped(pin);
        exit
    }
}
