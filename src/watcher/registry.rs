//! Bulk registration of pins against one shared notification channel.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use super::observer::{TracingObserver, WatchObserver};
use super::pin_watcher::{PinWatcher, WatcherExit};
use super::source::{EdgeSource, SourceOpener, SysfsOpener};
use super::{StopSignal, WatchError};
use crate::gpio::{PinId, SysfsLayout};

/// A running watcher thread.
#[derive(Debug)]
pub struct WatcherHandle {
    pin: PinId,
    thread: JoinHandle<WatcherExit>,
}

impl WatcherHandle {
    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Owns the shared raw notification channel and one watcher per registered
/// pin.
///
/// Registering the same pin twice starts two independent watchers on the same
/// value file; an edge seen by both is reported twice.
pub struct WatchRegistry<O: SourceOpener = SysfsOpener> {
    opener: O,
    capacity: usize,
    notify: Option<mpsc::Sender<PinId>>,
    notifications: Option<mpsc::Receiver<PinId>>,
    stop: StopSignal,
    observer: Arc<dyn WatchObserver>,
    watchers: Vec<WatcherHandle>,
}

impl WatchRegistry<SysfsOpener> {
    /// Registry over the default sysfs layout.
    pub fn new(capacity: usize) -> Result<Self, WatchError> {
        Self::builder().capacity(capacity).build()
    }

    pub fn builder() -> WatchRegistryBuilder {
        WatchRegistryBuilder::new()
    }
}

impl<O: SourceOpener> WatchRegistry<O> {
    /// Open `pin` and start watching it.
    pub fn watch(&mut self, pin: PinId) -> Result<(), WatchError> {
        if self.notify.is_none() {
            return Err(WatchError::ShutDown);
        }
        let source = self.opener.open(pin)?;
        self.watch_source(source)
    }

    /// Register `pins` in order, stopping at the first failure.
    ///
    /// Pins registered before the failure keep running; nothing is rolled
    /// back.
    pub fn watch_all<I>(&mut self, pins: I) -> Result<(), WatchError>
    where
        I: IntoIterator<Item = PinId>,
    {
        for pin in pins {
            if let Err(e) = self.watch(pin) {
                tracing::error!("[registry] failed to watch pin {pin}: {e}");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Start a watcher for an already opened source.
    pub fn watch_source<S: EdgeSource>(&mut self, source: S) -> Result<(), WatchError> {
        let notify = self.notify.clone().ok_or(WatchError::ShutDown)?;
        let pin = source.pin();

        let thread =
            PinWatcher::new(source, notify, self.stop.clone(), self.observer.clone()).spawn()?;
        self.watchers.push(WatcherHandle { pin, thread });

        crate::log_event!("registry", "watching", "pin {pin}");
        Ok(())
    }

    /// Hand out the raw notification channel. Returns `None` once taken.
    pub fn take_notifications(&mut self) -> Option<mpsc::Receiver<PinId>> {
        self.notifications.take()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pins in registration order, duplicates included.
    pub fn watched_pins(&self) -> Vec<PinId> {
        self.watchers.iter().map(WatcherHandle::pin).collect()
    }

    pub fn watchers(&self) -> &[WatcherHandle] {
        &self.watchers
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Stop every watcher and release the registry's sender.
    ///
    /// Once all watchers have exited the raw channel closes, which in turn
    /// ends a downstream debouncer after it has drained what was queued.
    pub fn shutdown(&mut self) {
        if self.notify.take().is_some() {
            crate::log_event!("registry", "shutdown", "{} watchers", self.watchers.len());
        }
        self.stop.raise();
    }

    /// Shut down and wait for every watcher thread.
    pub fn join(mut self) -> Vec<(PinId, WatcherExit)> {
        self.shutdown();
        let mut exits = Vec::with_capacity(self.watchers.len());
        for handle in self.watchers.drain(..) {
            match handle.thread.join() {
                Ok(exit) => exits.push((handle.pin, exit)),
                Err(_) => tracing::error!("[registry] watcher for pin {} panicked", handle.pin),
            }
        }
        exits
    }
}

/// Builder for [`WatchRegistry`].
pub struct WatchRegistryBuilder {
    capacity: usize,
    layout: SysfsLayout,
    observer: Arc<dyn WatchObserver>,
}

impl WatchRegistryBuilder {
    pub fn new() -> Self {
        Self {
            capacity: 1,
            layout: SysfsLayout::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Raw channel capacity; must be at least 1.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn layout(mut self, layout: SysfsLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn WatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Result<WatchRegistry<SysfsOpener>, WatchError> {
        let opener = SysfsOpener::new(self.layout.clone());
        self.build_with_opener(opener)
    }

    /// Build with a custom way of opening sources; the layout is ignored.
    pub fn build_with_opener<O: SourceOpener>(self, opener: O) -> Result<WatchRegistry<O>, WatchError> {
        if self.capacity == 0 {
            return Err(WatchError::ZeroCapacity);
        }
        let stop = StopSignal::new().map_err(|source| WatchError::StopSignal { source })?;
        let (tx, rx) = mpsc::channel(self.capacity);

        Ok(WatchRegistry {
            opener,
            capacity: self.capacity,
            notify: Some(tx),
            notifications: Some(rx),
            stop,
            observer: self.observer,
            watchers: Vec::new(),
        })
    }
}

impl Default for WatchRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
