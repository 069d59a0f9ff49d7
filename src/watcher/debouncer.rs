//! Burst debouncing for raw pin notifications.
//!
//! The first event of a burst is forwarded immediately; everything that
//! arrives before its quiet window elapses is dropped. The window is armed
//! once, from the first event, and is not extended by the events it swallows
//! unless `extend_window` is set.
//!
//! By default one window is shared by every pin on the channel: a press on
//! one button hides a press on another inside the same window.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::gpio::PinId;

/// Which events share a quiet window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceScope {
    /// One window for all pins on the channel.
    #[default]
    Global,
    /// An independent window per pin.
    PerPin,
}

impl DebounceScope {
    fn key(self, pin: PinId) -> Option<PinId> {
        match self {
            DebounceScope::Global => None,
            DebounceScope::PerPin => Some(pin),
        }
    }
}

/// What to do with a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Forward,
    Suppress,
}

/// A burst in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    /// Pin of the forwarded event that opened the burst.
    pub first: PinId,
    pub deadline: Instant,
    pub suppressed: u32,
}

/// Debounce state machine, driven with explicit timestamps.
///
/// No burst for a key means `Idle`; a burst means `Bursting` until its
/// deadline. An event landing exactly on the deadline starts a new burst.
#[derive(Debug)]
pub struct DebounceState {
    quiet_window: Duration,
    scope: DebounceScope,
    extend_window: bool,
    bursts: HashMap<Option<PinId>, Burst>,
}

impl DebounceState {
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            scope: DebounceScope::Global,
            extend_window: false,
            bursts: HashMap::new(),
        }
    }

    pub fn with_scope(mut self, scope: DebounceScope) -> Self {
        self.scope = scope;
        self
    }

    /// Re-arm the window on every suppressed event instead of only on the
    /// first one.
    pub fn with_extend_window(mut self, extend: bool) -> Self {
        self.extend_window = extend;
        self
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet_window
    }

    /// Feed one raw event observed at `now`.
    pub fn on_event(&mut self, pin: PinId, now: Instant) -> Verdict {
        if self.quiet_window.is_zero() {
            return Verdict::Forward;
        }

        let key = self.scope.key(pin);
        match self.bursts.get_mut(&key) {
            Some(burst) if now < burst.deadline => {
                burst.suppressed += 1;
                if self.extend_window {
                    burst.deadline = now + self.quiet_window;
                }
                Verdict::Suppress
            }
            _ => {
                self.bursts.insert(
                    key,
                    Burst {
                        first: pin,
                        deadline: now + self.quiet_window,
                        suppressed: 0,
                    },
                );
                Verdict::Forward
            }
        }
    }

    /// Restart the window of the burst `pin` belongs to from `now`.
    ///
    /// Called once the forwarded event has been delivered, so time spent
    /// blocked on a full settled channel does not eat into the window.
    pub fn restart_window(&mut self, pin: PinId, now: Instant) {
        let window = self.quiet_window;
        if let Some(burst) = self.bursts.get_mut(&self.scope.key(pin)) {
            burst.deadline = now + window;
        }
    }

    /// Earliest pending deadline, if any burst is open.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.bursts.values().map(|b| b.deadline).min()
    }

    /// Timer fired: close every burst whose window has elapsed by `now`.
    pub fn on_timer(&mut self, now: Instant) -> Vec<Burst> {
        let mut settled = Vec::new();
        self.bursts.retain(|_, burst| {
            if burst.deadline <= now {
                settled.push(*burst);
                false
            } else {
                true
            }
        });
        settled
    }

    pub fn is_bursting(&self) -> bool {
        !self.bursts.is_empty()
    }
}

/// Counters returned when a debounce task ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceStats {
    pub forwarded: u64,
    pub suppressed: u64,
}

/// Runs a [`DebounceState`] between a raw and a settled channel.
#[derive(Debug)]
pub struct Debouncer {
    state: DebounceState,
}

impl Debouncer {
    pub fn new(quiet_window: Duration) -> Self {
        Self::from_state(DebounceState::new(quiet_window))
    }

    pub fn from_state(state: DebounceState) -> Self {
        Self { state }
    }

    /// Spawn the filter on the current tokio runtime and return the settled
    /// channel, sized like `raw`.
    pub fn spawn(self, raw: mpsc::Receiver<PinId>) -> mpsc::Receiver<PinId> {
        let (settled_tx, settled_rx) = mpsc::channel(raw.max_capacity());
        tokio::spawn(self.run(raw, settled_tx));
        settled_rx
    }

    /// Filter until `raw` closes or the settled receiver is dropped.
    ///
    /// Events already queued on `raw` when its senders go away are still
    /// judged and forwarded.
    pub async fn run(
        mut self,
        mut raw: mpsc::Receiver<PinId>,
        settled: mpsc::Sender<PinId>,
    ) -> DebounceStats {
        let mut stats = DebounceStats::default();

        loop {
            let deadline = self.state.next_deadline();
            let timer = sleep_until(deadline.unwrap_or_else(Instant::now));
            tokio::pin!(timer);

            tokio::select! {
                biased;

                _ = &mut timer, if deadline.is_some() => {
                    for burst in self.state.on_timer(Instant::now()) {
                        crate::debug_event!(
                            "debounce",
                            "settled",
                            "pin {} ({} suppressed)",
                            burst.first,
                            burst.suppressed
                        );
                    }
                }

                event = raw.recv() => {
                    let Some(pin) = event else {
                        break;
                    };
                    match self.state.on_event(pin, Instant::now()) {
                        Verdict::Forward => {
                            stats.forwarded += 1;
                            if settled.send(pin).await.is_err() {
                                crate::debug_event!("debounce", "settled receiver dropped");
                                break;
                            }
                            self.state.restart_window(pin, Instant::now());
                        }
                        Verdict::Suppress => {
                            stats.suppressed += 1;
                            tracing::trace!("[debounce] suppressed pin {pin}");
                        }
                    }
                }
            }
        }

        crate::debug_event!(
            "debounce",
            "finished",
            "{} forwarded, {} suppressed",
            stats.forwarded,
            stats.suppressed
        );
        stats
    }
}

/// Debounce `raw` with a shared quiet window; see [`Debouncer`].
pub fn debounce(raw: mpsc::Receiver<PinId>, quiet_window: Duration) -> mpsc::Receiver<PinId> {
    Debouncer::new(quiet_window).spawn(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(250);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn p(n: u32) -> PinId {
        PinId::new(n)
    }

    #[test]
    fn test_first_event_forwarded_rest_suppressed() {
        let t0 = Instant::now();
        let mut state = DebounceState::new(WINDOW);

        assert_eq!(state.on_event(p(1), t0), Verdict::Forward);
        assert!(state.is_bursting());
        assert_eq!(state.on_event(p(1), t0 + ms(50)), Verdict::Suppress);
        assert_eq!(state.on_event(p(2), t0 + ms(80)), Verdict::Suppress);
        assert_eq!(state.next_deadline(), Some(t0 + WINDOW));
    }

    #[test]
    fn test_window_not_extended_by_suppressed_events() {
        let t0 = Instant::now();
        let mut state = DebounceState::new(WINDOW);

        state.on_event(p(1), t0);
        state.on_event(p(1), t0 + ms(200));
        // 260ms after the first event, 60ms after the last one.
        assert_eq!(state.on_event(p(1), t0 + ms(260)), Verdict::Forward);
    }

    #[test]
    fn test_extend_window_rearms_on_suppressed_events() {
        let t0 = Instant::now();
        let mut state = DebounceState::new(WINDOW).with_extend_window(true);

        state.on_event(p(1), t0);
        state.on_event(p(1), t0 + ms(200));
        assert_eq!(state.on_event(p(1), t0 + ms(260)), Verdict::Suppress);
        assert_eq!(state.next_deadline(), Some(t0 + ms(510)));
    }

    #[test]
    fn test_event_on_deadline_starts_new_burst() {
        let t0 = Instant::now();
        let mut state = DebounceState::new(WINDOW);

        state.on_event(p(1), t0);
        assert_eq!(state.on_event(p(2), t0 + WINDOW), Verdict::Forward);
    }

    #[test]
    fn test_timer_returns_to_idle() {
        let t0 = Instant::now();
        let mut state = DebounceState::new(WINDOW);

        state.on_event(p(3), t0);
        state.on_event(p(3), t0 + ms(10));
        assert!(state.on_timer(t0 + ms(100)).is_empty());

        let settled = state.on_timer(t0 + WINDOW);
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].first, p(3));
        assert_eq!(settled[0].suppressed, 1);
        assert!(!state.is_bursting());
        assert_eq!(state.next_deadline(), None);
    }

    #[test]
    fn test_restart_window_moves_deadline() {
        let t0 = Instant::now();
        let mut state = DebounceState::new(WINDOW);

        state.on_event(p(1), t0);
        state.restart_window(p(1), t0 + ms(700));
        assert_eq!(state.next_deadline(), Some(t0 + ms(950)));
        assert_eq!(state.on_event(p(2), t0 + ms(710)), Verdict::Suppress);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_forward_does_not_shorten_window() {
        let (tx, rx) = mpsc::channel(16);
        let (settled_tx, mut settled_rx) = mpsc::channel(1);
        let task = tokio::spawn(Debouncer::new(WINDOW).run(rx, settled_tx));

        // p(1) fills the settled channel; p(2) opens a new burst whose forward
        // blocks until the consumer reads at 1000ms.
        tx.send(p(1)).await.unwrap();
        tokio::time::sleep(ms(300)).await;
        for pin in [2, 3, 4] {
            tx.send(p(pin)).await.unwrap();
            tokio::time::sleep(ms(10)).await;
        }
        drop(tx);

        tokio::time::sleep(ms(1000)).await;
        let mut got = Vec::new();
        while let Some(pin) = settled_rx.recv().await {
            got.push(pin);
        }
        assert_eq!(got, vec![p(1), p(2)]);
        assert_eq!(
            task.await.unwrap(),
            DebounceStats {
                forwarded: 2,
                suppressed: 2
            }
        );
    }

    #[test]
    fn test_zero_window_forwards_everything() {
        let t0 = Instant::now();
        let mut state = DebounceState::new(Duration::ZERO);

        for _ in 0..5 {
            assert_eq!(state.on_event(p(1), t0), Verdict::Forward);
        }
        assert!(!state.is_bursting());
    }

    #[test]
    fn test_per_pin_scope_keeps_pins_apart() {
        let t0 = Instant::now();
        let mut state = DebounceState::new(WINDOW).with_scope(DebounceScope::PerPin);

        assert_eq!(state.on_event(p(1), t0), Verdict::Forward);
        assert_eq!(state.on_event(p(2), t0 + ms(80)), Verdict::Forward);
        assert_eq!(state.on_event(p(1), t0 + ms(100)), Verdict::Suppress);
        assert_eq!(state.next_deadline(), Some(t0 + WINDOW));

        let settled = state.on_timer(t0 + WINDOW);
        assert_eq!(settled.len(), 1);
        assert_eq!(state.next_deadline(), Some(t0 + ms(80) + WINDOW));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_filter_sizes_settled_like_raw() {
        let (tx, rx) = mpsc::channel(3);
        let settled = debounce(rx, WINDOW);
        assert_eq!(settled.max_capacity(), 3);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_drains_queue_after_senders_drop() {
        let (tx, rx) = mpsc::channel(8);
        let (settled_tx, mut settled_rx) = mpsc::channel(8);

        tx.send(p(1)).await.unwrap();
        tx.send(p(1)).await.unwrap();
        tx.send(p(2)).await.unwrap();
        drop(tx);

        let stats = Debouncer::new(WINDOW).run(rx, settled_tx).await;
        assert_eq!(stats, DebounceStats { forwarded: 1, suppressed: 2 });
        assert_eq!(settled_rx.recv().await, Some(p(1)));
        assert_eq!(settled_rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_settled_receiver_dropped() {
        let (tx, rx) = mpsc::channel(8);
        let (settled_tx, settled_rx) = mpsc::channel(8);
        drop(settled_rx);

        tx.send(p(4)).await.unwrap();
        let stats = Debouncer::new(WINDOW).run(rx, settled_tx).await;
        assert_eq!(stats.forwarded, 1);
    }
}
