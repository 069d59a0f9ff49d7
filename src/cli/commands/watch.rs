//! Watch command: register pins, debounce, print settled events.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::mpsc;

use super::configure::{Target, configure_all, gpio_utility, resolve_targets};
use crate::config::Settings;
use crate::gpio::{Edge, PinId};
use crate::watcher::{Debouncer, WatchRegistry};

/// Command-line overrides for `watch`.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub pins: Vec<PinId>,
    pub window_ms: Option<u64>,
    pub capacity: Option<usize>,
    pub raw: bool,
    pub no_configure: bool,
    pub json: bool,
}

/// One line of JSON output.
#[derive(Debug, Serialize)]
pub struct PinEvent<'a> {
    pub pin: PinId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    pub timestamp: String,
}

/// Render one settled event.
pub fn format_event(pin: PinId, name: Option<&str>, json: bool) -> Result<String> {
    if json {
        let event = PinEvent {
            pin,
            name,
            timestamp: chrono::Local::now().to_rfc3339(),
        };
        return serde_json::to_string(&event).context("cannot encode event");
    }

    Ok(match name {
        Some(name) => format!("State changed on pin={pin} ({name})"),
        None => format!("State changed on pin={pin}"),
    })
}

/// Reject targets whose edge disarms the interrupt; their watcher would
/// never wake.
pub fn check_watchable(targets: &[Target]) -> Result<()> {
    if let Some(target) = targets.iter().find(|t| t.edge == Edge::None) {
        anyhow::bail!(
            "pin {} has edge \"none\" and would never report an event",
            target.pin
        );
    }
    Ok(())
}

/// Run watch command until Ctrl+C.
pub async fn run_watch(settings: &Settings, options: WatchOptions) -> Result<()> {
    let targets = resolve_targets(settings, &options.pins);
    check_watchable(&targets)?;
    let capacity = options.capacity.unwrap_or(settings.watch.channel_capacity);

    let mut watch = settings.watch.clone();
    if let Some(window_ms) = options.window_ms {
        watch.quiet_window_ms = window_ms;
    }

    if settings.gpio.configure && !options.no_configure {
        configure_all(&gpio_utility(settings), &targets)?;
    }

    let mut registry = WatchRegistry::builder()
        .capacity(capacity)
        .layout(settings.gpio.layout())
        .build()
        .context("cannot create watch registry")?;

    if let Err(e) = registry.watch_all(targets.iter().map(|t| t.pin)) {
        registry.shutdown();
        return Err(anyhow::Error::new(e).context("cannot start watching"));
    }

    let raw = registry
        .take_notifications()
        .context("notification channel already taken")?;

    let mut events: mpsc::Receiver<PinId> = if options.raw {
        raw
    } else {
        Debouncer::from_state(watch.debounce_state()).spawn(raw)
    };

    crate::log_event!(
        "watch",
        "started",
        "{} pins, window {}ms, capacity {capacity}",
        targets.len(),
        watch.quiet_window_ms
    );

    let mut stopping = false;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c(), if !stopping => {
                if let Err(e) = signal {
                    tracing::warn!("[watch] cannot listen for Ctrl+C: {e}");
                }
                registry.shutdown();
                stopping = true;
            }

            event = events.recv() => {
                let Some(pin) = event else {
                    break;
                };
                println!("{}", format_event(pin, settings.pin_name(pin), options.json)?);
            }
        }
    }

    let exits = tokio::task::spawn_blocking(move || registry.join())
        .await
        .context("watcher join task failed")?;
    for (pin, exit) in exits {
        crate::debug_event!("watch", "watcher exited", "pin {pin}: {exit:?}");
    }
    Ok(())
}
