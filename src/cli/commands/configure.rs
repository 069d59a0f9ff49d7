//! Configure command and pin selection shared with `watch`.

use anyhow::{Context, Result};

use crate::config::Settings;
use crate::gpio::{Edge, EdgeConfigurator, GpioUtility, PinId};

/// A pin selected on the command line or from the pin table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub pin: PinId,
    pub name: Option<String>,
    pub edge: Edge,
}

/// Resolve the pins a command operates on.
///
/// An empty `requested` list selects the whole pin table. Requested pins not in
/// the table are watched for the default edge.
pub fn resolve_targets(settings: &Settings, requested: &[PinId]) -> Vec<Target> {
    if requested.is_empty() {
        return settings
            .pins
            .iter()
            .map(|p| Target {
                pin: p.number,
                name: Some(p.name.clone()),
                edge: p.edge,
            })
            .collect();
    }

    requested
        .iter()
        .map(|&pin| {
            let entry = settings.pins.iter().find(|p| p.number == pin);
            Target {
                pin,
                name: entry.map(|p| p.name.clone()),
                edge: entry.map(|p| p.edge).unwrap_or_default(),
            }
        })
        .collect()
}

/// The configuration utility described by `settings`.
pub fn gpio_utility(settings: &Settings) -> GpioUtility {
    GpioUtility::new(&settings.gpio.utility).with_leading_args(settings.gpio.utility_args.clone())
}

/// Configure every target, stopping at the first failure.
pub fn configure_all(configurator: &dyn EdgeConfigurator, targets: &[Target]) -> Result<()> {
    for target in targets {
        configurator
            .configure(target.pin, target.edge)
            .with_context(|| format!("failed to configure pin {}", target.pin))?;
    }
    Ok(())
}

/// Run configure command.
pub fn run_configure(settings: &Settings, pins: &[PinId]) -> Result<()> {
    let targets = resolve_targets(settings, pins);
    configure_all(&gpio_utility(settings), &targets)?;

    for target in &targets {
        match &target.name {
            Some(name) => println!("Configured pin {} ({name}) edge={}", target.pin, target.edge),
            None => println!("Configured pin {} edge={}", target.pin, target.edge),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinConfig;
    use crate::gpio::ConfigureError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(PinId, Edge)>>,
        fail_on: Option<PinId>,
    }

    impl EdgeConfigurator for Recording {
        fn configure(&self, pin: PinId, edge: Edge) -> Result<(), ConfigureError> {
            if self.fail_on == Some(pin) {
                return Err(ConfigureError::Spawn {
                    pin,
                    step: crate::gpio::ConfigureStep::Input,
                    program: "gpio".into(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            self.calls.lock().unwrap().push((pin, edge));
            Ok(())
        }
    }

    fn settings() -> Settings {
        Settings {
            pins: vec![
                PinConfig::new("fire", 12, Edge::Both),
                PinConfig::new("jump", 13, Edge::Falling),
            ],
            ..Settings::default()
        }
    }

    #[test]
    fn test_empty_request_selects_pin_table() {
        let targets = resolve_targets(&settings(), &[]);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].name.as_deref(), Some("fire"));
        assert_eq!(targets[0].edge, Edge::Both);
    }

    #[test]
    fn test_unknown_pin_gets_default_edge() {
        let targets = resolve_targets(&settings(), &[PinId::new(13), PinId::new(40)]);
        assert_eq!(targets[0].name.as_deref(), Some("jump"));
        assert_eq!(targets[1].name, None);
        assert_eq!(targets[1].edge, Edge::Falling);
    }

    #[test]
    fn test_configure_all_stops_at_first_failure() {
        let configurator = Recording {
            fail_on: Some(PinId::new(13)),
            ..Recording::default()
        };
        let targets = resolve_targets(&settings(), &[PinId::new(12), PinId::new(13), PinId::new(4)]);

        let err = configure_all(&configurator, &targets).unwrap_err();
        assert!(err.to_string().contains("pin 13"));
        assert_eq!(
            *configurator.calls.lock().unwrap(),
            vec![(PinId::new(12), Edge::Both)]
        );
    }
}
