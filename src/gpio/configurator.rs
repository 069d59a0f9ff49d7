//! Pin preparation through the WiringPi `gpio` utility.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use thiserror::Error;

use super::{Edge, PinId};

/// Prepares a pin so that reads of its value file report each configured edge
/// as a priority readiness event.
///
/// Implementations must complete both phases: input with pull-up first, then
/// the edge interrupt.
pub trait EdgeConfigurator: Send + Sync {
    fn configure(&self, pin: PinId, edge: Edge) -> Result<(), ConfigureError>;
}

/// One invocation of the configuration tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureStep {
    Input,
    PullUp,
    Edge,
}

impl fmt::Display for ConfigureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigureStep::Input => "make input",
            ConfigureStep::PullUp => "enable pull-up",
            ConfigureStep::Edge => "arm edge interrupt",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ConfigureError {
    #[error("cannot run {program} to {step} on pin {pin}: {source}")]
    Spawn {
        pin: PinId,
        step: ConfigureStep,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed to {step} on pin {pin} ({status}): {output}")]
    Failed {
        pin: PinId,
        step: ConfigureStep,
        program: PathBuf,
        status: ExitStatus,
        output: String,
    },
}

impl ConfigureError {
    pub fn pin(&self) -> PinId {
        match self {
            ConfigureError::Spawn { pin, .. } | ConfigureError::Failed { pin, .. } => *pin,
        }
    }

    pub fn step(&self) -> ConfigureStep {
        match self {
            ConfigureError::Spawn { step, .. } | ConfigureError::Failed { step, .. } => *step,
        }
    }
}

/// [`EdgeConfigurator`] backed by the external `gpio` command.
///
/// Runs, in order:
/// - `gpio -g mode <N> in`
/// - `gpio -g mode <N> up`
/// - `gpio edge <N> <edge>`
#[derive(Debug, Clone)]
pub struct GpioUtility {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl GpioUtility {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed before every generated command line
    /// (e.g. running the tool through a wrapper).
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn run(&self, pin: PinId, step: ConfigureStep, args: &[&str]) -> Result<(), ConfigureError> {
        crate::debug_event!("gpio", "exec", "{} {}", self.program.display(), args.join(" "));

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .output()
            .map_err(|source| ConfigureError::Spawn {
                pin,
                step,
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ConfigureError::Failed {
                pin,
                step,
                program: self.program.clone(),
                status: output.status,
                output: text.trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Default for GpioUtility {
    fn default() -> Self {
        Self::new("gpio")
    }
}

impl EdgeConfigurator for GpioUtility {
    fn configure(&self, pin: PinId, edge: Edge) -> Result<(), ConfigureError> {
        let number = pin.to_string();

        self.run(pin, ConfigureStep::Input, &["-g", "mode", &number, "in"])?;
        self.run(pin, ConfigureStep::PullUp, &["-g", "mode", &number, "up"])?;
        self.run(pin, ConfigureStep::Edge, &["edge", &number, edge.as_str()])?;

        crate::log_event!("gpio", "configured", "pin {pin} edge={edge}");
        Ok(())
    }
}
