//! Edge sources: what a watcher thread blocks on.
//!
//! [`SysfsValueSource`] is the real one, a sysfs `value` file polled for
//! `POLLPRI`. The trait lets the registry drive anything with the same
//! wait/acknowledge shape.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::fd::{AsFd, AsRawFd};
use std::path::{Path, PathBuf};

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

use super::{StopSignal, WatchError};
use crate::gpio::{PinId, SysfsLayout};

/// Outcome of one blocking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The configured edge occurred.
    Edge,
    /// The wait returned but nothing is pending on the pin.
    Spurious,
    /// The stop signal was raised.
    Stopped,
}

/// A per-pin source of edge readiness.
pub trait EdgeSource: Send + 'static {
    fn pin(&self) -> PinId;

    /// Block until the next edge or until `stop` is raised. No timeout.
    ///
    /// Errors are transient from the caller's point of view.
    fn wait(&mut self, stop: &StopSignal) -> io::Result<Readiness>;

    /// Clear the interrupt condition after [`Readiness::Edge`].
    fn acknowledge(&mut self) -> io::Result<()>;
}

/// Opens the [`EdgeSource`] for a pin at registration time.
pub trait SourceOpener {
    type Source: EdgeSource;

    fn open(&self, pin: PinId) -> Result<Self::Source, WatchError>;
}

nix::ioctl_read_bad!(fionread, nix::libc::FIONREAD, nix::libc::c_int);

/// A pin's sysfs `value` file.
#[derive(Debug)]
pub struct SysfsValueSource {
    pin: PinId,
    path: PathBuf,
    file: File,
}

impl SysfsValueSource {
    /// Open the value file read-only and discard whatever is already pending,
    /// so state captured before watching began is not reported as an edge.
    pub fn open(pin: PinId, path: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let path = path.into();
        let unavailable = |source: io::Error| WatchError::ResourceUnavailable {
            pin,
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).map_err(unavailable)?;
        let pending = pending_bytes(&file).map_err(unavailable)?;
        let drained = io::copy(&mut (&mut file).take(pending), &mut io::sink());
        if let Err(e) = drained {
            crate::debug_event!("watcher", "drain failed", "pin {pin}: {e}");
        }

        Ok(Self { pin, path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn pending_bytes(file: &File) -> io::Result<u64> {
    let mut count: nix::libc::c_int = 0;
    // SAFETY: FIONREAD writes a single c_int through the pointer, which
    // refers to a live local; the descriptor is owned by `file`.
    unsafe { fionread(file.as_raw_fd(), &mut count) }?;
    Ok(u64::try_from(count).unwrap_or(0))
}

impl EdgeSource for SysfsValueSource {
    fn pin(&self) -> PinId {
        self.pin
    }

    fn wait(&mut self, stop: &StopSignal) -> io::Result<Readiness> {
        let mut fds = [
            PollFd::new(self.file.as_fd(), PollFlags::POLLPRI | PollFlags::POLLERR),
            PollFd::new(stop.wake_fd(), PollFlags::POLLIN),
        ];
        let count = poll(&mut fds, PollTimeout::NONE)?;

        if stop.is_raised() {
            return Ok(Readiness::Stopped);
        }
        if count <= 0 {
            return Ok(Readiness::Spurious);
        }

        let fired = fds[0]
            .revents()
            .is_some_and(|r| r.intersects(PollFlags::POLLPRI | PollFlags::POLLERR));
        Ok(if fired {
            Readiness::Edge
        } else {
            Readiness::Spurious
        })
    }

    fn acknowledge(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut byte = [0u8; 1];
        let _value = self.file.read(&mut byte)?;
        Ok(())
    }
}

/// Opens [`SysfsValueSource`]s under a [`SysfsLayout`].
#[derive(Debug, Clone, Default)]
pub struct SysfsOpener {
    layout: SysfsLayout,
}

impl SysfsOpener {
    pub fn new(layout: SysfsLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &SysfsLayout {
        &self.layout
    }
}

impl SourceOpener for SysfsOpener {
    type Source = SysfsValueSource;

    fn open(&self, pin: PinId) -> Result<SysfsValueSource, WatchError> {
        SysfsValueSource::open(pin, self.layout.value_path(pin))
    }
}
