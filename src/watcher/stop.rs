//! Shutdown signal shared by a registry and its watcher threads.
//!
//! Watcher threads sit in `poll(2)` with no timeout, so a flag alone cannot
//! reach them. The signal pairs a cancellation token with a self-pipe: each
//! watcher polls the read end next to its value file, and raising the signal
//! writes one byte that is never consumed, waking every watcher at once.

use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    wake_read: OwnedFd,
    wake_write: OwnedFd,
}

impl StopSignal {
    pub fn new() -> io::Result<Self> {
        let (wake_read, wake_write) = nix::unistd::pipe()?;
        Ok(Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                wake_read,
                wake_write,
            }),
        })
    }

    /// Ask every watcher holding this signal to stop. Idempotent.
    pub fn raise(&self) {
        self.inner.token.cancel();
        if let Err(e) = nix::unistd::write(&self.inner.wake_write, &[1]) {
            tracing::warn!("[watcher] failed to write shutdown wake byte: {e}");
        }
    }

    pub fn is_raised(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Readable once the signal has been raised.
    pub fn wake_fd(&self) -> BorrowedFd<'_> {
        self.inner.wake_read.as_fd()
    }

    /// Token for async consumers that want to follow the same shutdown.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    pub async fn raised(&self) {
        self.inner.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

    #[test]
    fn test_raise_makes_wake_fd_readable() {
        let stop = StopSignal::new().unwrap();
        assert!(!stop.is_raised());

        let mut fds = [PollFd::new(stop.wake_fd(), PollFlags::POLLIN)];
        assert_eq!(poll(&mut fds, PollTimeout::ZERO).unwrap(), 0);

        stop.raise();
        stop.raise();
        assert!(stop.is_raised());

        let mut fds = [PollFd::new(stop.wake_fd(), PollFlags::POLLIN)];
        assert_eq!(poll(&mut fds, PollTimeout::ZERO).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_raised_resolves_for_clones() {
        let stop = StopSignal::new().unwrap();
        let clone = stop.clone();
        let waiter = tokio::spawn(async move { clone.raised().await });
        stop.raise();
        waiter.await.unwrap();
        assert!(stop.token().is_cancelled());
    }
}
