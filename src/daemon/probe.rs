//! Process liveness probes and signal delivery.

use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Process id of a daemon, always positive.
///
/// Zero and negative ids address whole process groups when handed to
/// `kill(2)`, so they are rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DaemonPid(i32);

impl DaemonPid {
    /// Wrap a raw process id; `None` unless it is positive.
    #[must_use]
    pub fn new(raw: i32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// Wrap the id of a spawned child.
    #[must_use]
    pub fn from_child_id(id: u32) -> Option<Self> {
        i32::try_from(id).ok().and_then(Self::new)
    }

    #[must_use]
    pub fn as_raw(self) -> i32 {
        self.0
    }

    fn as_nix(self) -> Pid {
        Pid::from_raw(self.0)
    }
}

impl fmt::Display for DaemonPid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of a zero-effect `kill(pid, 0)` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The process exists and we may signal it.
    Alive,
    /// The process exists but belongs to someone we may not signal.
    AliveForeign,
    /// No such process.
    Gone,
}

impl Liveness {
    #[must_use]
    pub fn is_alive(self) -> bool {
        !matches!(self, Self::Gone)
    }
}

/// Probe whether a process exists without affecting it.
///
/// A zombie still counts as alive until its parent reaps it.
#[must_use]
pub fn probe(pid: DaemonPid) -> Liveness {
    match kill(pid.as_nix(), None) {
        Ok(()) => Liveness::Alive,
        Err(Errno::EPERM) => Liveness::AliveForeign,
        Err(err) => {
            tracing::trace!(%pid, error = %err, "Liveness probe failed");
            Liveness::Gone
        }
    }
}

/// Shorthand for `probe(pid).is_alive()`.
#[must_use]
pub fn is_alive(pid: DaemonPid) -> bool {
    probe(pid).is_alive()
}

/// Deliver `signal` to `pid`.
///
/// # Errors
///
/// Returns the errno when the kernel refuses the signal, including when
/// the process no longer exists.
pub fn send_signal(pid: DaemonPid, signal: Signal) -> Result<(), Errno> {
    kill(pid.as_nix(), signal)
}
