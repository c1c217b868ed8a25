//! Signal delivery to supervised subprocesses
//!
//! Shells and processes are spawned as leaders of their own process group,
//! so signals go to the whole group and reach anything the shell started.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Parse a signal given as `SIGTERM`, `term`, `KILL` or a number
pub fn parse_signal(name: &str) -> Result<Signal> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Ok(Signal::SIGTERM);
    }
    if let Ok(number) = trimmed.parse::<i32>() {
        return Signal::try_from(number)
            .map_err(|_| Error::Validation(format!("unknown signal number: {number}")));
    }

    let upper = trimmed.to_ascii_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    Signal::from_str(&full).map_err(|_| Error::Validation(format!("unknown signal: {trimmed}")))
}

fn to_pid(pid: u32) -> Result<Pid> {
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| Error::Internal(format!("pid out of range: {pid}")))
}

/// Send `signal` to the process group led by `pid`, falling back to the
/// single process when the group is already gone.
pub fn signal_process_group(pid: u32, signal: Signal) -> Result<()> {
    let target = to_pid(pid)?;
    match killpg(target, signal) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) | Err(Errno::EPERM) => {
            kill(target, signal).map_err(|errno| Error::Signal {
                pid,
                message: errno.desc().to_string(),
            })
        }
        Err(errno) => Err(Error::Signal {
            pid,
            message: errno.desc().to_string(),
        }),
    }
}

/// Whether an OS process with this pid exists
#[must_use]
pub fn process_exists(pid: u32) -> bool {
    match to_pid(pid) {
        Ok(target) => matches!(kill(target, None), Ok(()) | Err(Errno::EPERM)),
        Err(_) => false,
    }
}
