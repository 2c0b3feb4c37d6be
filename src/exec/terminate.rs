// src/exec/terminate.rs

//! Signalling a child's process tree.
//!
//! On Unix every child is started as the leader of its own process group,
//! so signals go to the whole group (the tool plus anything it forked).
//! Other platforms only get the forced kill.

use std::io;

use tokio::process::Child;

/// Ask the child to exit.
///
/// Returns `true` when a graceful signal was sent and the caller should arm
/// the escalation timer, `false` when the child was killed outright.
#[cfg(unix)]
pub(crate) fn terminate_gracefully(_child: &mut Child, pid: Option<u32>) -> io::Result<bool> {
    use nix::sys::signal::Signal;

    match pid {
        Some(pid) => {
            signal_group(pid, Signal::SIGTERM)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(not(unix))]
pub(crate) fn terminate_gracefully(child: &mut Child, _pid: Option<u32>) -> io::Result<bool> {
    child.start_kill()?;
    Ok(false)
}

/// Kill the child (and on Unix, its whole process group).
///
/// `reaped` tells whether the child's exit has already been collected, in
/// which case only group members that outlived it are signalled.
#[cfg(unix)]
pub(crate) fn kill_forcefully(_child: &mut Child, pid: Option<u32>, _reaped: bool) -> io::Result<()> {
    use nix::sys::signal::Signal;

    match pid {
        Some(pid) => signal_group(pid, Signal::SIGKILL),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_forcefully(child: &mut Child, _pid: Option<u32>, reaped: bool) -> io::Result<()> {
    if reaped {
        return Ok(());
    }
    child.start_kill()
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| io::Error::other(format!("pid {pid} out of range")))?;

    match killpg(Pid::from_raw(raw), signal) {
        // The group is already gone.
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}
