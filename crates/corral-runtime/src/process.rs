//! Container process creation and reaping.
//!
//! The container process is cloned straight into its new namespaces and
//! immediately re-executes this binary with [`INIT_MARKER`], so that its
//! setup runs in a fresh, single-threaded process image.

use std::ffi::CString;
use std::fs::File;
use std::os::fd::{AsRawFd, OwnedFd};

use corral_common::constants::{INIT_MARKER, SETUP_FAILURE_EXIT_CODE};
use corral_common::error::{CorralError, Result};
use corral_core::namespace::NamespaceConfig;
use nix::fcntl::OFlag;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;

const STACK_SIZE: usize = 1024 * 1024;

/// A cloned container process and the read end of its report pipe.
#[derive(Debug)]
pub struct ContainerProcess {
    /// PID of the container process in the host PID namespace.
    pub pid: Pid,
    /// Read end of the report pipe; yields EOF once the user command runs.
    pub reports: File,
}

/// Clones a process into `namespaces` that re-executes the current binary
/// as the container init, handing it `payload`.
///
/// # Errors
///
/// Returns [`CorralError::SpawnFailed`] if the pipe or the clone fails.
pub fn spawn_init(payload: &str, namespaces: &NamespaceConfig) -> Result<ContainerProcess> {
    let spawn_error = |e: nix::errno::Errno| CorralError::SpawnFailed { source: e.into() };
    let (read_end, write_end) = nix::unistd::pipe2(OFlag::O_CLOEXEC).map_err(spawn_error)?;
    let report_fd = write_end.as_raw_fd();

    // Everything the child touches is prepared before the clone.
    let exe = cstring("/proc/self/exe")?;
    let argv = [
        cstring(corral_common::constants::APP_NAME)?,
        cstring(INIT_MARKER)?,
        cstring(payload)?,
        cstring(&report_fd.to_string())?,
    ];
    let mut stack = vec![0_u8; STACK_SIZE];

    let child = Box::new(|| {
        // SAFETY: report_fd is open in the child; clearing close-on-exec
        // lets it survive exactly one exec.
        unsafe {
            let _ = libc::fcntl(report_fd, libc::F_SETFD, 0);
        }
        let Err(errno) = nix::unistd::execv(&exe, &argv);
        let err = CorralError::SpawnFailed {
            source: errno.into(),
        };
        crate::report::send(File::from(dup_report(report_fd)), &err);
        SETUP_FAILURE_EXIT_CODE as isize
    });

    // SAFETY: the child only runs the closure above, which execs or exits;
    // the host is single-threaded at this point.
    let pid = unsafe {
        nix::sched::clone(
            child,
            &mut stack,
            namespaces.clone_flags(),
            Some(Signal::SIGCHLD as i32),
        )
    }
    .map_err(spawn_error)?;
    drop(write_end);

    tracing::info!(%pid, "container process cloned");
    Ok(ContainerProcess {
        pid,
        reports: File::from(read_end),
    })
}

/// Waits for `pid` to terminate and returns its exit status, with
/// `128 + signal` for a process killed by a signal.
///
/// # Errors
///
/// Returns [`CorralError::SpawnFailed`] if the process cannot be waited for.
pub fn wait(pid: Pid) -> Result<i32> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
            Ok(_) | Err(nix::errno::Errno::EINTR) => {}
            Err(e) => return Err(CorralError::SpawnFailed { source: e.into() }),
        }
    }
}

fn cstring(value: &str) -> Result<CString> {
    CString::new(value).map_err(|e| CorralError::invalid(format!("{value:?}: {e}")))
}

fn dup_report(fd: i32) -> OwnedFd {
    // SAFETY: fd is the inherited write end, owned by this process image
    // from here on.
    unsafe { std::os::fd::FromRawFd::from_raw_fd(fd) }
}
